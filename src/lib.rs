//! License-plate detection pipeline: take a still image (file upload or
//! camera snapshot), submit it to a multimodal recognition service with a
//! structured-output schema, validate what comes back, and turn normalized
//! bounding boxes into display-percentage overlays plus an in-memory session
//! history. Rendering, camera hardware and the recognition model itself are
//! external; this crate is the glue with the invariants.

pub mod camera;
pub mod client;
pub mod error;
pub mod history;
pub mod image_source;
pub mod overlay;
pub mod pipeline;
pub mod types;

pub use camera::{CameraFrame, CaptureDevice, CaptureStream};
pub use client::{GeminiClient, Recognizer};
pub use error::PipelineError;
pub use history::{HistoryEntry, SessionHistory};
pub use overlay::{to_overlay_rect, OverlayRect};
pub use pipeline::{DetectionTicket, PipelineController, PipelineState};
pub use types::{BoundingBox, Confidence, DetectionSet, EncodedImage, PlateDetection};
