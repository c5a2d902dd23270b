use crate::camera::{CaptureDevice, CaptureStream};
use crate::client::Recognizer;
use crate::error::PipelineError;
use crate::history::SessionHistory;
use crate::image_source;
use crate::overlay::{to_overlay_rect, OverlayRect};
use crate::types::{DetectionSet, EncodedImage};
use log::{debug, info};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// No image.
    Idle,
    /// Camera stream active, no frame taken yet.
    CapturingLive,
    /// An image is set and not (or no longer) being processed.
    Ready,
    /// A detect call is in flight for the current image.
    Processing,
    /// Detections available for the current image.
    Annotated,
    /// Last attempt errored; the image is retained so the user can retry.
    Failed,
}

/// Handed out by `start_detection` and required to apply a result. Carries
/// the generation the detection was started under, so a result arriving
/// after the image was replaced or cleared is recognizably stale.
#[derive(Debug)]
pub struct DetectionTicket {
    generation: u64,
    image: Arc<EncodedImage>,
}

impl DetectionTicket {
    pub fn image(&self) -> &Arc<EncodedImage> {
        &self.image
    }
}

/// Orchestrates one scan session: image acquisition, the single in-flight
/// detection, overlay geometry and history commits. One instance per
/// session; all mutations happen through `&mut self`, so they are atomic
/// between the suspension points.
pub struct PipelineController {
    state: PipelineState,
    generation: u64,
    current_image: Option<Arc<EncodedImage>>,
    detections: Option<DetectionSet>,
    stream: Option<Box<dyn CaptureStream>>,
    history: SessionHistory,
    last_error: Option<String>,
}

impl PipelineController {
    pub fn new() -> PipelineController {
        PipelineController {
            state: PipelineState::Idle,
            generation: 0,
            current_image: None,
            detections: None,
            stream: None,
            history: SessionHistory::new(),
            last_error: None,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn current_image(&self) -> Option<&Arc<EncodedImage>> {
        self.current_image.as_ref()
    }

    /// Detections for the current image, present only after a successful run.
    pub fn detections(&self) -> Option<&DetectionSet> {
        self.detections.as_ref()
    }

    /// Overlay rectangles for the current image. Non-empty only in
    /// `Annotated`; any transition that swaps or drops the image also drops
    /// the detections, so a stale overlay can never be produced here.
    pub fn overlay_rects(&self) -> Vec<OverlayRect> {
        if self.state != PipelineState::Annotated {
            return Vec::new();
        }
        self.detections
            .iter()
            .flat_map(|set| set.plates.iter())
            .map(|plate| to_overlay_rect(&plate.bounding_box))
            .collect()
    }

    pub fn history(&self) -> &SessionHistory {
        &self.history
    }

    pub fn scan_count(&self) -> usize {
        self.history.count()
    }

    /// The single user-visible error slot. New failures replace the message.
    pub fn error_message(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn dismiss_error(&mut self) {
        self.last_error = None;
    }

    /// Makes `image` the current image and moves to `Ready`, discarding any
    /// transient state from a prior image (but not history). Also the
    /// snapshot path's landing point, so a live stream is released first.
    pub fn set_image(&mut self, image: EncodedImage) {
        self.release_camera();
        self.generation += 1;
        self.current_image = Some(Arc::new(image));
        self.detections = None;
        self.last_error = None;
        self.state = PipelineState::Ready;
    }

    /// Back to `Idle`: drops the image, detections and error, releases the
    /// camera, and invalidates any in-flight detection. History survives.
    pub fn clear(&mut self) {
        self.release_camera();
        self.generation += 1;
        self.current_image = None;
        self.detections = None;
        self.last_error = None;
        self.state = PipelineState::Idle;
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Acquires the capture device and enters `CapturingLive`. Any previous
    /// stream is stopped first; the device is the one exclusive resource.
    pub async fn begin_live_capture(
        &mut self,
        device: &dyn CaptureDevice,
    ) -> Result<(), PipelineError> {
        self.release_camera();
        match device.open().await {
            Ok(stream) => {
                info!("Live capture started");
                self.stream = Some(stream);
                self.state = PipelineState::CapturingLive;
                Ok(())
            }
            Err(e) => {
                self.fail(&e);
                Err(e)
            }
        }
    }

    /// Takes a photo from the live stream. The camera is released whether or
    /// not the grab succeeds; on success the frame becomes the current image.
    pub async fn snapshot(&mut self) -> Result<(), PipelineError> {
        let mut stream = self.stream.take().ok_or_else(|| {
            PipelineError::DeviceUnavailable("no live capture to snapshot".to_string())
        })?;
        let grabbed = stream.grab().await;
        stream.stop();
        match grabbed.and_then(image_source::from_camera_frame) {
            Ok(image) => {
                self.set_image(image);
                Ok(())
            }
            Err(e) => {
                self.fail(&e);
                Err(e)
            }
        }
    }

    /// Begins a detection for the current image. Rejected with `Busy` while
    /// another detection is in flight; results attach to "the current image"
    /// and two concurrent calls would make that attribution ambiguous.
    pub fn start_detection(&mut self) -> Result<DetectionTicket, PipelineError> {
        if self.state == PipelineState::Processing {
            return Err(PipelineError::Busy);
        }
        let image = self
            .current_image
            .clone()
            .ok_or_else(|| PipelineError::InvalidImage("no image to process".to_string()))?;
        self.detections = None;
        self.last_error = None;
        self.state = PipelineState::Processing;
        Ok(DetectionTicket {
            generation: self.generation,
            image,
        })
    }

    /// Applies a successful detection result. Returns false (and changes
    /// nothing) when the ticket is stale, i.e. the image was replaced or
    /// cleared while the call was in transit.
    pub fn apply_success(&mut self, ticket: &DetectionTicket, detections: DetectionSet) -> bool {
        if ticket.generation != self.generation {
            debug!("Discarding stale detection result");
            return false;
        }
        info!("Annotated current image with {} plate(s)", detections.len());
        self.history.commit(detections.clone(), ticket.image.clone());
        self.detections = Some(detections);
        self.state = PipelineState::Annotated;
        true
    }

    /// Applies a failed detection outcome, subject to the same staleness
    /// check. No history entry is written for failures.
    pub fn apply_failure(&mut self, ticket: &DetectionTicket, error: &PipelineError) -> bool {
        if ticket.generation != self.generation {
            debug!("Discarding stale detection failure");
            return false;
        }
        self.fail(error);
        true
    }

    /// Start, await and apply one detection. Retrying after `Failed` is just
    /// calling this again; the attempted image is retained.
    pub async fn process(&mut self, recognizer: &dyn Recognizer) -> Result<(), PipelineError> {
        let ticket = self.start_detection()?;
        match recognizer.detect(&ticket.image).await {
            Ok(detections) => {
                self.apply_success(&ticket, detections);
                Ok(())
            }
            Err(e) => {
                self.apply_failure(&ticket, &e);
                Err(e)
            }
        }
    }

    fn fail(&mut self, error: &PipelineError) {
        self.last_error = Some(error.to_string());
        self.state = PipelineState::Failed;
    }

    fn release_camera(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            debug!("Releasing capture device");
            stream.stop();
        }
    }
}

impl Default for PipelineController {
    fn default() -> PipelineController {
        PipelineController::new()
    }
}

impl Drop for PipelineController {
    fn drop(&mut self) {
        self.release_camera();
    }
}
