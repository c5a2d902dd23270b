use crate::error::PipelineError;
use futures::future::BoxFuture;

/// One raw frame from a live video source: tightly packed RGB8, row-major.
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// A video capture device. `open` requests exclusive access, preferring an
/// environment-facing lens where the hardware distinguishes; denial or
/// missing hardware is a `DeviceUnavailable` failure the caller surfaces
/// without retrying.
pub trait CaptureDevice: Send + Sync {
    fn open(&self) -> BoxFuture<'_, Result<Box<dyn CaptureStream>, PipelineError>>;
}

/// An active capture stream. The device stays acquired until `stop`; the
/// pipeline controller calls it on every exit from live capture, so an
/// implementation that also stops in `Drop` can never leak tracks.
pub trait CaptureStream: Send {
    fn grab(&mut self) -> BoxFuture<'_, Result<CameraFrame, PipelineError>>;

    fn stop(&mut self);

    /// Number of device tracks still held. Zero after `stop`.
    fn active_tracks(&self) -> usize;
}
