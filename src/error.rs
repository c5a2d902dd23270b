use failure::Fail;

/// Everything that can go wrong in the pipeline. External errors (reqwest,
/// image decoding, device access) are converted to one of these at the point
/// of origin; no foreign error type crosses a component boundary.
#[derive(Debug, Clone, Fail, PartialEq)]
pub enum PipelineError {
    #[fail(display = "camera unavailable: {}", _0)]
    DeviceUnavailable(String),
    #[fail(display = "invalid image: {}", _0)]
    InvalidImage(String),
    #[fail(display = "a detection request is already in flight")]
    Busy,
    #[fail(display = "recognition failed: {}", _0)]
    RecognitionFailure(String),
    #[fail(display = "malformed recognition payload: {}", _0)]
    SchemaViolation(String),
}
