use crate::error::PipelineError;
use bytes::Bytes;
use std::fmt;

/// Upper bound of the normalized coordinate grid the service reports
/// bounding boxes on, independent of source image resolution.
pub const GRID_MAX: f64 = 1000.0;

/// An encoded image payload plus its MIME type tag. Immutable once created;
/// producers are `image_source::from_file` and `image_source::from_camera_frame`.
#[derive(Clone)]
pub struct EncodedImage {
    data: Bytes,
    mime_type: String,
}

impl EncodedImage {
    pub(crate) fn new(data: impl Into<Bytes>, mime_type: impl Into<String>) -> EncodedImage {
        EncodedImage {
            data: data.into(),
            mime_type: mime_type.into(),
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl fmt::Debug for EncodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The payload itself is not worth dumping into logs.
        write!(f, "EncodedImage({}, {} bytes)", self.mime_type, self.data.len())
    }
}

/// A plate position on the fixed 0-1000 grid. The constructor is the only way
/// to build one, so every value in circulation satisfies the range and
/// ordering invariants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    ymin: f64,
    xmin: f64,
    ymax: f64,
    xmax: f64,
}

impl BoundingBox {
    pub fn new(ymin: f64, xmin: f64, ymax: f64, xmax: f64) -> Result<BoundingBox, PipelineError> {
        for &(name, v) in &[("ymin", ymin), ("xmin", xmin), ("ymax", ymax), ("xmax", xmax)] {
            if !v.is_finite() || v < 0.0 || v > GRID_MAX {
                return Err(PipelineError::SchemaViolation(format!(
                    "{} = {} is outside the 0-1000 grid",
                    name, v
                )));
            }
        }
        if ymin > ymax || xmin > xmax {
            return Err(PipelineError::SchemaViolation(format!(
                "inverted bounding box [{}, {}, {}, {}]",
                ymin, xmin, ymax, xmax
            )));
        }
        Ok(BoundingBox {
            ymin,
            xmin,
            ymax,
            xmax,
        })
    }

    pub fn ymin(&self) -> f64 {
        self.ymin
    }

    pub fn xmin(&self) -> f64 {
        self.xmin
    }

    pub fn ymax(&self) -> f64 {
        self.ymax
    }

    pub fn xmax(&self) -> f64 {
        self.xmax
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    /// Total mapping from the service's label. Labels outside the expected
    /// set are coerced to `Low` rather than rejected.
    pub fn from_label(label: &str) -> Confidence {
        match label {
            "high" => Confidence::High,
            "medium" => Confidence::Medium,
            _ => Confidence::Low,
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        })
    }
}

/// One recognized plate. The descriptive fields are best-effort values from
/// the service; owner name and registration date in particular are simulated
/// upstream and must not be treated as authoritative.
#[derive(Debug, Clone, PartialEq)]
pub struct PlateDetection {
    pub plate_number: String,
    pub confidence: Confidence,
    pub bounding_box: BoundingBox,
    pub vehicle_type: Option<String>,
    pub vehicle_model: Option<String>,
    pub color: Option<String>,
    pub region: Option<String>,
    pub owner_name: Option<String>,
    pub registration_date: Option<String>,
}

/// Zero or more detections in the order the service returned them. The order
/// is treated as scan order and never re-sorted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectionSet {
    pub plates: Vec<PlateDetection>,
}

impl DetectionSet {
    pub fn len(&self) -> usize {
        self.plates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plates.is_empty()
    }

    pub fn has_high_confidence(&self) -> bool {
        self.plates
            .iter()
            .any(|p| p.confidence == Confidence::High)
    }
}
