use crate::types::BoundingBox;

/// A bounding box converted to percentages of the displayed image box, ready
/// for positioning an overlay element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayRect {
    pub top_pct: f64,
    pub left_pct: f64,
    pub width_pct: f64,
    pub height_pct: f64,
}

/// Maps a 0-1000 grid box to display percentages: each edge divided by 10.
///
/// Assumes the displayed image box has the image's own aspect ratio. If the
/// image is letterboxed inside a differently-shaped box, the rectangle will
/// be offset; no correction for that is attempted here. Zero-extent boxes
/// pass through and yield a zero-area rectangle.
pub fn to_overlay_rect(b: &BoundingBox) -> OverlayRect {
    OverlayRect {
        top_pct: b.ymin() / 10.0,
        left_pct: b.xmin() / 10.0,
        width_pct: (b.xmax() - b.xmin()) / 10.0,
        height_pct: (b.ymax() - b.ymin()) / 10.0,
    }
}
