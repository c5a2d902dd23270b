use crate::camera::CameraFrame;
use crate::error::PipelineError;
use crate::types::EncodedImage;
use image::io::Reader as ImageReader;
use image::{DynamicImage, ImageFormat, ImageOutputFormat, RgbImage};
use std::io::Cursor;

const JPEG_QUALITY: u8 = 85;

/// Wraps user-selected file bytes as an `EncodedImage`. The bytes are kept
/// as-is; they only need to decode, and the MIME tag comes from the sniffed
/// format rather than anything the picker claimed.
pub fn from_file(data: Vec<u8>) -> Result<EncodedImage, PipelineError> {
    if data.is_empty() {
        return Err(PipelineError::InvalidImage("empty file".to_string()));
    }
    let reader = ImageReader::new(Cursor::new(data.as_slice()))
        .with_guessed_format()
        .map_err(|e| PipelineError::InvalidImage(format!("unreadable file: {}", e)))?;
    let format = reader
        .format()
        .ok_or_else(|| PipelineError::InvalidImage("unrecognized image format".to_string()))?;
    reader
        .decode()
        .map_err(|e| PipelineError::InvalidImage(format!("failed to decode image: {}", e)))?;
    Ok(EncodedImage::new(data, mime_for(format)))
}

/// Rasterizes a live camera frame to JPEG at its native resolution.
pub fn from_camera_frame(frame: CameraFrame) -> Result<EncodedImage, PipelineError> {
    let CameraFrame {
        width,
        height,
        data,
    } = frame;
    if width == 0 || height == 0 {
        return Err(PipelineError::InvalidImage(format!(
            "empty {}x{} frame",
            width, height
        )));
    }
    let expected = width as usize * height as usize * 3;
    if data.len() != expected {
        return Err(PipelineError::InvalidImage(format!(
            "frame buffer is {} bytes, expected {} for {}x{} RGB",
            data.len(),
            expected,
            width,
            height
        )));
    }
    // Checked the length above, so from_raw cannot fail.
    let rgb = RgbImage::from_raw(width, height, data)
        .ok_or_else(|| PipelineError::InvalidImage("frame buffer too short".to_string()))?;
    let mut jpeg = Vec::new();
    DynamicImage::ImageRgb8(rgb)
        .write_to(&mut jpeg, ImageOutputFormat::Jpeg(JPEG_QUALITY))
        .map_err(|e| PipelineError::InvalidImage(format!("failed to encode frame: {}", e)))?;
    Ok(EncodedImage::new(jpeg, "image/jpeg"))
}

fn mime_for(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Jpeg => "image/jpeg",
        ImageFormat::Png => "image/png",
        ImageFormat::Gif => "image/gif",
        ImageFormat::WebP => "image/webp",
        ImageFormat::Bmp => "image/bmp",
        ImageFormat::Tiff => "image/tiff",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes() -> Vec<u8> {
        let img = RgbImage::from_pixel(4, 4, image::Rgb([10, 200, 30]));
        let mut out = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut out, ImageOutputFormat::Png)
            .unwrap();
        out
    }

    #[test]
    fn from_file_keeps_bytes_and_tags_sniffed_mime() {
        let bytes = png_bytes();
        let image = from_file(bytes.clone()).unwrap();
        assert_eq!(image.mime_type(), "image/png");
        assert_eq!(image.data(), bytes.as_slice());
    }

    #[test]
    fn from_file_rejects_empty_input() {
        assert!(matches!(
            from_file(Vec::new()),
            Err(PipelineError::InvalidImage(_))
        ));
    }

    #[test]
    fn from_file_rejects_non_image_bytes() {
        assert!(matches!(
            from_file(b"definitely not an image".to_vec()),
            Err(PipelineError::InvalidImage(_))
        ));
    }

    #[test]
    fn camera_frame_encodes_to_jpeg() {
        let frame = CameraFrame {
            width: 8,
            height: 6,
            data: vec![128; 8 * 6 * 3],
        };
        let image = from_camera_frame(frame).unwrap();
        assert_eq!(image.mime_type(), "image/jpeg");
        // JPEG SOI marker.
        assert_eq!(&image.data()[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn camera_frame_rejects_zero_dimensions() {
        let frame = CameraFrame {
            width: 0,
            height: 6,
            data: Vec::new(),
        };
        assert!(matches!(
            from_camera_frame(frame),
            Err(PipelineError::InvalidImage(_))
        ));
    }

    #[test]
    fn camera_frame_rejects_short_buffer() {
        let frame = CameraFrame {
            width: 8,
            height: 6,
            data: vec![0; 10],
        };
        assert!(matches!(
            from_camera_frame(frame),
            Err(PipelineError::InvalidImage(_))
        ));
    }
}
