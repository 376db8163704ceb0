//! Frame container shared by every source and pipeline stage.
//!
//! A `Frame` is an owned RGB pixel buffer. Sources produce frames, the detector
//! reads them, and the annotator mutates them in place. Frames never outlive a
//! single loop iteration.

use std::path::Path;

use anyhow::{Context, Result};
use image::imageops::FilterType;
use image::RgbImage;

use crate::config::Resolution;

/// One RGB frame.
pub struct Frame {
    image: RgbImage,
}

impl Frame {
    pub fn new(image: RgbImage) -> Self {
        Self { image }
    }

    /// Build a frame from a raw packed-RGB buffer (capture backends).
    pub fn from_rgb_bytes(pixels: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        let image = RgbImage::from_vec(width, height, pixels)
            .context("pixel buffer does not match frame dimensions")?;
        Ok(Self { image })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Mutable pixel access for the annotator.
    pub fn image_mut(&mut self) -> &mut RgbImage {
        &mut self.image
    }

    /// Scale to the target resolution. No-op when already at size.
    pub fn resize_to(&mut self, resolution: Resolution) {
        if self.width() == resolution.width && self.height() == resolution.height {
            return;
        }
        self.image = image::imageops::resize(
            &self.image,
            resolution.width,
            resolution.height,
            FilterType::Triangle,
        );
    }

    /// Write the frame as a still image; format follows the file extension.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        self.image
            .save(path)
            .with_context(|| format!("failed to write frame to {}", path.display()))
    }

    /// JPEG-encode the frame (recording sink).
    pub fn encode_jpeg(&self, quality: u8) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut bytes, quality);
        self.image
            .write_with_encoder(encoder)
            .context("failed to JPEG-encode frame")?;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn solid(width: u32, height: u32, color: [u8; 3]) -> Frame {
        Frame::new(RgbImage::from_pixel(width, height, Rgb(color)))
    }

    #[test]
    fn resize_changes_dimensions() {
        let mut frame = solid(64, 48, [10, 20, 30]);
        frame.resize_to(Resolution {
            width: 32,
            height: 24,
        });
        assert_eq!(frame.width(), 32);
        assert_eq!(frame.height(), 24);
    }

    #[test]
    fn resize_to_same_size_is_noop() {
        let mut frame = solid(64, 48, [10, 20, 30]);
        let before = frame.image().clone();
        frame.resize_to(Resolution {
            width: 64,
            height: 48,
        });
        assert_eq!(frame.image(), &before);
    }

    #[test]
    fn from_rgb_bytes_rejects_short_buffer() {
        assert!(Frame::from_rgb_bytes(vec![0u8; 10], 640, 480).is_err());
    }

    #[test]
    fn jpeg_encoding_produces_jfif_payload() {
        let frame = solid(16, 16, [200, 100, 50]);
        let bytes = frame.encode_jpeg(85).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }
}
