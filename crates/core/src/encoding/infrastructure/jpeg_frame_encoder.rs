use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, RgbImage, RgbaImage};

use crate::encoding::domain::frame_encoder::FrameEncoder;
use crate::shared::constants::{DEFAULT_JPEG_QUALITY, FRAME_HEIGHT, FRAME_WIDTH, UPLOAD_MIME_TYPE};
use crate::shared::encoded_image::EncodedImage;
use crate::shared::frame::Frame;

/// Encodes frames as baseline JPEG using the `image` crate.
///
/// Frames of any size are redrawn into a fixed raster first, so every
/// upload has the same dimensions.
pub struct JpegFrameEncoder {
    width: u32,
    height: u32,
    quality: u8,
}

impl JpegFrameEncoder {
    pub fn new(width: u32, height: u32, quality: f32) -> Self {
        Self {
            width,
            height,
            quality: quality_percent(quality),
        }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }
}

impl Default for JpegFrameEncoder {
    fn default() -> Self {
        Self::new(FRAME_WIDTH, FRAME_HEIGHT, DEFAULT_JPEG_QUALITY)
    }
}

impl FrameEncoder for JpegFrameEncoder {
    fn encode(&self, frame: &Frame) -> Result<EncodedImage, Box<dyn std::error::Error>> {
        let img = to_rgb_image(frame)?;

        let img = if frame.has_size(self.width, self.height) {
            img
        } else {
            image::imageops::resize(
                &img,
                self.width,
                self.height,
                image::imageops::FilterType::Triangle,
            )
        };

        let mut bytes = Vec::new();
        JpegEncoder::new_with_quality(&mut bytes, self.quality).encode_image(&img)?;

        Ok(EncodedImage {
            bytes,
            mime_type: UPLOAD_MIME_TYPE,
            width: self.width,
            height: self.height,
        })
    }
}

fn to_rgb_image(frame: &Frame) -> Result<RgbImage, Box<dyn std::error::Error>> {
    match frame.channels() {
        3 => RgbImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
            .ok_or_else(|| "Failed to create image from frame data".into()),
        4 => RgbaImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
            .map(|rgba| DynamicImage::ImageRgba8(rgba).to_rgb8())
            .ok_or_else(|| "Failed to create image from frame data".into()),
        n => Err(format!("Unsupported channel count: {n}").into()),
    }
}

/// Converts a 0.0-1.0 quality factor to the 1-100 scale the encoder takes.
fn quality_percent(quality: f32) -> u8 {
    (quality * 100.0).round().clamp(1.0, 100.0) as u8
}
