use crate::shared::encoded_image::EncodedImage;
use crate::shared::frame::Frame;

/// Draws a frame into the upload raster and compresses it.
pub trait FrameEncoder: Send + Sync {
    fn encode(&self, frame: &Frame) -> Result<EncodedImage, Box<dyn std::error::Error>>;
}
