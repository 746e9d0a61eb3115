use thiserror::Error;

use crate::shared::constants::{FRAME_HEIGHT, FRAME_WIDTH};
use crate::shared::frame::Frame;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("camera access denied: {0}")]
    PermissionDenied(String),
    #[error("camera unavailable: {0}")]
    Unavailable(String),
}

/// Resolution requested when opening a stream. Providers pick the closest
/// mode the device offers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamConstraints {
    pub width: u32,
    pub height: u32,
}

impl Default for StreamConstraints {
    fn default() -> Self {
        Self {
            width: FRAME_WIDTH,
            height: FRAME_HEIGHT,
        }
    }
}

/// Media-capture facility of the platform: hands out live video streams.
pub trait CameraProvider {
    fn request_stream(
        &self,
        constraints: StreamConstraints,
    ) -> Result<Box<dyn CameraStream>, CaptureError>;
}

/// A live video stream bound to a device.
pub trait CameraStream: Send {
    /// Most recent frame the device delivered, or `None` before the first one.
    fn latest_frame(&mut self) -> Option<Frame>;

    /// Stops every underlying track. Must be safe to call more than once.
    fn stop_tracks(&mut self);
}
