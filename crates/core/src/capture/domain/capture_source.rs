use crate::capture::domain::camera_provider::{
    CameraProvider, CameraStream, CaptureError, StreamConstraints,
};
use crate::shared::frame::Frame;

/// Outcome of asking the sink for its current content.
#[derive(Debug)]
pub enum SinkContent {
    Unbound,
    Empty,
    Frame(Frame),
}

/// Exclusive owner of the session's camera stream.
///
/// Acquisition happens once; a failure leaves the sink unbound for good.
/// The stream's tracks are stopped on [`release`](Self::release) or on drop,
/// whichever comes first.
pub struct CaptureSource {
    stream: Option<Box<dyn CameraStream>>,
}

impl CaptureSource {
    pub fn unbound() -> Self {
        Self { stream: None }
    }

    /// Requests a stream from `provider` and binds it.
    pub fn acquire(
        provider: &dyn CameraProvider,
        constraints: StreamConstraints,
    ) -> Result<Self, CaptureError> {
        let stream = provider.request_stream(constraints)?;
        log::info!(
            "Camera stream bound ({}x{} requested)",
            constraints.width,
            constraints.height
        );
        Ok(Self {
            stream: Some(stream),
        })
    }

    pub fn is_bound(&self) -> bool {
        self.stream.is_some()
    }

    pub fn current_content(&mut self) -> SinkContent {
        match self.stream.as_mut() {
            None => SinkContent::Unbound,
            Some(stream) => match stream.latest_frame() {
                Some(frame) => SinkContent::Frame(frame),
                None => SinkContent::Empty,
            },
        }
    }

    /// Stops all tracks and unbinds the sink. No-op when already unbound.
    pub fn release(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop_tracks();
            log::info!("Camera stream released");
        }
    }
}

impl Drop for CaptureSource {
    fn drop(&mut self) {
        self.release();
    }
}
