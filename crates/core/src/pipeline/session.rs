use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{select, Sender};

use crate::analysis::domain::analysis_backend::AnalysisBackend;
use crate::capture::domain::camera_provider::{CameraProvider, StreamConstraints};
use crate::capture::domain::capture_source::CaptureSource;
use crate::encoding::domain::frame_encoder::FrameEncoder;
use crate::pipeline::dispatch_executor::DispatchExecutor;
use crate::pipeline::dispatcher::AnalysisDispatcher;
use crate::pipeline::request_gate::RequestGate;
use crate::pipeline::sampler::Sampler;
use crate::pipeline::session_logger::{with_logger, SharedSessionLogger};
use crate::shared::constants::{DEFAULT_SAMPLE_INTERVAL_MS, PERMISSION_ERROR_MESSAGE};
use crate::view::view_state::ViewStore;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    pub constraints: StreamConstraints,
    pub interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            constraints: StreamConstraints::default(),
            interval: Duration::from_millis(DEFAULT_SAMPLE_INTERVAL_MS),
        }
    }
}

/// Ports a session is wired from.
pub struct SessionParts {
    pub encoder: Arc<dyn FrameEncoder>,
    pub backend: Arc<dyn AnalysisBackend>,
    pub executor: Arc<dyn DispatchExecutor>,
    pub store: ViewStore,
    pub logger: SharedSessionLogger,
}

/// One mounted webcam component: a bound (or failed) camera plus the
/// periodic sampler thread driving it.
///
/// Dropping the session unmounts it.
pub struct WebcamSession {
    capture: Arc<Mutex<CaptureSource>>,
    gate: Arc<RequestGate>,
    logger: SharedSessionLogger,
    stop_tx: Option<Sender<()>>,
    sampler_thread: Option<JoinHandle<()>>,
}

impl WebcamSession {
    /// Acquires the camera and starts the sampling timer.
    ///
    /// Camera failure is not an error here: it is published once as the
    /// permission message and the timer keeps skipping unbound ticks.
    /// Only failing to spawn the sampler thread is.
    pub fn mount(
        provider: &dyn CameraProvider,
        parts: SessionParts,
        config: SessionConfig,
    ) -> std::io::Result<Self> {
        let SessionParts {
            encoder,
            backend,
            executor,
            store,
            logger,
        } = parts;

        let capture = match CaptureSource::acquire(provider, config.constraints) {
            Ok(source) => {
                with_logger(&logger, |l| l.info("Camera bound"));
                source
            }
            Err(e) => {
                log::error!("Error accessing webcam: {e}");
                store.publish_error(PERMISSION_ERROR_MESSAGE);
                CaptureSource::unbound()
            }
        };
        let capture = Arc::new(Mutex::new(capture));

        let dispatcher = Arc::new(AnalysisDispatcher::new(
            backend,
            store.clone(),
            logger.clone(),
        ));
        let sampler = Sampler::new(
            capture.clone(),
            encoder,
            dispatcher,
            executor,
            store,
            logger.clone(),
        );
        let gate = sampler.gate().clone();

        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
        let interval = config.interval;
        let sampler_thread = std::thread::Builder::new()
            .name("sampler".to_string())
            .spawn(move || {
                let ticker = crossbeam_channel::tick(interval);
                loop {
                    select! {
                        recv(ticker) -> _ => {
                            sampler.tick();
                        }
                        recv(stop_rx) -> _ => break,
                    }
                }
            })?;

        log::info!("Session mounted (sampling every {} ms)", interval.as_millis());
        Ok(Self {
            capture,
            gate,
            logger,
            stop_tx: Some(stop_tx),
            sampler_thread: Some(sampler_thread),
        })
    }

    pub fn is_bound(&self) -> bool {
        self.capture
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_bound()
    }

    /// Whether a backend request is currently outstanding.
    pub fn is_busy(&self) -> bool {
        self.gate.is_busy()
    }

    /// Stops the timer, then stops every camera track. Idempotent.
    ///
    /// A request already in flight completes on its worker and still
    /// publishes.
    pub fn unmount(&mut self) {
        let Some(handle) = self.sampler_thread.take() else {
            return;
        };
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if handle.join().is_err() {
            log::error!("Sampler thread panicked");
        }

        self.capture
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .release();

        log::info!("Session unmounted");
        with_logger(&self.logger, |l| l.summary());
    }
}

impl Drop for WebcamSession {
    fn drop(&mut self) {
        self.unmount();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::domain::analysis_backend::AnalyzeError;
    use crate::capture::domain::camera_provider::{CameraStream, CaptureError};
    use crate::pipeline::dispatch_executor::InlineDispatchExecutor;
    use crate::pipeline::session_logger::{shared, NullSessionLogger};
    use crate::shared::analysis_result::AnalysisResult;
    use crate::shared::encoded_image::EncodedImage;
    use crate::shared::frame::Frame;

    struct DeniedProvider;

    impl CameraProvider for DeniedProvider {
        fn request_stream(
            &self,
            _constraints: StreamConstraints,
        ) -> Result<Box<dyn CameraStream>, CaptureError> {
            Err(CaptureError::PermissionDenied("NotAllowedError".into()))
        }
    }

    struct RecordingStream {
        stops: Arc<Mutex<Vec<&'static str>>>,
    }

    impl CameraStream for RecordingStream {
        fn latest_frame(&mut self) -> Option<Frame> {
            None
        }
        fn stop_tracks(&mut self) {
            self.stops.lock().unwrap().push("video");
        }
    }

    struct RecordingProvider {
        stops: Arc<Mutex<Vec<&'static str>>>,
    }

    impl CameraProvider for RecordingProvider {
        fn request_stream(
            &self,
            _constraints: StreamConstraints,
        ) -> Result<Box<dyn CameraStream>, CaptureError> {
            Ok(Box::new(RecordingStream {
                stops: self.stops.clone(),
            }))
        }
    }

    struct UnusedEncoder;

    impl FrameEncoder for UnusedEncoder {
        fn encode(&self, _frame: &Frame) -> Result<EncodedImage, Box<dyn std::error::Error>> {
            Err("not expected".into())
        }
    }

    struct UnusedBackend;

    impl AnalysisBackend for UnusedBackend {
        fn analyze(&self, _image: &EncodedImage) -> Result<AnalysisResult, AnalyzeError> {
            Err(AnalyzeError::Transport {
                message: "not expected".into(),
            })
        }
    }

    fn parts(store: &ViewStore) -> SessionParts {
        SessionParts {
            encoder: Arc::new(UnusedEncoder),
            backend: Arc::new(UnusedBackend),
            executor: Arc::new(InlineDispatchExecutor),
            store: store.clone(),
            logger: shared(NullSessionLogger),
        }
    }

    fn fast() -> SessionConfig {
        SessionConfig {
            interval: Duration::from_millis(5),
            ..SessionConfig::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = SessionConfig::default();
        assert_eq!(config.interval, Duration::from_millis(2000));
        assert_eq!(config.constraints.width, 640);
        assert_eq!(config.constraints.height, 480);
    }

    #[test]
    fn test_denied_camera_publishes_permission_error() {
        let store = ViewStore::new();
        let session = WebcamSession::mount(&DeniedProvider, parts(&store), fast()).unwrap();

        assert!(!session.is_bound());
        assert_eq!(
            store.snapshot().error.as_deref(),
            Some("Webcam permission denied or unavailable")
        );
    }

    #[test]
    fn test_unmount_stops_tracks_once() {
        let stops = Arc::new(Mutex::new(Vec::new()));
        let provider = RecordingProvider {
            stops: stops.clone(),
        };
        let store = ViewStore::new();
        let mut session = WebcamSession::mount(&provider, parts(&store), fast()).unwrap();
        assert!(session.is_bound());

        session.unmount();
        session.unmount();
        drop(session);

        assert_eq!(stops.lock().unwrap().as_slice(), &["video"]);
    }

    #[test]
    fn test_drop_unmounts() {
        let stops = Arc::new(Mutex::new(Vec::new()));
        let provider = RecordingProvider {
            stops: stops.clone(),
        };
        let store = ViewStore::new();
        drop(WebcamSession::mount(&provider, parts(&store), fast()).unwrap());

        assert_eq!(stops.lock().unwrap().len(), 1);
    }
}
