//! End-to-end session behavior against stub camera and backend ports.
//!
//! Timing-based tests use short intervals and generous deadlines; they
//! assert bounds, never exact tick counts.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;

use moodcam_core::analysis::domain::analysis_backend::{AnalysisBackend, AnalyzeError};
use moodcam_core::capture::domain::camera_provider::{
    CameraProvider, CameraStream, CaptureError, StreamConstraints,
};
use moodcam_core::encoding::infrastructure::jpeg_frame_encoder::JpegFrameEncoder;
use moodcam_core::pipeline::infrastructure::threaded_dispatch_executor::ThreadedDispatchExecutor;
use moodcam_core::pipeline::session::{SessionConfig, SessionParts, WebcamSession};
use moodcam_core::pipeline::session_logger::{shared, NullSessionLogger};
use moodcam_core::shared::analysis_result::AnalysisResult;
use moodcam_core::shared::encoded_image::EncodedImage;
use moodcam_core::shared::frame::Frame;
use moodcam_core::view::page::PageView;
use moodcam_core::view::view_state::{ViewState, ViewStore};

const DEADLINE: Duration = Duration::from_secs(5);

// --- Stub camera ---

struct StubStream {
    stopped: Arc<AtomicUsize>,
}

impl CameraStream for StubStream {
    fn latest_frame(&mut self) -> Option<Frame> {
        Some(Frame::new(vec![128u8; 16 * 12 * 3], 16, 12, 3, 0))
    }

    fn stop_tracks(&mut self) {
        self.stopped.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct StubCamera {
    stopped: Arc<AtomicUsize>,
    requested: Arc<Mutex<Vec<StreamConstraints>>>,
}

impl CameraProvider for StubCamera {
    fn request_stream(
        &self,
        constraints: StreamConstraints,
    ) -> Result<Box<dyn CameraStream>, CaptureError> {
        self.requested.lock().unwrap().push(constraints);
        Ok(Box::new(StubStream {
            stopped: self.stopped.clone(),
        }))
    }
}

struct DeniedCamera;

impl CameraProvider for DeniedCamera {
    fn request_stream(
        &self,
        _constraints: StreamConstraints,
    ) -> Result<Box<dyn CameraStream>, CaptureError> {
        Err(CaptureError::PermissionDenied("user dismissed the prompt".into()))
    }
}

// --- Stub backend ---

/// Replays scripted responses (repeating the last one) after a fixed
/// latency, recording how many calls overlap.
struct StubBackend {
    latency: Duration,
    script: Mutex<Vec<Result<AnalysisResult, AnalyzeError>>>,
    calls: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
    uploads: Mutex<Vec<(u32, u32, usize)>>,
}

impl StubBackend {
    fn new(latency: Duration, script: Vec<Result<AnalysisResult, AnalyzeError>>) -> Arc<Self> {
        let mut script = script;
        script.reverse();
        Arc::new(Self {
            latency,
            script: Mutex::new(script),
            calls: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            uploads: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl AnalysisBackend for StubBackend {
    fn analyze(&self, image: &EncodedImage) -> Result<AnalysisResult, AnalyzeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now_active, Ordering::SeqCst);
        self.uploads
            .lock()
            .unwrap()
            .push((image.width, image.height, image.len()));

        std::thread::sleep(self.latency);

        let response = {
            let mut script = self.script.lock().unwrap();
            if script.len() > 1 {
                script.pop().unwrap()
            } else {
                script.last().cloned().unwrap()
            }
        };
        self.active.fetch_sub(1, Ordering::SeqCst);
        response
    }
}

// --- Helpers ---

fn happy() -> AnalysisResult {
    AnalysisResult::from_json(
        r#"{"age": 34, "gender": "female", "emotion": "happy",
            "recommendations": [{"title": "T", "url": "u", "source": "s"}]}"#,
    )
    .unwrap()
}

fn mount(
    provider: &dyn CameraProvider,
    backend: Arc<StubBackend>,
    store: &ViewStore,
    interval_ms: u64,
) -> WebcamSession {
    let parts = SessionParts {
        encoder: Arc::new(JpegFrameEncoder::default()),
        backend,
        executor: Arc::new(ThreadedDispatchExecutor::new()),
        store: store.clone(),
        logger: shared(NullSessionLogger),
    };
    let config = SessionConfig {
        interval: Duration::from_millis(interval_ms),
        ..SessionConfig::default()
    };
    WebcamSession::mount(provider, parts, config).unwrap()
}

fn wait_for(rx: &Receiver<ViewState>, pred: impl Fn(&ViewState) -> bool) -> ViewState {
    let deadline = Instant::now() + DEADLINE;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let state = rx
            .recv_timeout(remaining)
            .expect("timed out waiting for a matching view state");
        if pred(&state) {
            return state;
        }
    }
}

fn wait_until(pred: impl Fn() -> bool) {
    let deadline = Instant::now() + DEADLINE;
    while !pred() {
        assert!(Instant::now() < deadline, "condition not reached in time");
        std::thread::sleep(Duration::from_millis(5));
    }
}

// --- Properties ---

#[test]
fn slow_backend_never_sees_overlapping_requests() {
    let latency = Duration::from_millis(100);
    let backend = StubBackend::new(latency, vec![Ok(happy())]);
    let camera = StubCamera::default();
    let store = ViewStore::new();

    let started = Instant::now();
    let mut session = mount(&camera, backend.clone(), &store, 10);
    std::thread::sleep(Duration::from_millis(550));
    session.unmount();
    wait_until(|| !session.is_busy());
    let elapsed = started.elapsed();

    let bound = (elapsed.as_secs_f64() / latency.as_secs_f64()).ceil() as usize;
    assert!(backend.calls() >= 2, "expected several dispatches");
    assert!(
        backend.calls() <= bound,
        "{} calls in {elapsed:?} exceeds {bound}",
        backend.calls()
    );
    assert_eq!(backend.max_active.load(Ordering::SeqCst), 1);
}

#[test]
fn uploads_are_resized_to_requested_resolution() {
    let backend = StubBackend::new(Duration::ZERO, vec![Ok(happy())]);
    let camera = StubCamera::default();
    let store = ViewStore::new();
    let rx = store.subscribe();

    let _session = mount(&camera, backend.clone(), &store, 10);
    wait_for(&rx, |s| s.result.is_some());

    let (width, height, len) = backend.uploads.lock().unwrap()[0];
    assert_eq!((width, height), (640, 480));
    assert!(len > 0);
    assert_eq!(
        camera.requested.lock().unwrap().as_slice(),
        &[StreamConstraints {
            width: 640,
            height: 480
        }]
    );
}

#[test]
fn busy_flag_released_after_failure() {
    let backend = StubBackend::new(
        Duration::from_millis(5),
        vec![
            Err(AnalyzeError::Transport {
                message: "connection reset".into(),
            }),
            Ok(happy()),
        ],
    );
    let camera = StubCamera::default();
    let store = ViewStore::new();
    let rx = store.subscribe();

    let _session = mount(&camera, backend.clone(), &store, 10);

    let failed = wait_for(&rx, |s| s.error.is_some());
    assert_eq!(failed.error.as_deref(), Some("connection reset"));
    assert_eq!(failed.result, None);

    let recovered = wait_for(&rx, |s| s.result.is_some());
    assert_eq!(recovered.result, Some(happy()));
    assert!(backend.calls() >= 2);
}

#[test]
fn backend_500_keeps_previous_result() {
    let backend = StubBackend::new(
        Duration::from_millis(5),
        vec![Ok(happy()), Err(AnalyzeError::Backend { status: 500 })],
    );
    let camera = StubCamera::default();
    let store = ViewStore::new();
    let rx = store.subscribe();

    let _session = mount(&camera, backend, &store, 10);

    let state = wait_for(&rx, |s| s.error.is_some());
    assert_eq!(state.error.as_deref(), Some("Backend error: 500"));
    assert_eq!(state.result, Some(happy()));

    let page = PageView::from_state(&state).to_string();
    assert!(page.contains("Age: 34"));
    assert!(page.contains("Backend error: 500"));
    assert!(page.contains("[s] T <u>"));
}

#[test]
fn permission_denial_never_dispatches() {
    let backend = StubBackend::new(Duration::ZERO, vec![Ok(happy())]);
    let store = ViewStore::new();

    let session = mount(&DeniedCamera, backend.clone(), &store, 5);
    std::thread::sleep(Duration::from_millis(100));

    assert!(!session.is_bound());
    assert_eq!(backend.calls(), 0);
    let state = store.snapshot();
    assert_eq!(
        state.error.as_deref(),
        Some("Webcam permission denied or unavailable")
    );
    assert_eq!(state.result, None);
}

#[test]
fn unmount_stops_camera_tracks() {
    let backend = StubBackend::new(Duration::ZERO, vec![Ok(happy())]);
    let camera = StubCamera::default();
    let store = ViewStore::new();

    let mut session = mount(&camera, backend, &store, 10);
    assert!(session.is_bound());
    assert_eq!(camera.stopped.load(Ordering::SeqCst), 0);

    session.unmount();
    assert!(!session.is_bound());
    assert_eq!(camera.stopped.load(Ordering::SeqCst), 1);
}

#[test]
fn no_requests_after_unmount() {
    let backend = StubBackend::new(Duration::ZERO, vec![Ok(happy())]);
    let camera = StubCamera::default();
    let store = ViewStore::new();
    let rx = store.subscribe();

    let mut session = mount(&camera, backend.clone(), &store, 10);
    wait_for(&rx, |s| s.result.is_some());
    session.unmount();
    wait_until(|| !session.is_busy());

    let calls = backend.calls();
    std::thread::sleep(Duration::from_millis(60));
    assert_eq!(backend.calls(), calls);
}
