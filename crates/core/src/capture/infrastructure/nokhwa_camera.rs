use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{ApiBackend, CameraIndex, RequestedFormat, RequestedFormatType, Resolution};
use nokhwa::Camera;

use crate::capture::domain::camera_provider::{
    CameraProvider, CameraStream, CaptureError, StreamConstraints,
};
use crate::shared::frame::Frame;

const RETRY_DELAY: Duration = Duration::from_millis(10);

/// Name and index of a camera the platform reports.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CameraInfo {
    pub index: u32,
    pub name: String,
}

/// Opens native webcams through nokhwa.
pub struct NokhwaCameraProvider {
    camera_index: u32,
}

impl NokhwaCameraProvider {
    pub fn new(camera_index: u32) -> Self {
        Self { camera_index }
    }

    pub fn list_cameras() -> Vec<CameraInfo> {
        match nokhwa::query(ApiBackend::Auto) {
            Ok(cameras) => cameras
                .iter()
                .enumerate()
                .map(|(idx, info)| CameraInfo {
                    index: idx as u32,
                    name: info.human_name(),
                })
                .collect(),
            Err(e) => {
                log::warn!("Failed to enumerate cameras: {e}");
                Vec::new()
            }
        }
    }
}

impl Default for NokhwaCameraProvider {
    fn default() -> Self {
        Self::new(0)
    }
}

impl CameraProvider for NokhwaCameraProvider {
    fn request_stream(
        &self,
        constraints: StreamConstraints,
    ) -> Result<Box<dyn CameraStream>, CaptureError> {
        let latest = Arc::new(Mutex::new(None));
        let running = Arc::new(AtomicBool::new(true));
        let (opened_tx, opened_rx) = crossbeam_channel::bounded::<Result<(), CaptureError>>(1);

        let camera_index = self.camera_index;
        let latest_clone = latest.clone();
        let running_clone = running.clone();

        // The camera handle is opened and dropped on the capture thread
        // because some platform backends are not `Send`.
        let handle = std::thread::Builder::new()
            .name("camera-capture".to_string())
            .spawn(move || {
                let mut camera = match open_camera(camera_index, constraints) {
                    Ok(camera) => {
                        let _ = opened_tx.send(Ok(()));
                        camera
                    }
                    Err(e) => {
                        let _ = opened_tx.send(Err(e));
                        return;
                    }
                };
                capture_loop(&mut camera, &latest_clone, &running_clone);
                if let Err(e) = camera.stop_stream() {
                    log::warn!("Failed to stop camera stream: {e}");
                }
                log::info!("Camera capture thread stopped");
            })
            .map_err(|e| CaptureError::Unavailable(format!("failed to spawn capture thread: {e}")))?;

        match opened_rx.recv() {
            Ok(Ok(())) => Ok(Box::new(NokhwaStream {
                latest,
                running,
                handle: Some(handle),
            })),
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(CaptureError::Unavailable(
                    "capture thread exited before opening the camera".to_string(),
                ))
            }
        }
    }
}

fn open_camera(camera_index: u32, constraints: StreamConstraints) -> Result<Camera, CaptureError> {
    let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::HighestResolution(
        Resolution::new(constraints.width, constraints.height),
    ));
    let mut camera = Camera::new(CameraIndex::Index(camera_index), requested)
        .map_err(|e| classify_open_error(&e.to_string()))?;
    camera
        .open_stream()
        .map_err(|e| classify_open_error(&e.to_string()))?;

    log::info!(
        "Camera opened: {} ({}x{})",
        camera.info().human_name(),
        camera.resolution().width(),
        camera.resolution().height()
    );
    Ok(camera)
}

fn capture_loop(camera: &mut Camera, latest: &Mutex<Option<Frame>>, running: &AtomicBool) {
    let mut index = 0usize;
    while running.load(Ordering::Acquire) {
        let buffer = match camera.frame() {
            Ok(buffer) => buffer,
            Err(e) => {
                log::warn!("Failed to capture frame: {e}");
                std::thread::sleep(RETRY_DELAY);
                continue;
            }
        };
        match buffer.decode_image::<RgbFormat>() {
            Ok(image) => {
                let (width, height) = (image.width(), image.height());
                let frame = Frame::new(image.into_raw(), width, height, 3, index);
                index += 1;
                *latest.lock().unwrap_or_else(PoisonError::into_inner) = Some(frame);
            }
            Err(e) => log::warn!("Failed to decode frame: {e}"),
        }
    }
}

/// Maps a platform open failure onto the capture taxonomy. Platforms report
/// denial only through the message text.
fn classify_open_error(message: &str) -> CaptureError {
    let lower = message.to_lowercase();
    if lower.contains("permission") || lower.contains("denied") || lower.contains("not authorized")
    {
        CaptureError::PermissionDenied(message.to_string())
    } else {
        CaptureError::Unavailable(message.to_string())
    }
}

/// Live nokhwa stream; frames are produced on the `camera-capture` thread.
struct NokhwaStream {
    latest: Arc<Mutex<Option<Frame>>>,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl CameraStream for NokhwaStream {
    fn latest_frame(&mut self) -> Option<Frame> {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn stop_tracks(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Camera capture thread panicked");
            }
        }
    }
}

impl Drop for NokhwaStream {
    fn drop(&mut self) {
        self.stop_tracks();
    }
}
