use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::capture::domain::camera_provider::{
    CameraProvider, CameraStream, CaptureError, StreamConstraints,
};
use crate::shared::frame::Frame;

/// Pacing used when the container reports no frame rate.
const FALLBACK_FRAME_INTERVAL: Duration = Duration::from_millis(40);

/// Plays a video file as if it were a live camera.
///
/// Frames are decoded with ffmpeg-next, scaled to the requested size, and
/// paced at the file's native frame rate. At end of file playback restarts
/// from the beginning unless looping is disabled, in which case the last
/// frame stays visible.
pub struct FfmpegFileCameraProvider {
    path: PathBuf,
    looping: bool,
}

impl FfmpegFileCameraProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            looping: true,
        }
    }

    pub fn with_looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }
}

impl CameraProvider for FfmpegFileCameraProvider {
    fn request_stream(
        &self,
        constraints: StreamConstraints,
    ) -> Result<Box<dyn CameraStream>, CaptureError> {
        if !self.path.exists() {
            return Err(CaptureError::Unavailable(format!(
                "input file not found: {}",
                self.path.display()
            )));
        }

        let latest = Arc::new(Mutex::new(None));
        let running = Arc::new(AtomicBool::new(true));
        let (opened_tx, opened_rx) = crossbeam_channel::bounded::<Result<(), CaptureError>>(1);

        let path = self.path.clone();
        let looping = self.looping;
        let latest_clone = latest.clone();
        let running_clone = running.clone();

        // ffmpeg contexts are not `Send`; they live and die on this thread.
        let handle = std::thread::Builder::new()
            .name("file-capture".to_string())
            .spawn(move || {
                let decoder = match FileDecoder::open(&path, constraints) {
                    Ok(decoder) => {
                        let _ = opened_tx.send(Ok(()));
                        decoder
                    }
                    Err(e) => {
                        let _ = opened_tx.send(Err(CaptureError::Unavailable(e.to_string())));
                        return;
                    }
                };
                log::info!(
                    "Replaying {} as camera ({}x{})",
                    path.display(),
                    constraints.width,
                    constraints.height
                );
                playback_loop(&path, constraints, decoder, looping, &latest_clone, &running_clone);
                log::info!("File capture thread stopped");
            })
            .map_err(|e| CaptureError::Unavailable(format!("failed to spawn capture thread: {e}")))?;

        match opened_rx.recv() {
            Ok(Ok(())) => Ok(Box::new(FileStream {
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
                    "capture thread exited before opening the file".to_string(),
                ))
            }
        }
    }
}

fn playback_loop(
    path: &Path,
    constraints: StreamConstraints,
    mut decoder: FileDecoder,
    looping: bool,
    latest: &Mutex<Option<Frame>>,
    running: &AtomicBool,
) {
    let mut index = 0usize;
    let mut decoded_this_pass = 0usize;

    while running.load(Ordering::Acquire) {
        let started = Instant::now();
        match decoder.next_pixels() {
            Ok(Some(pixels)) => {
                let frame = Frame::new(pixels, constraints.width, constraints.height, 3, index);
                *latest.lock().unwrap_or_else(PoisonError::into_inner) = Some(frame);
                index += 1;
                decoded_this_pass += 1;
            }
            Ok(None) => {
                if !looping || decoded_this_pass == 0 {
                    log::info!("Reached end of {}", path.display());
                    break;
                }
                decoded_this_pass = 0;
                match FileDecoder::open(path, constraints) {
                    Ok(reopened) => decoder = reopened,
                    Err(e) => {
                        log::warn!("Failed to rewind {}: {e}", path.display());
                        break;
                    }
                }
                continue;
            }
            Err(e) => {
                log::warn!("Failed to decode {}: {e}", path.display());
                break;
            }
        }
        std::thread::sleep(decoder.frame_interval.saturating_sub(started.elapsed()));
    }
}

/// Sequential decoder over one pass of the file.
struct FileDecoder {
    ictx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    video_stream_index: usize,
    frame_interval: Duration,
    width: u32,
    height: u32,
    flushing: bool,
}

impl FileDecoder {
    fn open(path: &Path, constraints: StreamConstraints) -> Result<Self, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;

        let ictx = ffmpeg_next::format::input(path)?;

        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or("No video stream found")?;

        let video_stream_index = stream.index();
        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = codec_ctx.decoder().video()?;
        let frame_interval = frame_interval(stream.rate());

        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            ffmpeg_next::format::Pixel::RGB24,
            constraints.width,
            constraints.height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;

        Ok(Self {
            ictx,
            decoder,
            scaler,
            video_stream_index,
            frame_interval,
            width: constraints.width,
            height: constraints.height,
            flushing: false,
        })
    }

    /// Decodes the next frame as packed RGB, or `None` once the file is exhausted.
    fn next_pixels(&mut self) -> Result<Option<Vec<u8>>, Box<dyn std::error::Error>> {
        loop {
            if let Some(pixels) = self.try_receive()? {
                return Ok(Some(pixels));
            }
            if self.flushing {
                return Ok(None);
            }

            match self.ictx.packets().next() {
                Some((stream, packet)) => {
                    if stream.index() != self.video_stream_index {
                        continue;
                    }
                    if self.decoder.send_packet(&packet).is_err() {
                        continue;
                    }
                }
                None => {
                    let _ = self.decoder.send_eof();
                    self.flushing = true;
                }
            }
        }
    }

    fn try_receive(&mut self) -> Result<Option<Vec<u8>>, Box<dyn std::error::Error>> {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        if self.decoder.receive_frame(&mut decoded).is_err() {
            return Ok(None);
        }
        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::empty();
        self.scaler.run(&decoded, &mut rgb_frame)?;
        Ok(Some(extract_rgb_pixels(&rgb_frame, self.width, self.height)))
    }
}

fn frame_interval(rate: ffmpeg_next::Rational) -> Duration {
    if rate.numerator() <= 0 || rate.denominator() <= 0 {
        return FALLBACK_FRAME_INTERVAL;
    }
    let fps = rate.numerator() as f64 / rate.denominator() as f64;
    Duration::from_secs_f64(1.0 / fps)
}

/// Copies pixel data from an ffmpeg frame into a contiguous RGB buffer,
/// dropping the per-row padding ffmpeg adds when stride > width * 3.
fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let w = width as usize;
    let h = height as usize;

    let mut pixels = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + w * 3]);
    }
    pixels
}

struct FileStream {
    latest: Arc<Mutex<Option<Frame>>>,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl CameraStream for FileStream {
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
                log::error!("File capture thread panicked");
            }
        }
    }
}

impl Drop for FileStream {
    fn drop(&mut self) {
        self.stop_tracks();
    }
}
