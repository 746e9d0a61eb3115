mod settings;

use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use crossbeam_channel::RecvTimeoutError;

use moodcam_core::analysis::infrastructure::http_backend::HttpAnalysisBackend;
use moodcam_core::capture::domain::camera_provider::{CameraProvider, StreamConstraints};
use moodcam_core::capture::infrastructure::ffmpeg_file_camera::FfmpegFileCameraProvider;
use moodcam_core::capture::infrastructure::nokhwa_camera::NokhwaCameraProvider;
use moodcam_core::encoding::infrastructure::jpeg_frame_encoder::JpegFrameEncoder;
use moodcam_core::pipeline::infrastructure::threaded_dispatch_executor::ThreadedDispatchExecutor;
use moodcam_core::pipeline::session::{SessionConfig, SessionParts, WebcamSession};
use moodcam_core::pipeline::session_logger::{shared, StdoutSessionLogger};
use moodcam_core::shared::constants::{FRAME_HEIGHT, FRAME_WIDTH, VIDEO_EXTENSIONS};
use moodcam_core::view::page::PageView;
use moodcam_core::view::view_state::{ViewState, ViewStore};

use settings::Settings;

const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Live age, gender and emotion estimates from a webcam.
#[derive(Parser, Debug)]
#[command(name = "moodcam")]
struct Cli {
    /// Base URL of the analysis backend.
    #[arg(long)]
    backend_url: Option<String>,

    /// Camera index to open.
    #[arg(long)]
    camera: Option<u32>,

    /// Play a video file in place of a camera.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Play --input once instead of looping it.
    #[arg(long)]
    no_loop: bool,

    /// Milliseconds between samples.
    #[arg(long)]
    interval_ms: Option<u64>,

    /// JPEG quality (0.0-1.0, exclusive of 0).
    #[arg(long)]
    jpeg_quality: Option<f32>,

    /// Clear a displayed error once a request succeeds again.
    #[arg(long)]
    clear_error_on_success: bool,

    /// Stop after this many seconds instead of waiting for Ctrl-C.
    #[arg(long)]
    duration_secs: Option<u64>,

    /// Settings file to use instead of the default location.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the effective settings back to the settings file.
    #[arg(long)]
    save_config: bool,

    /// List available cameras and exit.
    #[arg(long)]
    list_cameras: bool,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.list_cameras {
        list_cameras();
        return Ok(());
    }

    let settings = apply_overrides(Settings::load(cli.config.as_deref()), &cli);
    validate(&settings, cli.input.as_deref())?;

    if cli.save_config {
        let path = match &cli.config {
            Some(p) => p.clone(),
            None => Settings::default_path()?,
        };
        settings.save_to(&path)?;
        log::info!("Settings saved to {}", path.display());
    }

    let backend = HttpAnalysisBackend::new(&settings.backend_url);
    match backend.probe() {
        Ok(Some(greeting)) => log::info!("Backend says: {greeting}"),
        Ok(None) => log::info!("Backend reachable at {}", backend.base_url()),
        Err(e) => log::warn!("{e}"),
    }

    let provider = build_provider(&settings, cli.input.as_deref(), !cli.no_loop);
    let store = ViewStore::with_clear_error_on_success(settings.clear_error_on_success);
    let updates = store.subscribe();
    let executor = Arc::new(ThreadedDispatchExecutor::new());

    let parts = SessionParts {
        encoder: Arc::new(JpegFrameEncoder::new(
            FRAME_WIDTH,
            FRAME_HEIGHT,
            settings.jpeg_quality,
        )),
        backend: Arc::new(backend),
        executor: executor.clone(),
        store: store.clone(),
        logger: shared(StdoutSessionLogger::new()),
    };
    let config = SessionConfig {
        constraints: StreamConstraints::default(),
        interval: Duration::from_millis(settings.interval_ms),
    };

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        if let Err(e) = ctrlc::set_handler(move || running.store(false, Ordering::SeqCst)) {
            log::warn!("Failed to install Ctrl-C handler: {e}");
        }
    }

    let mut session = WebcamSession::mount(provider.as_ref(), parts, config)?;
    render(&store.snapshot());
    log::info!("Sampling every {} ms, press Ctrl-C to stop", settings.interval_ms);

    let deadline = cli
        .duration_secs
        .map(|secs| Instant::now() + Duration::from_secs(secs));
    while running.load(Ordering::SeqCst) {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            break;
        }
        match updates.recv_timeout(POLL_INTERVAL) {
            Ok(state) => render(&state),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    session.unmount();
    executor.join_all();
    Ok(())
}

fn apply_overrides(mut settings: Settings, cli: &Cli) -> Settings {
    if let Some(url) = &cli.backend_url {
        settings.backend_url = url.clone();
    }
    if let Some(index) = cli.camera {
        settings.camera_index = index;
    }
    if let Some(ms) = cli.interval_ms {
        settings.interval_ms = ms;
    }
    if let Some(q) = cli.jpeg_quality {
        settings.jpeg_quality = q;
    }
    if cli.clear_error_on_success {
        settings.clear_error_on_success = true;
    }
    settings
}

fn validate(settings: &Settings, input: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    if settings.backend_url.trim().is_empty() {
        return Err("Backend URL must not be empty".into());
    }
    if settings.interval_ms == 0 {
        return Err("Interval must be at least 1 ms".into());
    }
    if !(settings.jpeg_quality > 0.0 && settings.jpeg_quality <= 1.0) {
        return Err(format!(
            "JPEG quality must be in (0.0, 1.0], got {}",
            settings.jpeg_quality
        )
        .into());
    }
    if let Some(path) = input {
        if !path.exists() {
            return Err(format!("Input file not found: {}", path.display()).into());
        }
        if !is_video(path) {
            return Err(format!(
                "Input must be a video file ({}), got {}",
                VIDEO_EXTENSIONS.join(", "),
                path.display()
            )
            .into());
        }
    }
    Ok(())
}

fn is_video(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn build_provider(
    settings: &Settings,
    input: Option<&Path>,
    looping: bool,
) -> Box<dyn CameraProvider> {
    match input {
        Some(path) => {
            log::info!("Using {} as the camera", path.display());
            Box::new(FfmpegFileCameraProvider::new(path).with_looping(looping))
        }
        None => Box::new(NokhwaCameraProvider::new(settings.camera_index)),
    }
}

fn list_cameras() {
    let cameras = NokhwaCameraProvider::list_cameras();
    if cameras.is_empty() {
        println!("No cameras found");
    }
    for camera in cameras {
        println!("{}: {}", camera.index, camera.name);
    }
}

fn render(state: &ViewState) {
    println!("\n{}\n", PageView::from_state(state));
}
