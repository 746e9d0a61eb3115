pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
pub const ANALYZE_PATH: &str = "/analyze/";
pub const UPLOAD_FIELD_NAME: &str = "file";
pub const UPLOAD_FILE_NAME: &str = "frame.jpg";
pub const UPLOAD_MIME_TYPE: &str = "image/jpeg";

/// Raster every sampled frame is drawn into before encoding.
pub const FRAME_WIDTH: u32 = 640;
pub const FRAME_HEIGHT: u32 = 480;

/// JPEG quality on the 0.0-1.0 scale used by canvas encoders.
pub const DEFAULT_JPEG_QUALITY: f32 = 0.8;

pub const DEFAULT_SAMPLE_INTERVAL_MS: u64 = 2000;

pub const PERMISSION_ERROR_MESSAGE: &str = "Webcam permission denied or unavailable";
pub const PLACEHOLDER: &str = "--";
pub const EMPTY_RECOMMENDATIONS_MESSAGE: &str = "No recommendations yet.";
pub const PAGE_TITLE: &str = "Live Age, Gender, Emotion with Recommendations";

pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "mkv", "avi", "webm", "m4v"];
