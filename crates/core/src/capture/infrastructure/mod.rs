pub mod ffmpeg_file_camera;
pub mod nokhwa_camera;
