pub mod camera_provider;
pub mod capture_source;
