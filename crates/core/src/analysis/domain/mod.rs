pub mod analysis_backend;
