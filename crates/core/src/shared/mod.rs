pub mod analysis_result;
pub mod constants;
pub mod encoded_image;
pub mod frame;
