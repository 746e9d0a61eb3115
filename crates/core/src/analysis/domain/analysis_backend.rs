use thiserror::Error;

use crate::shared::analysis_result::AnalysisResult;
use crate::shared::encoded_image::EncodedImage;

/// Failure of one frame exchange with the backend.
///
/// The `Display` text is what ends up in the view's error line.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalyzeError {
    #[error("Backend error: {status}")]
    Backend { status: u16 },
    #[error("{message}")]
    Transport { message: String },
}

/// Remote estimator for a single encoded frame.
pub trait AnalysisBackend: Send + Sync {
    fn analyze(&self, image: &EncodedImage) -> Result<AnalysisResult, AnalyzeError>;
}
