use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::Client;
use serde::Deserialize;
use thiserror::Error;

use crate::analysis::domain::analysis_backend::{AnalysisBackend, AnalyzeError};
use crate::shared::analysis_result::AnalysisResult;
use crate::shared::constants::{
    ANALYZE_PATH, DEFAULT_BACKEND_URL, UPLOAD_FIELD_NAME, UPLOAD_FILE_NAME,
};
use crate::shared::encoded_image::EncodedImage;

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("backend unreachable at {url}: {source}")]
    Unreachable {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("backend at {url} answered {status}")]
    Status { url: String, status: u16 },
}

#[derive(Deserialize)]
struct Greeting {
    #[serde(default)]
    message: Option<String>,
}

/// Talks to the analysis backend over HTTP.
///
/// Each frame is one `POST {base}/analyze/` with a multipart body holding a
/// single JPEG part. No retries and no timeout beyond the client default.
pub struct HttpAnalysisBackend {
    client: Client,
    base_url: String,
}

impl HttpAnalysisBackend {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn analyze_url(&self) -> String {
        format!("{}{ANALYZE_PATH}", self.base_url)
    }

    /// Fetches the backend's root greeting. Used once at startup so a
    /// misconfigured URL shows up in the log before the first tick.
    pub fn probe(&self) -> Result<Option<String>, ProbeError> {
        let url = format!("{}/", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| ProbeError::Unreachable {
                url: url.clone(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProbeError::Status {
                url,
                status: status.as_u16(),
            });
        }

        // A root that is not the expected JSON still proves reachability.
        Ok(response
            .json::<Greeting>()
            .ok()
            .and_then(|greeting| greeting.message))
    }
}

impl Default for HttpAnalysisBackend {
    fn default() -> Self {
        Self::new(DEFAULT_BACKEND_URL)
    }
}

impl AnalysisBackend for HttpAnalysisBackend {
    fn analyze(&self, image: &EncodedImage) -> Result<AnalysisResult, AnalyzeError> {
        let part = Part::bytes(image.bytes.clone())
            .file_name(UPLOAD_FILE_NAME)
            .mime_str(image.mime_type)
            .map_err(transport)?;
        let form = Form::new().part(UPLOAD_FIELD_NAME, part);

        let response = self
            .client
            .post(self.analyze_url())
            .multipart(form)
            .send()
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(AnalyzeError::Backend {
                status: status.as_u16(),
            });
        }

        let body = response.text().map_err(transport)?;
        AnalysisResult::from_json(&body).map_err(|e| AnalyzeError::Transport {
            message: format!("Invalid response body: {e}"),
        })
    }
}

fn transport(e: reqwest::Error) -> AnalyzeError {
    AnalyzeError::Transport {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::plain("http://localhost:8000", "http://localhost:8000/analyze/")]
    #[case::trailing_slash("http://localhost:8000/", "http://localhost:8000/analyze/")]
    #[case::prefixed("https://api.example.com/api", "https://api.example.com/api/analyze/")]
    fn test_analyze_url(#[case] base: &str, #[case] expected: &str) {
        assert_eq!(HttpAnalysisBackend::new(base).analyze_url(), expected);
    }

    #[test]
    fn test_default_points_at_localhost() {
        assert_eq!(HttpAnalysisBackend::default().base_url(), "http://localhost:8000");
    }

    #[test]
    fn test_unreachable_backend_is_transport_error() {
        // Port 9 (discard) on loopback is closed on any sane test machine.
        let backend = HttpAnalysisBackend::new("http://127.0.0.1:9");
        let image = EncodedImage {
            bytes: vec![0xFF, 0xD8, 0xFF, 0xD9],
            mime_type: "image/jpeg",
            width: 640,
            height: 480,
        };
        let err = backend.analyze(&image).unwrap_err();
        assert!(matches!(err, AnalyzeError::Transport { .. }));
        assert!(!err.to_string().is_empty());
    }

    #[test]
    fn test_probe_unreachable() {
        let backend = HttpAnalysisBackend::new("http://127.0.0.1:9");
        assert!(matches!(
            backend.probe(),
            Err(ProbeError::Unreachable { .. })
        ));
    }
}
