use std::sync::Arc;
use std::time::Instant;

use crate::analysis::domain::analysis_backend::{AnalysisBackend, AnalyzeError};
use crate::pipeline::session_logger::{with_logger, SharedSessionLogger};
use crate::shared::encoded_image::EncodedImage;
use crate::view::view_state::ViewStore;

/// One request-response exchange per encoded frame; the outcome is
/// published to the view store either way.
pub struct AnalysisDispatcher {
    backend: Arc<dyn AnalysisBackend>,
    store: ViewStore,
    logger: SharedSessionLogger,
}

impl AnalysisDispatcher {
    pub fn new(
        backend: Arc<dyn AnalysisBackend>,
        store: ViewStore,
        logger: SharedSessionLogger,
    ) -> Self {
        Self {
            backend,
            store,
            logger,
        }
    }

    /// Sends `image` and publishes the result, or the error's message.
    ///
    /// A failure leaves the previously published result in place.
    pub fn dispatch(&self, image: &EncodedImage) -> Result<(), AnalyzeError> {
        let started = Instant::now();
        let outcome = self.backend.analyze(image);
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        match outcome {
            Ok(result) => {
                with_logger(&self.logger, |l| {
                    l.timing("dispatch", elapsed_ms);
                    l.metric("dispatch_ok", 1.0);
                });
                self.store.publish_result(result);
                Ok(())
            }
            Err(e) => {
                log::warn!("Analysis request failed: {e}");
                with_logger(&self.logger, |l| {
                    l.timing("dispatch", elapsed_ms);
                    l.metric("dispatch_failed", 1.0);
                });
                self.store.publish_error(e.to_string());
                Err(e)
            }
        }
    }
}
