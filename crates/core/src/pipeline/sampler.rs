use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use crate::capture::domain::capture_source::{CaptureSource, SinkContent};
use crate::encoding::domain::frame_encoder::FrameEncoder;
use crate::pipeline::dispatch_executor::DispatchExecutor;
use crate::pipeline::dispatcher::AnalysisDispatcher;
use crate::pipeline::request_gate::RequestGate;
use crate::pipeline::session_logger::{with_logger, SharedSessionLogger};
use crate::view::view_state::ViewStore;

/// What a single timer tick ended up doing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TickOutcome {
    SkippedBusy,
    SkippedUnbound,
    SkippedNoFrame,
    Dispatched,
    EncodeFailed,
}

impl TickOutcome {
    pub const ALL: &'static [TickOutcome] = &[
        TickOutcome::Dispatched,
        TickOutcome::SkippedBusy,
        TickOutcome::SkippedUnbound,
        TickOutcome::SkippedNoFrame,
        TickOutcome::EncodeFailed,
    ];

    pub fn label(self) -> &'static str {
        match self {
            TickOutcome::SkippedBusy => "skipped (busy)",
            TickOutcome::SkippedUnbound => "skipped (unbound)",
            TickOutcome::SkippedNoFrame => "skipped (no frame)",
            TickOutcome::Dispatched => "dispatched",
            TickOutcome::EncodeFailed => "encode failed",
        }
    }
}

/// Per-tick sampling step: grab the current frame, encode it and hand it
/// to the dispatcher, unless a request is already outstanding.
pub struct Sampler {
    capture: Arc<Mutex<CaptureSource>>,
    encoder: Arc<dyn FrameEncoder>,
    dispatcher: Arc<AnalysisDispatcher>,
    gate: Arc<RequestGate>,
    executor: Arc<dyn DispatchExecutor>,
    store: ViewStore,
    logger: SharedSessionLogger,
}

impl Sampler {
    pub fn new(
        capture: Arc<Mutex<CaptureSource>>,
        encoder: Arc<dyn FrameEncoder>,
        dispatcher: Arc<AnalysisDispatcher>,
        executor: Arc<dyn DispatchExecutor>,
        store: ViewStore,
        logger: SharedSessionLogger,
    ) -> Self {
        Self {
            capture,
            encoder,
            dispatcher,
            gate: Arc::new(RequestGate::new()),
            executor,
            store,
            logger,
        }
    }

    pub fn gate(&self) -> &Arc<RequestGate> {
        &self.gate
    }

    /// Runs one tick and records its outcome with the session logger.
    pub fn tick(&self) -> TickOutcome {
        let outcome = self.sample();
        with_logger(&self.logger, |l| l.tick(outcome));
        outcome
    }

    fn sample(&self) -> TickOutcome {
        if self.gate.is_busy() {
            return TickOutcome::SkippedBusy;
        }

        let frame = {
            let mut capture = self.capture.lock().unwrap_or_else(PoisonError::into_inner);
            match capture.current_content() {
                SinkContent::Unbound => return TickOutcome::SkippedUnbound,
                SinkContent::Empty => return TickOutcome::SkippedNoFrame,
                SinkContent::Frame(frame) => frame,
            }
        };

        let Some(in_flight) = self.gate.try_acquire() else {
            return TickOutcome::SkippedBusy;
        };

        let started = Instant::now();
        let image = match self.encoder.encode(&frame) {
            Ok(image) => image,
            Err(e) => {
                log::warn!("Frame {} could not be encoded: {e}", frame.index());
                self.store
                    .publish_error(format!("Frame encoding failed: {e}"));
                return TickOutcome::EncodeFailed;
            }
        };
        let encode_ms = started.elapsed().as_secs_f64() * 1000.0;
        with_logger(&self.logger, |l| {
            l.timing("encode", encode_ms);
            l.metric("upload_bytes", image.len() as f64);
        });

        log::debug!(
            "Dispatching frame {} ({} bytes)",
            frame.index(),
            image.len()
        );
        let dispatcher = self.dispatcher.clone();
        self.executor.submit(Box::new(move || {
            let _in_flight = in_flight;
            // Outcome is already published to the store.
            let _ = dispatcher.dispatch(&image);
        }));
        TickOutcome::Dispatched
    }
}
