use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use crate::pipeline::sampler::TickOutcome;

/// Cross-cutting logger for sampling-session events.
///
/// Decouples the sampler and dispatcher from specific output mechanisms
/// (log crate, test recorders) so callers can observe session behavior
/// without changing the loop.
pub trait SessionLogger: Send {
    /// Record what one tick did.
    fn tick(&mut self, outcome: TickOutcome);

    /// Record how long a named stage took (`encode`, `dispatch`).
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a point-in-time metric or counter increment.
    fn metric(&mut self, name: &str, value: f64);

    /// Log a human-readable status message.
    fn info(&mut self, message: &str);

    /// Emit an end-of-session summary. Default: no-op.
    fn summary(&self) {}
}

pub type SharedSessionLogger = Arc<Mutex<Box<dyn SessionLogger>>>;

pub fn shared(logger: impl SessionLogger + 'static) -> SharedSessionLogger {
    Arc::new(Mutex::new(Box::new(logger)))
}

/// Runs `f` against the shared logger, tolerating a poisoned lock.
pub fn with_logger(logger: &SharedSessionLogger, f: impl FnOnce(&mut Box<dyn SessionLogger>)) {
    let mut guard = logger.lock().unwrap_or_else(PoisonError::into_inner);
    f(&mut guard);
}

/// Silent logger that discards all events.
pub struct NullSessionLogger;

impl SessionLogger for NullSessionLogger {
    fn tick(&mut self, _outcome: TickOutcome) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// CLI-oriented logger that counts tick outcomes, keeps per-stage timings,
/// and reports a summary when the session ends.
pub struct StdoutSessionLogger {
    ticks: HashMap<TickOutcome, usize>,
    timings: HashMap<String, Vec<f64>>,
    metrics: HashMap<String, Vec<f64>>,
    start_time: Instant,
    messages: Vec<String>,
}

impl StdoutSessionLogger {
    pub fn new() -> Self {
        Self {
            ticks: HashMap::new(),
            timings: HashMap::new(),
            metrics: HashMap::new(),
            start_time: Instant::now(),
            messages: Vec::new(),
        }
    }

    pub fn total_ticks(&self) -> usize {
        self.ticks.values().sum()
    }

    pub fn tick_count(&self, outcome: TickOutcome) -> usize {
        self.ticks.get(&outcome).copied().unwrap_or(0)
    }

    /// Returns the timing data for a given stage.
    pub fn timings_for(&self, stage: &str) -> Option<&[f64]> {
        self.timings.get(stage).map(|v| v.as_slice())
    }

    /// Returns the metric data for a given name.
    pub fn metrics_for(&self, name: &str) -> Option<&[f64]> {
        self.metrics.get(name).map(|v| v.as_slice())
    }

    /// Returns the formatted summary string, or `None` if nothing happened.
    pub fn summary_string(&self) -> Option<String> {
        let total = self.total_ticks();
        if total == 0 && self.timings.is_empty() && self.metrics.is_empty() {
            return None;
        }

        let elapsed_s = self.start_time.elapsed().as_secs_f64();
        let mut lines = Vec::new();
        lines.push(format!(
            "Session summary ({total} ticks, {elapsed_s:.1}s total):"
        ));

        for outcome in TickOutcome::ALL {
            let count = self.tick_count(*outcome);
            if count > 0 {
                lines.push(format!("  {:16}: {count}", outcome.label()));
            }
        }

        let mut stages: Vec<_> = self.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let durations = &self.timings[stage];
            let total_ms: f64 = durations.iter().sum();
            let avg_ms = if durations.is_empty() {
                0.0
            } else {
                total_ms / durations.len() as f64
            };
            let max_ms = durations.iter().copied().fold(0.0, f64::max);
            lines.push(format!(
                "  {stage:16}: avg {avg_ms:7.1}ms  max {max_ms:7.1}ms  ({} samples)",
                durations.len()
            ));
        }

        let mut metric_names: Vec<_> = self.metrics.keys().collect();
        metric_names.sort();
        for name in metric_names {
            let values = &self.metrics[name];
            let sum: f64 = values.iter().sum();
            lines.push(format!("  {name}: total {sum:.0}"));
        }

        let dispatched = self.tick_count(TickOutcome::Dispatched);
        if dispatched > 0 && elapsed_s > 0.0 {
            let per_minute = dispatched as f64 / elapsed_s * 60.0;
            lines.push(format!("  Effective rate: {per_minute:.1} requests/min"));
        }

        Some(lines.join("\n"))
    }
}

impl Default for StdoutSessionLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionLogger for StdoutSessionLogger {
    fn tick(&mut self, outcome: TickOutcome) {
        *self.ticks.entry(outcome).or_insert(0) += 1;
        log::debug!("Tick: {}", outcome.label());
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics
            .entry(name.to_string())
            .or_default()
            .push(value);
    }

    fn info(&mut self, message: &str) {
        self.messages.push(message.to_string());
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_null_logger_all_methods_are_noop() {
        let mut logger = NullSessionLogger;
        logger.tick(TickOutcome::Dispatched);
        logger.timing("dispatch", 5.0);
        logger.metric("dispatch_failed", 1.0);
        logger.info("hello");
        logger.summary();
    }

    #[test]
    fn test_tick_counts() {
        let mut logger = StdoutSessionLogger::new();
        logger.tick(TickOutcome::Dispatched);
        logger.tick(TickOutcome::SkippedBusy);
        logger.tick(TickOutcome::SkippedBusy);

        assert_eq!(logger.total_ticks(), 3);
        assert_eq!(logger.tick_count(TickOutcome::SkippedBusy), 2);
        assert_eq!(logger.tick_count(TickOutcome::SkippedUnbound), 0);
    }

    #[test]
    fn test_timing_records_values() {
        let mut logger = StdoutSessionLogger::new();
        logger.timing("dispatch", 120.0);
        logger.timing("dispatch", 80.0);
        logger.timing("encode", 4.0);

        let dispatch = logger.timings_for("dispatch").unwrap();
        assert_eq!(dispatch.len(), 2);
        assert_relative_eq!(dispatch[0], 120.0);
        assert_relative_eq!(logger.timings_for("encode").unwrap()[0], 4.0);
    }

    #[test]
    fn test_metric_records_values() {
        let mut logger = StdoutSessionLogger::new();
        logger.metric("dispatch_failed", 1.0);
        logger.metric("dispatch_failed", 1.0);
        assert_eq!(logger.metrics_for("dispatch_failed").unwrap().len(), 2);
    }

    #[test]
    fn test_summary_lists_outcomes_and_stages() {
        let mut logger = StdoutSessionLogger::new();
        logger.tick(TickOutcome::Dispatched);
        logger.tick(TickOutcome::SkippedBusy);
        logger.timing("dispatch", 250.0);
        logger.metric("dispatch_ok", 1.0);

        let summary = logger.summary_string().unwrap();
        assert!(summary.contains("Session summary (2 ticks"));
        assert!(summary.contains("dispatched"));
        assert!(summary.contains("skipped (busy)"));
        assert!(summary.contains("dispatch"));
        assert!(summary.contains("dispatch_ok: total 1"));
        assert!(summary.contains("requests/min"));
    }

    #[test]
    fn test_empty_summary_returns_none() {
        assert!(StdoutSessionLogger::new().summary_string().is_none());
    }

    #[test]
    fn test_info_stores_messages() {
        let mut logger = StdoutSessionLogger::new();
        logger.info("camera bound");
        assert_eq!(logger.messages, vec!["camera bound".to_string()]);
    }
}
