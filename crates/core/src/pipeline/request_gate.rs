use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// The single busy flag guarding backend dispatch.
///
/// At most one [`InFlight`] guard exists at a time; dropping it clears the
/// flag, so the flag is released on every exit path of the dispatch,
/// including unwinding.
#[derive(Debug, Default)]
pub struct RequestGate {
    busy: AtomicBool,
}

impl RequestGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Marks the gate busy, or returns `None` if a request is already out.
    pub fn try_acquire(self: &Arc<Self>) -> Option<InFlight> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight { gate: self.clone() })
    }
}

/// Proof that the caller owns the outstanding request slot.
#[derive(Debug)]
pub struct InFlight {
    gate: Arc<RequestGate>,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.gate.busy.store(false, Ordering::Release);
    }
}
