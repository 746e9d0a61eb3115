use std::sync::{Arc, Mutex, PoisonError};

use crossbeam_channel::{Receiver, Sender};

use crate::shared::analysis_result::AnalysisResult;

/// What the view renders: the latest result and the latest error.
///
/// The two fields are independent. A new result replaces the old one
/// wholesale; an error never clears the result.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ViewState {
    pub result: Option<AnalysisResult>,
    pub error: Option<String>,
}

/// Single published result/error pair, shared by the dispatcher (writer)
/// and any number of renderers (readers).
///
/// Every publish pushes a snapshot to each live subscriber.
#[derive(Clone)]
pub struct ViewStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    state: Mutex<ViewState>,
    subscribers: Mutex<Vec<Sender<ViewState>>>,
    clear_error_on_success: bool,
}

impl ViewStore {
    pub fn new() -> Self {
        Self::with_clear_error_on_success(false)
    }

    /// When `clear` is set, a successful result also removes a stale error.
    pub fn with_clear_error_on_success(clear: bool) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                state: Mutex::new(ViewState::default()),
                subscribers: Mutex::new(Vec::new()),
                clear_error_on_success: clear,
            }),
        }
    }

    pub fn snapshot(&self) -> ViewState {
        self.lock_state().clone()
    }

    pub fn subscribe(&self) -> Receiver<ViewState> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    pub fn publish_result(&self, result: AnalysisResult) {
        let snapshot = {
            let mut state = self.lock_state();
            state.result = Some(result);
            if self.inner.clear_error_on_success {
                state.error = None;
            }
            state.clone()
        };
        self.notify(snapshot);
    }

    pub fn publish_error(&self, message: impl Into<String>) {
        let snapshot = {
            let mut state = self.lock_state();
            state.error = Some(message.into());
            state.clone()
        };
        self.notify(snapshot);
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, ViewState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, snapshot: ViewState) {
        let mut subscribers = self
            .inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|tx| tx.send(snapshot.clone()).is_ok());
    }
}

impl Default for ViewStore {
    fn default() -> Self {
        Self::new()
    }
}
