//! Asset fetch bookkeeping: at most one fetch may be pending per slot, and
//! selecting a new asset aborts the previous fetch before the new one
//! starts. Aborts are expected control flow, not errors; a cancelled fetch
//! simply checks its token and drops its result on completion.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cancellation token handed to whoever performs the fetch. The fetcher
/// checks [`FetchToken::is_cancelled`] before committing its result.
#[derive(Debug, Clone)]
pub struct FetchToken {
    cancelled: Arc<AtomicBool>,
}

impl FetchToken {
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// One logical asset slot's pending fetch, if any.
#[derive(Debug, Default)]
pub struct FetchSlot {
    pending: Option<PendingFetch>,
}

#[derive(Debug)]
struct PendingFetch {
    label: String,
    cancelled: Arc<AtomicBool>,
}

impl FetchSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin fetching `label`, aborting whatever was pending before.
    pub fn begin(&mut self, label: &str) -> FetchToken {
        if let Some(previous) = self.pending.take() {
            log::debug!(
                "aborting pending fetch of {} in favour of {}",
                previous.label,
                label
            );
            previous.cancelled.store(true, Ordering::Relaxed);
        }
        let cancelled = Arc::new(AtomicBool::new(false));
        self.pending = Some(PendingFetch {
            label: label.to_string(),
            cancelled: Arc::clone(&cancelled),
        });
        FetchToken { cancelled }
    }

    /// Mark the pending fetch finished. A stale completion (the token was
    /// superseded) leaves the newer pending fetch alone.
    pub fn complete(&mut self, token: &FetchToken) {
        if token.is_cancelled() {
            return;
        }
        if let Some(pending) = &self.pending {
            if Arc::ptr_eq(&pending.cancelled, &token.cancelled) {
                self.pending = None;
            }
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}
