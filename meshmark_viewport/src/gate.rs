//! Atomic-operation gate: while any scope is open, render requests are
//! swallowed and remembered; whoever closes the outermost scope performs the
//! single follow-up render. The depth counter lives behind a shared handle
//! owned by the viewport context rather than in ambient global state, and
//! the guard decrements on every exit path, including unwinding.

use std::cell::Cell;
use std::rc::Rc;

#[derive(Debug, Default)]
struct GateState {
    depth: Cell<u32>,
    pending: Cell<bool>,
}

/// Shared suppression counter. Clones share state, so every component that
/// participates in a batch observes the same depth.
#[derive(Debug, Clone, Default)]
pub struct RenderGate {
    state: Rc<GateState>,
}

impl RenderGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a suppression scope. Scopes nest; only the last guard to drop
    /// re-enables rendering.
    pub fn begin(&self) -> GateScope {
        self.state.depth.set(self.state.depth.get() + 1);
        GateScope {
            state: Rc::clone(&self.state),
        }
    }

    /// Run `operation` inside a suppression scope. Returns the operation's
    /// output and, for the outermost scope only, whether a render was
    /// requested while suppressed (and is now due).
    pub fn run_atomic<R>(&self, operation: impl FnOnce() -> R) -> (R, bool) {
        let scope = self.begin();
        let output = operation();
        drop(scope);
        let render_due = self.state.depth.get() == 0 && self.state.pending.replace(false);
        (output, render_due)
    }

    pub fn suppressed(&self) -> bool {
        self.state.depth.get() > 0
    }

    /// Ask for a render. Returns `true` when the caller should render now;
    /// while suppressed the request is remembered for the outermost release.
    pub fn request(&self) -> bool {
        if self.suppressed() {
            self.state.pending.set(true);
            false
        } else {
            true
        }
    }
}

/// RAII guard for one suppression level.
#[derive(Debug)]
pub struct GateScope {
    state: Rc<GateState>,
}

impl Drop for GateScope {
    fn drop(&mut self) {
        let depth = self.state.depth.get();
        debug_assert!(depth > 0, "gate scope dropped at depth 0");
        self.state.depth.set(depth.saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_pass_through_when_idle() {
        let gate = RenderGate::new();
        assert!(!gate.suppressed());
        assert!(gate.request());
    }

    #[test]
    fn requests_inside_a_batch_are_deferred_once() {
        let gate = RenderGate::new();
        let ((), render_due) = gate.run_atomic(|| {
            assert!(gate.suppressed());
            assert!(!gate.request());
            assert!(!gate.request());
        });
        assert!(render_due);
        assert!(!gate.suppressed());

        // The pending flag was consumed by the outermost release.
        let ((), render_due) = gate.run_atomic(|| {});
        assert!(!render_due);
    }

    #[test]
    fn nested_batches_only_release_at_the_outermost_scope() {
        let gate = RenderGate::new();
        let ((), render_due) = gate.run_atomic(|| {
            let ((), inner_due) = gate.run_atomic(|| {
                assert!(!gate.request());
            });
            // Still inside the outer scope, so nothing is due yet.
            assert!(!inner_due);
            assert!(gate.suppressed());
        });
        assert!(render_due);
    }

    #[test]
    fn unwinding_closes_the_scope() {
        let gate = RenderGate::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _scope = gate.begin();
            panic!("mutation failed");
        }));
        assert!(result.is_err());
        assert!(!gate.suppressed());
    }
}
