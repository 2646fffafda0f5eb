//! Active-effect context.
//!
//! The context tracks which effect is currently executing. This enables
//! automatic dependency tracking: when a reactive key is read, the effect on
//! top of the stack is registered as a dependent.
//!
//! # Implementation
//!
//! We use a thread-local stack of runners. When an effect starts running it
//! pushes itself onto the stack; when the run completes the entry is popped,
//! restoring whatever effect was active before. The stack is what makes
//! nested effects attribute reads to the innermost runner and hand control
//! back to the outer one afterwards.
//!
//! The pop happens in a drop guard, so a panicking effect function still
//! restores the previous active effect before the panic propagates.

use std::cell::RefCell;
use std::sync::Arc;

use super::runner::{AnyRunner, EffectId};

/// The active-effect stack.
///
/// Each thread has its own stack, so every thread is an independent
/// reactivity engine and no synchronization is needed on the hot read path.
thread_local! {
    static ACTIVE_STACK: RefCell<Vec<Arc<dyn AnyRunner>>> = RefCell::new(Vec::new());
}

/// Guard that pops the active-effect stack when dropped.
///
/// Dropping on unwind keeps the stack consistent even if the effect
/// function panics.
pub(crate) struct ActiveScope {
    id: EffectId,
}

impl ActiveScope {
    /// Push `runner` as the currently active effect.
    ///
    /// The previous active effect (if any) becomes current again when the
    /// returned guard is dropped.
    pub(crate) fn enter(runner: Arc<dyn AnyRunner>) -> Self {
        let id = runner.id();
        ACTIVE_STACK.with(|stack| stack.borrow_mut().push(runner));
        Self { id }
    }
}

impl Drop for ActiveScope {
    fn drop(&mut self) {
        ACTIVE_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();

            // Catches mismatched enter/exit pairs during development.
            if let Some(runner) = popped {
                debug_assert_eq!(
                    runner.id(),
                    self.id,
                    "active-effect stack mismatch: expected {:?}, got {:?}",
                    self.id,
                    runner.id()
                );
            }
        });
    }
}

/// The currently executing effect, if any (top of this thread's stack).
pub(crate) fn active_runner() -> Option<Arc<dyn AnyRunner>> {
    ACTIVE_STACK.with(|stack| stack.borrow().last().cloned())
}

/// ID of the currently executing effect, if any.
pub(crate) fn active_id() -> Option<EffectId> {
    ACTIVE_STACK.with(|stack| stack.borrow().last().map(|runner| runner.id()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::tracker::DepSet;

    struct StubRunner {
        id: EffectId,
    }

    impl StubRunner {
        fn new() -> Arc<Self> {
            Arc::new(Self { id: EffectId::new() })
        }
    }

    impl AnyRunner for StubRunner {
        fn id(&self) -> EffectId {
            self.id
        }

        fn join(&self, _dep: DepSet) {}

        fn detach(&self) {}

        fn is_disposed(&self) -> bool {
            false
        }

        fn notify(self: Arc<Self>) {}
    }

    #[test]
    fn scope_tracks_active_runner() {
        let runner = StubRunner::new();
        let id = runner.id;

        assert!(active_id().is_none());

        {
            let _scope = ActiveScope::enter(runner);
            assert_eq!(active_id(), Some(id));
        }

        // Stack should be restored after the guard drops.
        assert!(active_id().is_none());
    }

    #[test]
    fn nested_scopes_restore_outer_runner() {
        let outer = StubRunner::new();
        let inner = StubRunner::new();
        let outer_id = outer.id;
        let inner_id = inner.id;

        {
            let _outer_scope = ActiveScope::enter(outer);
            assert_eq!(active_id(), Some(outer_id));

            {
                let _inner_scope = ActiveScope::enter(inner);
                assert_eq!(active_id(), Some(inner_id));
            }

            // After the inner scope drops, the outer runner is current again.
            assert_eq!(active_id(), Some(outer_id));
        }

        assert!(active_id().is_none());
    }

    #[test]
    fn scope_pops_on_panic() {
        let result = std::panic::catch_unwind(|| {
            let _scope = ActiveScope::enter(StubRunner::new());
            panic!("boom");
        });

        assert!(result.is_err());
        assert!(active_id().is_none());
    }
}
