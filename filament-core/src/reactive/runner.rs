//! Runner identity and type erasure.
//!
//! Every effect gets a unique `EffectId` when created. The ID is how
//! dependency sets deduplicate subscriptions and how the trigger path
//! recognizes the currently executing effect.
//!
//! Dependency sets and the active-effect stack hold effects behind the
//! `AnyRunner` trait so that effects with different return types can share
//! the same bookkeeping.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::tracker::DepSet;

/// Unique identifier for an effect runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EffectId(u64);

impl EffectId {
    /// Generate a new unique effect ID.
    ///
    /// Uses an atomic counter to ensure uniqueness across threads.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub(crate) fn as_u64(self) -> u64 {
        self.0
    }
}

impl Default for EffectId {
    fn default() -> Self {
        Self::new()
    }
}

/// A type-erased effect runner.
///
/// This is the view the tracker and the active-effect stack have of an
/// effect: an identity, a membership list it can be detached from, and a way
/// to deliver a change notification.
pub(crate) trait AnyRunner: Send + Sync {
    /// The runner's unique ID.
    fn id(&self) -> EffectId;

    /// Record that the runner now belongs to the dependency set `dep`.
    ///
    /// Called by the tracker when the runner is first inserted into `dep`
    /// during a run.
    fn join(&self, dep: DepSet);

    /// Remove the runner from every dependency set in its membership list
    /// and clear the list.
    fn detach(&self);

    /// Whether the runner has been disposed.
    fn is_disposed(&self) -> bool;

    /// Deliver a change notification: call the scheduler if one is set,
    /// otherwise re-run the effect function synchronously.
    fn notify(self: Arc<Self>);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effect_ids_are_unique() {
        let id1 = EffectId::new();
        let id2 = EffectId::new();
        let id3 = EffectId::new();

        assert_ne!(id1, id2);
        assert_ne!(id2, id3);
        assert_ne!(id1, id3);
    }
}
