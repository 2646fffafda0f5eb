//! Dependency tracking and change propagation.
//!
//! The tracker is the bookkeeping layer between stores and effects:
//!
//! 1. When a key is read inside a running effect, `track` inserts the effect
//!    into the key's dependency set and records the set in the effect's
//!    membership list.
//!
//! 2. When a key is written, `trigger` re-runs every effect in the key's
//!    dependency set, detaching each one from all its current subscriptions
//!    first so the re-run starts from a clean slate.
//!
//! # Snapshot Discipline
//!
//! Detaching an effect mutates the very dependency set `trigger` is
//! iterating, and the re-run immediately re-subscribes the effect. Iterating
//! and mutating the same collection concurrently would loop forever, so the
//! set of effects to notify is snapshotted up front and every lock is
//! released before any effect code runs.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use tracing::trace;

use super::context;
use super::runner::{AnyRunner, EffectId};

/// The set of effects depending on one (store, key) pair.
///
/// Shared between the owning store (which allocates one per touched key) and
/// the membership lists of subscribed effects. Runners are held strongly:
/// an effect stays alive as long as any dependency set references it, which
/// is what keeps a nested effect running after its handle was discarded.
#[derive(Clone, Default)]
pub(crate) struct DepSet {
    runners: Arc<RwLock<IndexMap<EffectId, Arc<dyn AnyRunner>>>>,
}

impl DepSet {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Remove `id` from the set. Idempotent.
    pub(crate) fn remove(&self, id: EffectId) {
        self.runners.write().shift_remove(&id);
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.runners.read().len()
    }
}

/// Record that the currently active effect depends on `dep`.
///
/// No-op when no effect is running: plain reads outside any effect cost one
/// thread-local lookup and nothing else.
pub(crate) fn track(store: u64, dep: &DepSet) {
    let Some(runner) = context::active_runner() else {
        return;
    };

    let id = runner.id();
    let newly_added = dep.runners.write().insert(id, runner.clone()).is_none();

    // An effect that reads the same key several times in one run is
    // registered once; the membership list mirrors the dependency set.
    if newly_added {
        runner.join(dep.clone());
        trace!(store, effect = id.as_u64(), "tracked dependency");
    }
}

/// Re-run every effect depending on `dep`.
///
/// The effect currently executing is excluded, so an effect that both reads
/// and writes the same key inside its own body does not recurse into itself.
/// Each notified effect is detached from all its subscriptions before it is
/// invoked; the re-run (whenever the scheduler lets it happen) re-tracks the
/// keys it actually reads.
pub(crate) fn trigger(store: u64, dep: &DepSet) {
    let active = context::active_id();

    // Snapshot first: detaching below mutates the set being iterated.
    let to_notify: Vec<Arc<dyn AnyRunner>> = dep
        .runners
        .read()
        .values()
        .filter(|runner| Some(runner.id()) != active)
        .cloned()
        .collect();

    if to_notify.is_empty() {
        return;
    }
    trace!(store, dependents = to_notify.len(), "triggering dependents");

    for runner in to_notify {
        if runner.is_disposed() {
            continue;
        }
        // Stale subscriptions go now, even when a scheduler defers the
        // actual re-run: a branch switch must not leave the effect bound to
        // keys it no longer reads.
        runner.detach();
        runner.notify();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::context::ActiveScope;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct MockRunner {
        id: EffectId,
        memberships: RwLock<Vec<DepSet>>,
        notified: AtomicUsize,
        disposed: AtomicBool,
    }

    impl MockRunner {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                id: EffectId::new(),
                memberships: RwLock::new(Vec::new()),
                notified: AtomicUsize::new(0),
                disposed: AtomicBool::new(false),
            })
        }

        fn membership_count(&self) -> usize {
            self.memberships.read().len()
        }
    }

    impl AnyRunner for MockRunner {
        fn id(&self) -> EffectId {
            self.id
        }

        fn join(&self, dep: DepSet) {
            self.memberships.write().push(dep);
        }

        fn detach(&self) {
            let deps = std::mem::take(&mut *self.memberships.write());
            for dep in deps {
                dep.remove(self.id);
            }
        }

        fn is_disposed(&self) -> bool {
            self.disposed.load(Ordering::SeqCst)
        }

        fn notify(self: Arc<Self>) {
            self.notified.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn track_without_active_effect_is_noop() {
        let dep = DepSet::new();

        track(0, &dep);

        assert_eq!(dep.len(), 0);
    }

    #[test]
    fn track_registers_active_effect() {
        let dep = DepSet::new();
        let runner = MockRunner::new();

        {
            let _scope = ActiveScope::enter(runner.clone());
            track(0, &dep);
        }

        assert_eq!(dep.len(), 1);
        assert_eq!(runner.membership_count(), 1);
    }

    #[test]
    fn track_deduplicates_repeated_reads() {
        let dep = DepSet::new();
        let runner = MockRunner::new();

        {
            let _scope = ActiveScope::enter(runner.clone());
            track(0, &dep);
            track(0, &dep);
            track(0, &dep);
        }

        assert_eq!(dep.len(), 1);
        assert_eq!(runner.membership_count(), 1);
    }

    #[test]
    fn trigger_on_empty_dep_set_is_noop() {
        let dep = DepSet::new();

        // Must not panic or loop.
        trigger(0, &dep);
    }

    #[test]
    fn trigger_notifies_and_detaches() {
        let dep = DepSet::new();
        let runner = MockRunner::new();

        {
            let _scope = ActiveScope::enter(runner.clone());
            track(0, &dep);
        }

        trigger(0, &dep);

        assert_eq!(runner.notified.load(Ordering::SeqCst), 1);
        // Cleanup ran before the notification.
        assert_eq!(dep.len(), 0);
        assert_eq!(runner.membership_count(), 0);
    }

    #[test]
    fn trigger_excludes_active_effect() {
        let dep = DepSet::new();
        let runner = MockRunner::new();

        let _scope = ActiveScope::enter(runner.clone());
        track(0, &dep);

        // The runner is still on the stack, simulating a write from inside
        // its own body.
        trigger(0, &dep);

        assert_eq!(runner.notified.load(Ordering::SeqCst), 0);
        // Excluded effects keep their subscriptions.
        assert_eq!(dep.len(), 1);
        assert_eq!(runner.membership_count(), 1);
    }

    #[test]
    fn trigger_skips_disposed_runners() {
        let dep = DepSet::new();
        let runner = MockRunner::new();

        {
            let _scope = ActiveScope::enter(runner.clone());
            track(0, &dep);
        }

        runner.disposed.store(true, Ordering::SeqCst);
        trigger(0, &dep);

        assert_eq!(runner.notified.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn trigger_notifies_each_runner_once() {
        let dep = DepSet::new();
        let first = MockRunner::new();
        let second = MockRunner::new();

        for runner in [first.clone(), second.clone()] {
            let _scope = ActiveScope::enter(runner);
            track(0, &dep);
        }

        trigger(0, &dep);

        assert_eq!(first.notified.load(Ordering::SeqCst), 1);
        assert_eq!(second.notified.load(Ordering::SeqCst), 1);
    }
}
