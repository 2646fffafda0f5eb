//! Effect Runner
//!
//! An Effect is a reactive computation that re-runs whenever one of the keys
//! it read during its last run changes.
//!
//! # How Effects Work
//!
//! 1. When created, the effect runs its function immediately to establish
//!    initial dependencies.
//!
//! 2. Every run pushes the effect onto the active-effect stack, detaches it
//!    from all previous subscriptions, executes the function (whose reactive
//!    reads re-subscribe it), then pops the stack.
//!
//! 3. When a tracked key changes, the effect re-runs synchronously, unless
//!    a scheduler was installed, in which case the scheduler receives the
//!    runner handle and decides if and when to re-run it.
//!
//! # Cleanup Before Re-run
//!
//! Detaching before every execution is what makes branch switching correct:
//! a run that no longer reaches some read must not leave the effect
//! subscribed to it. The membership list after a run reflects exactly that
//! run's reads.
//!
//! # Disposal
//!
//! `dispose` detaches the effect and marks it dead; triggered notifications
//! skip it from then on. A manual `run` on a disposed effect still executes
//! the function, but untracked, so it never re-subscribes.

use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use smallvec::SmallVec;
use tracing::trace;

use super::context::ActiveScope;
use super::runner::{AnyRunner, EffectId};
use super::tracker::DepSet;

type EffectFn<T> = dyn Fn() -> T + Send + Sync;
type SchedulerFn<T> = dyn Fn(&Effect<T>) + Send + Sync;

/// A reactive computation that re-runs when its tracked reads change.
///
/// The handle is cheaply cloneable and doubles as the runner handle handed
/// to schedulers: calling [`run`](Self::run) re-executes the function
/// through the tracked run cycle and returns its result.
///
/// # Example
///
/// ```rust,ignore
/// let store = make_reactive(HashMap::from([("count", 0)]));
///
/// let reader = store.clone();
/// let effect = Effect::new(move || {
///     println!("count is {:?}", reader.get(&"count"));
/// });
///
/// store.set("count", 5); // Prints: count is Some(5)
/// ```
pub struct Effect<T> {
    inner: Arc<EffectInner<T>>,
}

struct EffectInner<T> {
    /// Unique identifier for this effect.
    id: EffectId,

    /// The user function.
    func: Box<EffectFn<T>>,

    /// Optional re-run override invoked at trigger time instead of `func`.
    scheduler: Option<Box<SchedulerFn<T>>>,

    /// Dependency sets this effect currently belongs to. Rebuilt on every
    /// run; used for O(active deps) cleanup.
    memberships: RwLock<SmallVec<[DepSet; 4]>>,

    /// Whether the effect has been disposed.
    disposed: AtomicBool,

    /// Number of completed runs.
    runs: AtomicUsize,
}

impl<T: 'static> Effect<T> {
    /// Create a new effect and run it once, synchronously, to establish its
    /// initial dependencies.
    pub fn new<F>(func: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::build(Box::new(func), None)
    }

    /// Create a new effect whose triggered re-runs are delegated to
    /// `scheduler`.
    ///
    /// The initial run still happens synchronously here. Afterwards, a write
    /// to a tracked key calls `scheduler` with this handle instead of
    /// re-running the function; the scheduler executes inside the write's
    /// call stack and may re-run the handle whenever it chooses. Dependency
    /// cleanup has already happened by the time the scheduler is called.
    pub fn with_scheduler<F, S>(func: F, scheduler: S) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
        S: Fn(&Effect<T>) + Send + Sync + 'static,
    {
        Self::build(Box::new(func), Some(Box::new(scheduler)))
    }

    fn build(func: Box<EffectFn<T>>, scheduler: Option<Box<SchedulerFn<T>>>) -> Self {
        let effect = Self {
            inner: Arc::new(EffectInner {
                id: EffectId::new(),
                func,
                scheduler,
                memberships: RwLock::new(SmallVec::new()),
                disposed: AtomicBool::new(false),
                runs: AtomicUsize::new(0),
            }),
        };

        // Establish initial dependencies.
        effect.run();

        effect
    }

    /// Re-execute the effect function through the tracked run cycle and
    /// return its result.
    ///
    /// This is the manual escape hatch: schedulers that deferred a re-run
    /// call this to replay the effect later.
    pub fn run(&self) -> T {
        self.inner.clone().execute()
    }

    /// Dispose of the effect: detach it from every dependency set and stop
    /// it from being re-run by future writes.
    pub fn dispose(&self) {
        self.inner.disposed.store(true, Ordering::SeqCst);
        self.inner.detach_all();
        trace!(effect = self.inner.id.as_u64(), "effect disposed");
    }

    /// Whether the effect has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Get the effect's unique ID.
    pub fn id(&self) -> EffectId {
        self.inner.id
    }

    /// Number of completed runs.
    pub fn run_count(&self) -> usize {
        self.inner.runs.load(Ordering::SeqCst)
    }

    /// Number of dependency sets the effect currently belongs to.
    pub fn dependency_count(&self) -> usize {
        self.inner.memberships.read().len()
    }
}

impl<T: 'static> EffectInner<T> {
    /// The tracked run cycle: push, cleanup, execute, pop.
    fn execute(self: Arc<Self>) -> T {
        if self.disposed.load(Ordering::SeqCst) {
            // Disposed runners execute untracked and never re-subscribe.
            self.runs.fetch_add(1, Ordering::SeqCst);
            return (self.func)();
        }

        let runner: Arc<dyn AnyRunner> = self.clone();
        let _scope = ActiveScope::enter(runner);

        // Start from an empty membership list so the subscriptions recorded
        // below reflect this run alone.
        self.detach_all();

        trace!(effect = self.id.as_u64(), "running effect");
        let result = (self.func)();

        self.runs.fetch_add(1, Ordering::SeqCst);
        result
        // _scope drops here, restoring the previously active effect, also
        // on unwind should the function panic.
    }

    /// Remove this effect from every dependency set it belongs to.
    fn detach_all(&self) {
        let deps: SmallVec<[DepSet; 4]> = std::mem::take(&mut *self.memberships.write());
        for dep in deps {
            dep.remove(self.id);
        }
    }
}

impl<T: 'static> AnyRunner for EffectInner<T> {
    fn id(&self) -> EffectId {
        self.id
    }

    fn join(&self, dep: DepSet) {
        self.memberships.write().push(dep);
    }

    fn detach(&self) {
        self.detach_all();
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    fn notify(self: Arc<Self>) {
        if self.disposed.load(Ordering::SeqCst) {
            return;
        }

        match &self.scheduler {
            Some(scheduler) => {
                trace!(effect = self.id.as_u64(), "deferring re-run to scheduler");
                let handle = Effect {
                    inner: self.clone(),
                };
                scheduler(&handle);
            }
            None => {
                self.clone().execute();
            }
        }
    }
}

impl<T> Clone for Effect<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: 'static> Debug for Effect<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.inner.id)
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
