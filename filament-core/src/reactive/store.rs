//! Reactive key-value store.
//!
//! `Reactive<K, V>` wraps a plain key-value record so that reads and writes
//! are intercepted:
//!
//! 1. Reading a key inside a running effect registers that effect as a
//!    dependent of the key.
//!
//! 2. Writing a key commits the new value first, then re-runs every
//!    dependent, so re-runs always observe the already-updated value.
//!
//! Rust cannot intercept arbitrary field access the way a dynamic proxy
//! does, so the store exposes the interception boundary as typed accessors:
//! `get`, `set`, `update`, `remove`, `contains_key`. Values read through the
//! store are returned as-is; nested structures are not wrapped.
//!
//! # Identity
//!
//! The store owns its record, and `Clone` shares the same underlying target,
//! so there is exactly one canonical reactive handle per target by
//! construction. Dropping the last handle drops the target's dependency
//! bookkeeping with it.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::trace;

use super::tracker::{self, DepSet};

/// Counter for generating unique store IDs.
static STORE_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a new unique store ID.
fn next_store_id() -> u64 {
    STORE_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// A reactive wrapper around a plain key-value record.
///
/// # Type Parameters
///
/// - `K`: the key type. Cloned into the dependency map on first read/write.
/// - `V`: the value type. Reads hand out clones of the stored value.
///
/// # Example
///
/// ```rust,ignore
/// let store = make_reactive(HashMap::from([("num", 1)]));
///
/// // Reads inside an effect register the effect as a dependent.
/// let value = store.get(&"num");
///
/// // Writes re-run dependents after the value is committed.
/// store.set("num", 2);
/// ```
pub struct Reactive<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    inner: Arc<TargetInner<K, V>>,
}

struct TargetInner<K, V> {
    /// Unique identifier for this store.
    id: u64,

    /// The underlying record.
    values: RwLock<HashMap<K, V>>,

    /// One dependency set per key that has ever been read or written while
    /// tracked. Lives and dies with the store.
    deps: RwLock<HashMap<K, DepSet>>,
}

impl<K, V> Reactive<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Create an empty reactive store.
    pub fn new() -> Self {
        Self::from(HashMap::new())
    }

    /// Get the store's unique ID.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Get the value for `key`, registering the currently running effect (if
    /// any) as a dependent of the key.
    pub fn get(&self, key: &K) -> Option<V> {
        tracker::track(self.inner.id, &self.dep_for(key));
        self.inner.values.read().get(key).cloned()
    }

    /// Get the value for `key` without tracking a dependency.
    ///
    /// Use this when an effect needs to peek at state without re-running
    /// when it changes.
    pub fn get_untracked(&self, key: &K) -> Option<V> {
        self.inner.values.read().get(key).cloned()
    }

    /// Write `value` under `key` and re-run the key's dependents.
    ///
    /// The write is committed (and its lock released) strictly before any
    /// dependent runs, so re-runs observe the new value. Returns the
    /// previous value per the underlying map write.
    pub fn set(&self, key: K, value: V) -> Option<V> {
        let previous = {
            let mut values = self.inner.values.write();
            values.insert(key.clone(), value)
        };
        trace!(store = self.inner.id, "write committed");

        if let Some(dep) = self.existing_dep(&key) {
            tracker::trigger(self.inner.id, &dep);
        }
        previous
    }

    /// Read-modify-write: apply `f` to the current value and store the
    /// result through [`set`](Self::set).
    ///
    /// The read is untracked; only the write propagates. No-op on an absent
    /// key. Returns the previous value.
    pub fn update<F>(&self, key: &K, f: F) -> Option<V>
    where
        F: FnOnce(&V) -> V,
    {
        let current = self.inner.values.read().get(key).cloned()?;
        let next = f(&current);
        self.set(key.clone(), next)
    }

    /// Remove `key` from the store and re-run its dependents.
    ///
    /// Dependents that still read the key will observe its absence.
    pub fn remove(&self, key: &K) -> Option<V> {
        let previous = {
            let mut values = self.inner.values.write();
            values.remove(key)
        };

        if previous.is_some() {
            if let Some(dep) = self.existing_dep(key) {
                tracker::trigger(self.inner.id, &dep);
            }
        }
        previous
    }

    /// Tracked existence check for `key`.
    pub fn contains_key(&self, key: &K) -> bool {
        tracker::track(self.inner.id, &self.dep_for(key));
        self.inner.values.read().contains_key(key)
    }

    /// Number of entries in the store. Untracked.
    pub fn len(&self) -> usize {
        self.inner.values.read().len()
    }

    /// Whether the store is empty. Untracked.
    pub fn is_empty(&self) -> bool {
        self.inner.values.read().is_empty()
    }

    /// Snapshot of the store's keys. Untracked.
    pub fn keys(&self) -> Vec<K> {
        self.inner.values.read().keys().cloned().collect()
    }

    /// Look up (creating if absent) the dependency set for `key`.
    fn dep_for(&self, key: &K) -> DepSet {
        if let Some(dep) = self.inner.deps.read().get(key) {
            return dep.clone();
        }
        self.inner
            .deps
            .write()
            .entry(key.clone())
            .or_insert_with(DepSet::new)
            .clone()
    }

    /// Look up the dependency set for `key` without allocating one.
    ///
    /// Writes to keys no effect has ever read stay cheap.
    fn existing_dep(&self, key: &K) -> Option<DepSet> {
        self.inner.deps.read().get(key).cloned()
    }

    #[cfg(test)]
    fn tracked_key_count(&self) -> usize {
        self.inner.deps.read().len()
    }
}

/// Wrap `target` in a reactive handle.
///
/// The handle presents the same key set as the target; reads and writes pass
/// through, intercepted for dependency tracking.
pub fn make_reactive<K, V>(target: HashMap<K, V>) -> Reactive<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    Reactive::from(target)
}

impl<K, V> From<HashMap<K, V>> for Reactive<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn from(target: HashMap<K, V>) -> Self {
        Self {
            inner: Arc::new(TargetInner {
                id: next_store_id(),
                values: RwLock::new(target),
                deps: RwLock::new(HashMap::new()),
            }),
        }
    }
}

impl<K, V> FromIterator<(K, V)> for Reactive<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from(iter.into_iter().collect::<HashMap<K, V>>())
    }
}

impl<K, V> Default for Reactive<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Clone for Reactive<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> Debug for Reactive<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reactive")
            .field("id", &self.inner.id)
            .field("len", &self.len())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
