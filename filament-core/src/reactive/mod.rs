//! Reactive Primitives
//!
//! This module implements the core reactive system: reactive stores, the
//! dependency tracker, and effects. Together they let a computation re-run
//! automatically whenever a piece of state it previously read changes.
//!
//! # Concepts
//!
//! ## Reactive stores
//!
//! A `Reactive<K, V>` wraps a plain key-value record. When a key is read
//! within a tracking context (an effect), the store registers that effect as
//! a dependent of the key. When the key's value changes, all dependents are
//! re-run.
//!
//! ## Effects
//!
//! An `Effect` is a side-effecting computation that re-runs whenever one of
//! its tracked reads changes. Before every run the effect detaches itself
//! from all dependency sets, so each run's subscriptions reflect exactly the
//! keys that run actually read (conditional branches switch cleanly).
//!
//! ## Scheduling
//!
//! By default a triggered effect re-runs synchronously inside the write's
//! call stack. An effect constructed with a scheduler hands its runner handle
//! to the scheduler instead, which decides if and when to re-run it.
//!
//! # Implementation Notes
//!
//! The system uses a thread-local stack of runners to detect dependencies:
//! when a key is read, the effect on top of the stack (if any) is recorded as
//! a dependent. The stack makes nested effects attribute their reads to the
//! innermost runner. This approach ("transparent reactivity") is the one used
//! by Vue 3, SolidJS, and Leptos.

mod context;
mod effect;
mod runner;
mod store;
mod tracker;

pub use effect::Effect;
pub use runner::EffectId;
pub use store::{make_reactive, Reactive};
