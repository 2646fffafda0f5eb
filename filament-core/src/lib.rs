//! Filament Core
//!
//! This crate provides the dependency-tracking core of the Filament
//! fine-grained reactivity engine. It implements:
//!
//! - Reactive key-value stores with intercepted reads and writes
//! - Automatic dependency tracking between stores and effects
//! - Effect runners with cleanup-then-retrack re-execution and optional
//!   caller-supplied scheduling
//!
//! # Architecture
//!
//! Everything lives in the `reactive` module:
//!
//! - `reactive::store`: the `Reactive<K, V>` wrapper whose reads register
//!   dependencies and whose writes re-run dependents
//! - `reactive::effect`: the `Effect<T>` runner
//! - `reactive::tracker`: dependency sets and the track/trigger machinery
//! - `reactive::context`: the thread-local active-effect stack
//!
//! # Example
//!
//! ```rust,ignore
//! use std::collections::HashMap;
//! use filament_core::{make_reactive, Effect};
//!
//! let store = make_reactive(HashMap::from([("num", 1)]));
//!
//! let reader = store.clone();
//! Effect::new(move || {
//!     println!("num is {:?}", reader.get(&"num"));
//! });
//! // Prints: num is Some(1)
//!
//! store.set("num", 2);
//! // Effect automatically re-runs, prints: num is Some(2)
//! ```

pub mod reactive;

pub use reactive::{make_reactive, Effect, EffectId, Reactive};
