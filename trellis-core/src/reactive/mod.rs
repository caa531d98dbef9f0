//! Reactive Primitives
//!
//! This module implements the reactive substrate the slot core runs on:
//! signals, effects, and automatic dependency tracking.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A Signal is a container for mutable state. When a signal's value is read
//! within a tracking scope (an effect body), the signal is recorded as a
//! dependency of that computation. When the value changes, every dependent
//! observer is notified.
//!
//! ## Effects
//!
//! An Effect is a side-effecting computation that re-runs when its
//! dependencies change. An effect may carry a scheduler callback: instead of
//! re-running synchronously on notification, it hands a job to the scheduler,
//! which decides when to flush it. This is how slot reconciliation is batched
//! with the rest of a component's reactive work.
//!
//! # Implementation Notes
//!
//! Dependency detection uses a thread-local tracking stack: while an effect
//! body runs, signal reads push their ids into the innermost scope. After the
//! run, the effect swaps its recorded dependency set in the global runtime
//! index. This "automatic dependency tracking" approach is the one used by
//! SolidJS, Vue 3, and Leptos.

mod context;
mod effect;
mod observer;
mod runtime;
mod signal;

pub use context::TrackingScope;
pub use effect::{Effect, Job, SchedulerFn};
pub use observer::{Observer, ObserverId};
pub use runtime::{ObserverHandle, Runtime};
pub use signal::Signal;
