//! Observer identity and notification.
//!
//! An observer is any computation that depends on reactive values and wants
//! to hear about changes. In this crate that is the effect; the trait exists
//! so the runtime index does not need to know about concrete effect types.

use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for an observer.
///
/// Each observer gets a unique ID when created. The ID is what the runtime's
/// dependency index stores, so that dropped observers never keep reactive
/// sources alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

impl ObserverId {
    /// Generate a new unique observer ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ObserverId {
    fn default() -> Self {
        Self::new()
    }
}

/// A computation that can be notified when one of its dependencies changes.
pub trait Observer: Send + Sync {
    /// The observer's unique ID.
    fn id(&self) -> ObserverId;

    /// One of the observer's dependencies changed.
    fn notify(&self);
}
