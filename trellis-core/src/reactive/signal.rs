//! Signal Implementation
//!
//! A Signal is the fundamental reactive primitive: it holds a value and is
//! the root of every dependency edge in the runtime index.
//!
//! # How Signals Work
//!
//! 1. When a signal is read inside a tracking scope, its id is recorded
//!    against the running observer.
//!
//! 2. When a signal's value changes, the runtime notifies every observer
//!    whose last run read this signal.
//!
//! 3. What a notification does is up to the observer: an unscheduled effect
//!    re-runs immediately, a scheduled effect enqueues a job instead.
//!
//! # Thread Safety
//!
//! The value sits behind an `RwLock` and handles are cheap clones sharing
//! the same storage, so signals can be moved into effect bodies freely.

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use super::context::TrackingScope;
use super::runtime::Runtime;

/// Counter for generating unique signal IDs.
static SIGNAL_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a new unique signal ID.
fn next_signal_id() -> u64 {
    SIGNAL_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// A reactive signal holding a value of type T.
///
/// # Example
///
/// ```rust,ignore
/// let count = Signal::new(0);
///
/// // Read the value (tracked when inside an effect body)
/// let value = count.get();
///
/// // Update the value (notifies dependent observers)
/// count.set(5);
/// ```
pub struct Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Unique identifier for this signal.
    id: u64,

    /// The current value.
    value: Arc<RwLock<T>>,
}

impl<T> Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a new signal with the given initial value.
    pub fn new(value: T) -> Self {
        Self {
            id: next_signal_id(),
            value: Arc::new(RwLock::new(value)),
        }
    }

    /// Get the signal's unique ID.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Get the current value.
    ///
    /// If called within a tracking scope, records this signal as a
    /// dependency of the running observer.
    pub fn get(&self) -> T {
        if TrackingScope::is_active() {
            TrackingScope::track(self.id);
        }

        self.value.read().expect("value lock poisoned").clone()
    }

    /// Get the current value without establishing a dependency.
    pub fn get_untracked(&self) -> T {
        self.value.read().expect("value lock poisoned").clone()
    }

    /// Set a new value and notify dependent observers.
    pub fn set(&self, value: T) {
        {
            let mut guard = self.value.write().expect("value lock poisoned");
            *guard = value;
        }

        Runtime::notify_signal_change(self.id);
    }

    /// Update the value using a function of the current value.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        let new_value = {
            let guard = self.value.read().expect("value lock poisoned");
            f(&guard)
        };
        self.set(new_value);
    }
}

impl<T> Clone for Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            value: Arc::clone(&self.value),
        }
    }
}

impl<T> Debug for Signal<T>
where
    T: Clone + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.id)
            .field("value", &self.get_untracked())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_get_and_set() {
        let signal = Signal::new(0);
        assert_eq!(signal.get(), 0);

        signal.set(42);
        assert_eq!(signal.get(), 42);
    }

    #[test]
    fn signal_update() {
        let signal = Signal::new(10);
        signal.update(|v| v + 5);
        assert_eq!(signal.get(), 15);
    }

    #[test]
    fn signal_clone_shares_state() {
        let signal1 = Signal::new(0);
        let signal2 = signal1.clone();

        signal1.set(42);
        assert_eq!(signal2.get(), 42);

        signal2.set(100);
        assert_eq!(signal1.get(), 100);
    }

    #[test]
    fn signal_ids_are_unique() {
        let s1 = Signal::new(0);
        let s2 = Signal::new(0);

        assert_ne!(s1.id(), s2.id());
    }

    #[test]
    fn tracked_read_records_dependency() {
        use super::super::{ObserverId, TrackingScope};

        let signal = Signal::new(1);

        let _scope = TrackingScope::enter(ObserverId::new());
        let _ = signal.get();

        assert_eq!(TrackingScope::reads(), vec![signal.id()]);
    }
}
