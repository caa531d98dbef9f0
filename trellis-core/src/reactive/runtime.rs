//! Reactive Runtime
//!
//! The runtime is the central index connecting signals to the observers that
//! read them. It does not run anything itself; it only answers "who read
//! signal S last time" and forwards change notifications.
//!
//! # How It Works
//!
//! 1. Effects register themselves here on creation and unregister when
//!    dropped (via [`ObserverHandle`]).
//!
//! 2. After each run, an effect replaces its dependency edges with the
//!    signal ids read during that run.
//!
//! 3. When a signal's value changes, the runtime collects the registered
//!    observers for that signal and calls `notify` on each, after releasing
//!    its own locks.
//!
//! # Thread Safety
//!
//! The index is global, behind `OnceLock`'d locks. Observers are stored as
//! `Weak` references so a dropped effect can never be kept alive (or
//! notified) by a stale edge.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock, Weak};

use super::observer::{Observer, ObserverId};

static REGISTRY: OnceLock<RwLock<HashMap<ObserverId, Weak<dyn Observer>>>> = OnceLock::new();
static SIGNAL_OBSERVERS: OnceLock<RwLock<HashMap<u64, Vec<ObserverId>>>> = OnceLock::new();

fn registry() -> &'static RwLock<HashMap<ObserverId, Weak<dyn Observer>>> {
    REGISTRY.get_or_init(|| RwLock::new(HashMap::new()))
}

fn signal_observers() -> &'static RwLock<HashMap<u64, Vec<ObserverId>>> {
    SIGNAL_OBSERVERS.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Handle to a registered observer.
///
/// Dropping the handle unregisters the observer and removes its edges.
pub struct ObserverHandle {
    observer_id: ObserverId,
}

impl Drop for ObserverHandle {
    fn drop(&mut self) {
        Runtime::unregister(self.observer_id);
    }
}

/// The global reactive runtime.
pub struct Runtime;

impl Runtime {
    /// Register an observer with the runtime.
    ///
    /// Returns a handle that unregisters the observer when dropped.
    pub fn register(observer: Arc<dyn Observer>) -> ObserverHandle {
        let id = observer.id();

        registry()
            .write()
            .expect("registry lock poisoned")
            .insert(id, Arc::downgrade(&observer));

        ObserverHandle { observer_id: id }
    }

    fn unregister(id: ObserverId) {
        registry()
            .write()
            .expect("registry lock poisoned")
            .remove(&id);

        let mut observers = signal_observers()
            .write()
            .expect("signal observers lock poisoned");

        for ids in observers.values_mut() {
            ids.retain(|o| *o != id);
        }
    }

    /// Record that an observer depends on a signal.
    pub fn add_dependency(signal_id: u64, observer_id: ObserverId) {
        let mut observers = signal_observers()
            .write()
            .expect("signal observers lock poisoned");

        let ids = observers.entry(signal_id).or_default();
        if !ids.contains(&observer_id) {
            ids.push(observer_id);
        }
    }

    /// Remove all dependency edges for an observer.
    ///
    /// Called before an effect re-runs so stale edges do not survive.
    pub fn clear_dependencies(observer_id: ObserverId) {
        let mut observers = signal_observers()
            .write()
            .expect("signal observers lock poisoned");

        for ids in observers.values_mut() {
            ids.retain(|o| *o != observer_id);
        }
    }

    /// Notify every observer of the given signal that it changed.
    pub fn notify_signal_change(signal_id: u64) {
        let observer_ids = {
            let observers = signal_observers()
                .read()
                .expect("signal observers lock poisoned");

            observers.get(&signal_id).cloned().unwrap_or_default()
        };

        if observer_ids.is_empty() {
            return;
        }

        let mut to_notify = Vec::new();
        {
            let registry = registry().read().expect("registry lock poisoned");
            for id in observer_ids {
                if let Some(weak) = registry.get(&id) {
                    if let Some(observer) = weak.upgrade() {
                        to_notify.push(observer);
                    }
                }
            }
        }

        // Locks are released; notification may re-enter the runtime.
        for observer in to_notify {
            observer.notify();
        }
    }
}
