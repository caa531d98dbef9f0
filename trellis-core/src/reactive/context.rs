//! Dependency-tracking scope.
//!
//! While an effect body runs, a tracking scope sits on a thread-local stack.
//! Signal reads record their ids into the innermost scope; when the body
//! finishes, the effect collects those ids as its new dependency set.
//!
//! The stack supports nesting (an effect triggered inside another effect's
//! body tracks only its own reads) and is maintained by an RAII guard so it
//! unwinds correctly if the body panics.

use std::cell::RefCell;

use super::ObserverId;

thread_local! {
    static TRACKING_STACK: RefCell<Vec<ScopeEntry>> = const { RefCell::new(Vec::new()) };
}

/// An entry on the tracking stack: the running observer plus the signal ids
/// it has read so far.
#[derive(Debug, Clone)]
struct ScopeEntry {
    observer_id: ObserverId,
    reads: Vec<u64>,
}

/// Guard that pops the tracking stack when dropped.
pub struct TrackingScope {
    observer_id: ObserverId,
}

impl TrackingScope {
    /// Enter a new tracking scope for the given observer.
    ///
    /// While the scope is active, signal reads on this thread are recorded
    /// against the observer. The scope exits when the guard is dropped.
    pub fn enter(observer_id: ObserverId) -> Self {
        TRACKING_STACK.with(|stack| {
            stack.borrow_mut().push(ScopeEntry {
                observer_id,
                reads: Vec::new(),
            });
        });

        Self { observer_id }
    }

    /// Whether any tracking scope is active on this thread.
    pub fn is_active() -> bool {
        TRACKING_STACK.with(|stack| !stack.borrow().is_empty())
    }

    /// The observer of the innermost active scope, if any.
    pub fn current_observer() -> Option<ObserverId> {
        TRACKING_STACK.with(|stack| stack.borrow().last().map(|entry| entry.observer_id))
    }

    /// Record a read of the given signal against the innermost scope.
    ///
    /// Called by signals from their `get` path.
    pub fn track(signal_id: u64) {
        TRACKING_STACK.with(|stack| {
            if let Some(entry) = stack.borrow_mut().last_mut() {
                entry.reads.push(signal_id);
            }
        });
    }

    /// The signal ids read so far in the innermost scope.
    pub fn reads() -> Vec<u64> {
        TRACKING_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .map(|entry| entry.reads.clone())
                .unwrap_or_default()
        })
    }
}

impl Drop for TrackingScope {
    fn drop(&mut self) {
        TRACKING_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();

            // Catch mismatched enter/drop pairs early.
            if let Some(entry) = popped {
                debug_assert_eq!(
                    entry.observer_id, self.observer_id,
                    "TrackingScope mismatch: expected {:?}, got {:?}",
                    self.observer_id, entry.observer_id
                );
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_tracks_observer() {
        let id = ObserverId::new();

        assert!(!TrackingScope::is_active());
        assert!(TrackingScope::current_observer().is_none());

        {
            let _scope = TrackingScope::enter(id);

            assert!(TrackingScope::is_active());
            assert_eq!(TrackingScope::current_observer(), Some(id));
        }

        assert!(!TrackingScope::is_active());
        assert!(TrackingScope::current_observer().is_none());
    }

    #[test]
    fn scope_records_reads() {
        let _scope = TrackingScope::enter(ObserverId::new());

        TrackingScope::track(1);
        TrackingScope::track(2);
        TrackingScope::track(2);

        assert_eq!(TrackingScope::reads(), vec![1, 2, 2]);
    }

    #[test]
    fn nested_scopes_track_independently() {
        let outer = ObserverId::new();
        let inner = ObserverId::new();

        let _outer_scope = TrackingScope::enter(outer);
        TrackingScope::track(10);

        {
            let _inner_scope = TrackingScope::enter(inner);
            TrackingScope::track(20);

            assert_eq!(TrackingScope::current_observer(), Some(inner));
            assert_eq!(TrackingScope::reads(), vec![20]);
        }

        assert_eq!(TrackingScope::current_observer(), Some(outer));
        assert_eq!(TrackingScope::reads(), vec![10]);
    }
}
