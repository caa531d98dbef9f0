//! Component instances and the ambient current-instance stack.
//!
//! An instance owns its slot registry and its job queue. Instances form a
//! tree through parent links; the parent scope is where a child's slot
//! content is authored, which is why slot invocation swaps the ambient
//! current instance to the parent for the duration of the call.
//!
//! # The current-instance stack
//!
//! "Which component is currently executing" is ambient state, scoped to the
//! logical call stack. It is modeled as an explicit thread-local stack with
//! an RAII guard: [`set_current_instance`] pushes and returns a guard, and
//! dropping the guard pops, unconditionally, including during unwinding.
//! Nested swaps therefore restore in strict reverse order of pushing.

use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::reactive::Effect;

use super::scheduler::JobQueue;
use super::slots::SlotRegistry;

/// Unique identifier for a component instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceId(u64);

impl InstanceId {
    /// Generate a new unique instance ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for InstanceId {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared handle to a component instance.
pub type ComponentHandle = Arc<ComponentInstance>;

/// A live component instance.
///
/// Owns the slot registry its children's content is resolved through and
/// the job queue its deferred reactive work is batched on. The dynamic slot
/// effect, when installed, lives exactly as long as the instance: dropping
/// the instance drops the effect and ends recomputation.
pub struct ComponentInstance {
    id: InstanceId,
    parent: Option<ComponentHandle>,
    slots: SlotRegistry,
    jobs: Arc<JobQueue>,
    slot_effect: RwLock<Option<Effect>>,
}

impl ComponentInstance {
    /// Create a parentless (root) instance.
    pub fn root() -> ComponentHandle {
        Arc::new(Self {
            id: InstanceId::new(),
            parent: None,
            slots: SlotRegistry::default(),
            jobs: Arc::new(JobQueue::new()),
            slot_effect: RwLock::new(None),
        })
    }

    /// Create an instance parented to `parent`.
    pub fn child_of(parent: &ComponentHandle) -> ComponentHandle {
        Arc::new(Self {
            id: InstanceId::new(),
            parent: Some(Arc::clone(parent)),
            slots: SlotRegistry::default(),
            jobs: Arc::new(JobQueue::new()),
            slot_effect: RwLock::new(None),
        })
    }

    /// The instance's unique ID.
    pub fn id(&self) -> InstanceId {
        self.id
    }

    /// The parent instance, if any.
    pub fn parent(&self) -> Option<ComponentHandle> {
        self.parent.clone()
    }

    /// The instance's slot registry.
    pub fn slots(&self) -> &SlotRegistry {
        &self.slots
    }

    /// The instance's job queue.
    pub fn jobs(&self) -> &Arc<JobQueue> {
        &self.jobs
    }

    /// Run all work batched on this instance since the last flush.
    pub fn flush(&self) {
        self.jobs.flush();
    }

    pub(crate) fn install_slot_effect(&self, effect: Effect) {
        *self
            .slot_effect
            .write()
            .expect("slot effect lock poisoned") = Some(effect);
    }
}

impl std::fmt::Debug for ComponentInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentInstance")
            .field("id", &self.id)
            .field("parent", &self.parent.as_ref().map(|p| p.id()))
            .field("slots", &self.slots.len())
            .finish()
    }
}

thread_local! {
    static INSTANCE_STACK: RefCell<Vec<ComponentHandle>> = const { RefCell::new(Vec::new()) };
}

/// Guard that restores the previous current instance when dropped.
pub struct InstanceGuard {
    id: InstanceId,
}

/// Make `instance` the ambient current instance until the guard drops.
///
/// Restoration is unconditional: the guard pops on normal exit, on `?`
/// early returns, and during panic unwinding.
pub fn set_current_instance(instance: ComponentHandle) -> InstanceGuard {
    let id = instance.id();
    INSTANCE_STACK.with(|stack| stack.borrow_mut().push(instance));
    InstanceGuard { id }
}

/// The ambient current instance, if any.
pub fn current_instance() -> Option<ComponentHandle> {
    INSTANCE_STACK.with(|stack| stack.borrow().last().cloned())
}

impl Drop for InstanceGuard {
    fn drop(&mut self) {
        INSTANCE_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();

            // Catch broken swap/restore nesting early.
            if let Some(instance) = popped {
                debug_assert_eq!(
                    instance.id(),
                    self.id,
                    "current-instance stack mismatch: expected {:?}, got {:?}",
                    self.id,
                    instance.id()
                );
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_links_to_parent() {
        let parent = ComponentInstance::root();
        let child = ComponentInstance::child_of(&parent);

        assert!(parent.parent().is_none());
        assert_eq!(child.parent().unwrap().id(), parent.id());
        assert_ne!(parent.id(), child.id());
    }

    #[test]
    fn guard_restores_previous_instance() {
        let a = ComponentInstance::root();
        let b = ComponentInstance::root();

        assert!(current_instance().is_none());

        {
            let _outer = set_current_instance(a.clone());
            assert_eq!(current_instance().unwrap().id(), a.id());

            {
                let _inner = set_current_instance(b.clone());
                assert_eq!(current_instance().unwrap().id(), b.id());
            }

            assert_eq!(current_instance().unwrap().id(), a.id());
        }

        assert!(current_instance().is_none());
    }

    #[test]
    fn guard_restores_on_unwind() {
        let a = ComponentInstance::root();
        let b = ComponentInstance::root();

        let _outer = set_current_instance(a.clone());

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _inner = set_current_instance(b.clone());
            panic!("boom");
        }));

        assert!(result.is_err());
        assert_eq!(current_instance().unwrap().id(), a.id());
    }
}
