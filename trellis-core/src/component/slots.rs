//! Named content slots.
//!
//! A slot is a named function a parent supplies to a child component; given
//! arguments it produces a renderable [`Block`]. Slots come in two kinds:
//!
//! - **Static slots** are fixed at initialization and bound once.
//! - **Dynamic slots** are conditionally present (`Branch`) or generated by
//!   iterating a collection (`Repeat`). Their set is recomputed by a
//!   dependency-tracked effect whenever the producer's reactive inputs
//!   change, batched on the owning instance's job queue.
//!
//! # Reconciliation
//!
//! Each pass invokes the producer, binds every descriptor it yields (later
//! duplicates of a name win), and removes names bound by the previous pass
//! that the fresh output no longer mentions. The algorithm is a pure
//! reducer over (previous names, descriptor entries) producing a patch and
//! the new name set; the patch is applied to the registry under one write
//! lock. A pass that panics in the producer therefore leaves the registry
//! untouched; there is no rollback beyond that.
//!
//! # Context
//!
//! Every bound slot is wrapped so that, while it runs, the ambient current
//! instance is the slot's defining scope (the owner's parent), restored
//! unconditionally afterwards. Consumers always observe the context they
//! started with, whether the slot returns, fails, or panics.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, RwLock};

use indexmap::IndexMap;
use smallvec::SmallVec;
use tracing::trace;

use crate::block::Block;
use crate::error::RenderError;
use crate::reactive::Effect;

use super::instance::{set_current_instance, ComponentHandle};
use super::scheduler::instance_scheduler;

/// A slot function: arguments in, fragment out.
pub type Slot = Arc<dyn Fn(&SlotArgs) -> Result<Block, RenderError> + Send + Sync>;

/// Wrap a closure as a [`Slot`].
pub fn slot<F>(f: F) -> Slot
where
    F: Fn(&SlotArgs) -> Result<Block, RenderError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// A positional argument passed to a slot.
#[derive(Debug, Clone, PartialEq)]
pub enum PropValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl From<bool> for PropValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for PropValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for PropValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for PropValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for PropValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

/// Positional arguments for one slot invocation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SlotArgs(SmallVec<[PropValue; 4]>);

impl SlotArgs {
    /// No arguments.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an argument.
    pub fn push(&mut self, value: impl Into<PropValue>) {
        self.0.push(value.into());
    }

    /// Builder form of [`push`](Self::push).
    pub fn with(mut self, value: impl Into<PropValue>) -> Self {
        self.push(value);
        self
    }

    /// The argument at `index`, if present.
    pub fn get(&self, index: usize) -> Option<&PropValue> {
        self.0.get(index)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Static name→slot mapping supplied at initialization.
pub type StaticSlots = IndexMap<String, Slot>;

/// One dynamically-produced slot binding.
#[derive(Clone)]
pub struct DynamicSlot {
    /// Name the slot binds under.
    pub name: String,
    /// The raw slot function.
    pub slot: Slot,
    /// Branch key: set when this binding comes from one arm of a
    /// conditional, so structurally distinct branches sharing a name are
    /// never conflated downstream.
    pub key: Option<String>,
}

impl DynamicSlot {
    /// A keyless dynamic slot.
    pub fn new(name: impl Into<String>, slot: Slot) -> Self {
        Self {
            name: name.into(),
            slot,
            key: None,
        }
    }

    /// Attach a branch key.
    pub fn keyed(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }
}

impl std::fmt::Debug for DynamicSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicSlot")
            .field("name", &self.name)
            .field("key", &self.key)
            .finish()
    }
}

/// One entry of a producer's output.
#[derive(Clone, Debug)]
pub enum DynamicSlotEntry {
    /// A conditional slot; `None` when the branch is inactive, in which
    /// case the entry binds nothing and contributes no name.
    Branch(Option<DynamicSlot>),
    /// Slots generated by iterating a collection, in iteration order.
    Repeat(Vec<DynamicSlot>),
}

impl From<DynamicSlot> for DynamicSlotEntry {
    fn from(slot: DynamicSlot) -> Self {
        Self::Branch(Some(slot))
    }
}

impl From<Option<DynamicSlot>> for DynamicSlotEntry {
    fn from(slot: Option<DynamicSlot>) -> Self {
        Self::Branch(slot)
    }
}

impl From<Vec<DynamicSlot>> for DynamicSlotEntry {
    fn from(slots: Vec<DynamicSlot>) -> Self {
        Self::Repeat(slots)
    }
}

/// Producer of the current dynamic slot set.
///
/// Re-invoked on every reconciliation pass; whatever reactive state it reads
/// becomes the pass's dependency set.
pub type DynamicSlotsFn = Arc<dyn Fn() -> Vec<DynamicSlotEntry> + Send + Sync>;

/// The live name→slot mapping owned by a component instance.
///
/// Readable by any child content consumer; mutated only at initialization
/// (static binding) and inside the dynamic resolver's effect. Contents may
/// change between flushes as dynamic slots come and go.
#[derive(Clone, Default)]
pub struct SlotRegistry {
    inner: Arc<RwLock<IndexMap<String, Slot>>>,
}

/// One registry mutation produced by reconciliation.
pub(crate) enum SlotPatch {
    Bind(Slot),
    Remove,
}

impl SlotRegistry {
    /// Look up a slot by name.
    pub fn get(&self, name: &str) -> Option<Slot> {
        self.inner
            .read()
            .expect("slot registry lock poisoned")
            .get(name)
            .cloned()
    }

    /// Invoke the slot bound under `name`.
    pub fn call(&self, name: &str, args: &SlotArgs) -> Result<Block, RenderError> {
        let slot = self
            .get(name)
            .ok_or_else(|| RenderError::UnknownSlot(name.to_string()))?;
        slot(args)
    }

    /// Whether a slot is bound under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.inner
            .read()
            .expect("slot registry lock poisoned")
            .contains_key(name)
    }

    /// The currently bound names.
    pub fn names(&self) -> Vec<String> {
        self.inner
            .read()
            .expect("slot registry lock poisoned")
            .keys()
            .cloned()
            .collect()
    }

    /// Number of bound slots.
    pub fn len(&self) -> usize {
        self.inner.read().expect("slot registry lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn insert(&self, name: String, slot: Slot) {
        self.inner
            .write()
            .expect("slot registry lock poisoned")
            .insert(name, slot);
    }

    /// Apply a reconciliation patch under a single write lock.
    pub(crate) fn apply(&self, patch: IndexMap<String, SlotPatch>) {
        let mut bound = 0usize;
        let mut removed = 0usize;

        let mut slots = self.inner.write().expect("slot registry lock poisoned");
        for (name, op) in patch {
            match op {
                SlotPatch::Bind(slot) => {
                    slots.insert(name, slot);
                    bound += 1;
                }
                SlotPatch::Remove => {
                    slots.shift_remove(&name);
                    removed += 1;
                }
            }
        }
        drop(slots);

        trace!(bound, removed, "dynamic slots reconciled");
    }
}

impl std::fmt::Debug for SlotRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlotRegistry")
            .field("names", &self.names())
            .finish()
    }
}

/// Wrap a slot so it runs with `scope` as the ambient current instance.
///
/// The previous instance is restored when the call returns, errors, or
/// unwinds. The scope is held weakly: invoking a slot after its defining
/// component was torn down fails with [`RenderError::ScopeDropped`] instead
/// of keeping the instance tree alive.
fn with_scope(slot: Slot, scope: &ComponentHandle) -> Slot {
    let scope = Arc::downgrade(scope);
    Arc::new(move |args| {
        let target = scope.upgrade().ok_or(RenderError::ScopeDropped)?;
        let _guard = set_current_instance(target);
        slot(args)
    })
}

/// Wrap a slot so non-empty output is stamped with `key`.
fn stamp_branch_key(slot: Slot, key: String) -> Slot {
    Arc::new(move |args| {
        let mut block = slot(args)?;
        if !block.is_empty() {
            block.set_key(key.clone());
        }
        Ok(block)
    })
}

/// Bind one dynamic descriptor: branch-key stamping, then the scope guard.
fn bind_dynamic(descriptor: &DynamicSlot, scope: &ComponentHandle) -> Slot {
    let slot = match &descriptor.key {
        Some(key) => stamp_branch_key(descriptor.slot.clone(), key.clone()),
        None => descriptor.slot.clone(),
    };
    with_scope(slot, scope)
}

/// Reduce one producer output against the previous pass's names.
///
/// Pure: returns the registry patch and the new name set without touching
/// shared state. Duplicate names within `entries` resolve to the later
/// binding (producer order is authoritative). Names present in
/// `prev_names` but absent from the fresh output become removals.
fn reconcile<F>(
    prev_names: &HashSet<String>,
    entries: &[DynamicSlotEntry],
    bind: F,
) -> (IndexMap<String, SlotPatch>, HashSet<String>)
where
    F: Fn(&DynamicSlot) -> Slot,
{
    let mut patch = IndexMap::new();
    let mut seen = HashSet::new();

    for entry in entries {
        match entry {
            DynamicSlotEntry::Branch(None) => {}
            DynamicSlotEntry::Branch(Some(descriptor)) => {
                patch.insert(descriptor.name.clone(), SlotPatch::Bind(bind(descriptor)));
                seen.insert(descriptor.name.clone());
            }
            DynamicSlotEntry::Repeat(descriptors) => {
                for descriptor in descriptors {
                    patch.insert(descriptor.name.clone(), SlotPatch::Bind(bind(descriptor)));
                    seen.insert(descriptor.name.clone());
                }
            }
        }
    }

    for name in prev_names {
        if !seen.contains(name) {
            patch.insert(name.clone(), SlotPatch::Remove);
        }
    }

    (patch, seen)
}

/// Wire up an instance's slots.
///
/// Static slots are bound once, synchronously, each behind the scope guard.
/// If a dynamic producer is given, a dependency-tracked effect is installed
/// on the instance: its first pass runs eagerly here (establishing the
/// initial dynamic set and dependencies), and every later pass is deferred
/// through the instance's job queue. With no producer, no effect is
/// installed and the registry holds exactly the static slots.
pub fn init_slots(
    instance: &ComponentHandle,
    static_slots: Option<StaticSlots>,
    dynamic_slots: Option<DynamicSlotsFn>,
) {
    // Slot content is authored in the parent scope; parentless instances
    // fall back to themselves.
    let scope = instance.parent().unwrap_or_else(|| Arc::clone(instance));

    if let Some(raw) = static_slots {
        for (name, slot) in raw {
            instance.slots().insert(name, with_scope(slot, &scope));
        }
    }

    let Some(producer) = dynamic_slots else {
        return;
    };

    let registry = instance.slots().clone();
    let scope = Arc::downgrade(&scope);
    let prev_names = Mutex::new(HashSet::new());

    let effect = Effect::with_scheduler(
        move || {
            let Some(scope) = scope.upgrade() else {
                return;
            };

            let entries = producer();

            let mut prev = prev_names.lock().expect("previous names lock poisoned");
            let (patch, seen) = reconcile(&prev, &entries, |d| bind_dynamic(d, &scope));
            registry.apply(patch);
            *prev = seen;
        },
        instance_scheduler(instance),
    );

    instance.install_slot_effect(effect);
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str, marker: &'static str) -> DynamicSlot {
        DynamicSlot::new(name, slot(move |_| Ok(Block::text(marker))))
    }

    fn identity_bind(d: &DynamicSlot) -> Slot {
        d.slot.clone()
    }

    fn render(patch: &IndexMap<String, SlotPatch>, name: &str) -> String {
        match patch.get(name) {
            Some(SlotPatch::Bind(slot)) => match slot(&SlotArgs::new()).unwrap().node() {
                crate::block::BlockNode::Text(text) => text.clone(),
                other => panic!("expected text, got {other:?}"),
            },
            _ => panic!("expected a binding for `{name}`"),
        }
    }

    #[test]
    fn reconcile_binds_and_collects_names() {
        let entries = vec![
            DynamicSlotEntry::from(named("a", "a1")),
            DynamicSlotEntry::from(named("b", "b1")),
        ];

        let (patch, seen) = reconcile(&HashSet::new(), &entries, identity_bind);

        assert_eq!(patch.len(), 2);
        assert_eq!(seen.len(), 2);
        assert_eq!(render(&patch, "a"), "a1");
        assert_eq!(render(&patch, "b"), "b1");
    }

    #[test]
    fn reconcile_skips_inactive_branches() {
        let entries = vec![
            DynamicSlotEntry::Branch(None),
            DynamicSlotEntry::from(named("live", "x")),
        ];

        let (patch, seen) = reconcile(&HashSet::new(), &entries, identity_bind);

        assert_eq!(patch.len(), 1);
        assert_eq!(seen.len(), 1);
        assert!(seen.contains("live"));
    }

    #[test]
    fn reconcile_expands_repeats() {
        let entries = vec![DynamicSlotEntry::Repeat(vec![
            named("item-1", "f1"),
            named("item-2", "f2"),
        ])];

        let (patch, seen) = reconcile(&HashSet::new(), &entries, identity_bind);

        assert_eq!(seen.len(), 2);
        assert_eq!(render(&patch, "item-1"), "f1");
        assert_eq!(render(&patch, "item-2"), "f2");
    }

    #[test]
    fn reconcile_last_write_wins() {
        let entries = vec![
            DynamicSlotEntry::from(named("x", "first")),
            DynamicSlotEntry::from(named("x", "second")),
        ];

        let (patch, seen) = reconcile(&HashSet::new(), &entries, identity_bind);

        assert_eq!(patch.len(), 1);
        assert_eq!(seen.len(), 1);
        assert_eq!(render(&patch, "x"), "second");
    }

    #[test]
    fn reconcile_removes_stale_names() {
        let prev: HashSet<String> = ["a".to_string(), "b".to_string()].into();
        let entries = vec![DynamicSlotEntry::from(named("a", "a2"))];

        let (patch, seen) = reconcile(&prev, &entries, identity_bind);

        assert!(matches!(patch.get("b"), Some(SlotPatch::Remove)));
        assert!(matches!(patch.get("a"), Some(SlotPatch::Bind(_))));
        assert!(seen.contains("a"));
        assert!(!seen.contains("b"));
    }

    #[test]
    fn apply_patch_updates_registry() {
        let registry = SlotRegistry::default();
        registry.insert("stale".into(), slot(|_| Ok(Block::empty())));

        let mut patch = IndexMap::new();
        patch.insert(
            "fresh".to_string(),
            SlotPatch::Bind(slot(|_| Ok(Block::text("hi")))),
        );
        patch.insert("stale".to_string(), SlotPatch::Remove);

        registry.apply(patch);

        assert!(registry.contains("fresh"));
        assert!(!registry.contains("stale"));
        assert_eq!(registry.names(), vec!["fresh".to_string()]);
    }

    #[test]
    fn registry_call_unknown_name() {
        let registry = SlotRegistry::default();
        let err = registry.call("missing", &SlotArgs::new()).unwrap_err();
        assert!(matches!(err, RenderError::UnknownSlot(name) if name == "missing"));
    }

    #[test]
    fn branch_key_skips_empty_blocks() {
        let stamped = stamp_branch_key(slot(|_| Ok(Block::empty())), "k".into());
        let block = stamped(&SlotArgs::new()).unwrap();
        assert!(block.key().is_none());

        let stamped = stamp_branch_key(slot(|_| Ok(Block::text("t"))), "k".into());
        let block = stamped(&SlotArgs::new()).unwrap();
        assert_eq!(block.key(), Some("k"));
    }

    #[test]
    fn slot_args_are_positional() {
        let args = SlotArgs::new().with(1i64).with("two").with(false);

        assert_eq!(args.len(), 3);
        assert_eq!(args.get(0), Some(&PropValue::Int(1)));
        assert_eq!(args.get(1), Some(&PropValue::Str("two".into())));
        assert_eq!(args.get(2), Some(&PropValue::Bool(false)));
        assert_eq!(args.get(3), None);
    }
}
