//! Component Instances and Slots
//!
//! This module implements the component-facing half of the crate:
//!
//! - `instance`: component instances, parent links, and the ambient
//!   current-instance stack that slot invocation swaps through
//! - `scheduler`: the per-instance job queue that batches deferred reactive
//!   work between flushes
//! - `slots`: named content slots: static binding at initialization and
//!   reactive reconciliation of dynamic (conditional or loop-generated)
//!   slot sets
//!
//! The single wiring entry point is [`init_slots`]; everything else is the
//! surface consumers and setup code read from.

mod instance;
mod scheduler;
mod slots;

pub use instance::{
    current_instance, set_current_instance, ComponentHandle, ComponentInstance, InstanceGuard,
    InstanceId,
};
pub use scheduler::{instance_scheduler, JobQueue};
pub use slots::{
    init_slots, slot, DynamicSlot, DynamicSlotEntry, DynamicSlotsFn, PropValue, Slot, SlotArgs,
    SlotRegistry, StaticSlots,
};
