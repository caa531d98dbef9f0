//! Trellis Core
//!
//! This crate provides the slot and reactivity core for the Trellis component
//! runtime. It implements:
//!
//! - Reactive primitives (signals, effects) with automatic dependency tracking
//! - Component instances and the ambient current-instance context stack
//! - Instance-scoped job batching for deferred reactive work
//! - Named content slots: static binding plus reactive reconciliation of
//!   dynamic (conditional or loop-generated) slots
//!
//! # Architecture
//!
//! The crate is organized into a small number of modules:
//!
//! - `reactive`: signals, effects, and the dependency-tracking machinery
//! - `component`: instances, the batching scheduler, and the slot core
//! - `block`: the renderable fragment produced by slot functions
//! - `error`: the crate's error type
//!
//! # Example
//!
//! ```rust,ignore
//! use trellis_core::component::{ComponentInstance, init_slots, slot, StaticSlots};
//! use trellis_core::Block;
//!
//! let parent = ComponentInstance::root();
//! let child = ComponentInstance::child_of(&parent);
//!
//! let mut statics = StaticSlots::new();
//! statics.insert("header".into(), slot(|_| Ok(Block::text("Hello"))));
//!
//! init_slots(&child, Some(statics), None);
//!
//! let header = child.slots().get("header").unwrap();
//! // Runs with the parent (defining) scope as the current instance.
//! let block = header(&Default::default())?;
//! ```

pub mod block;
pub mod component;
pub mod error;
pub mod reactive;

pub use block::{Block, BlockNode};
pub use error::RenderError;
