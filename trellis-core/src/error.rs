//! Error type for slot resolution and invocation.
//!
//! The core itself never recovers from an error: producer failures unwind
//! through the owning effect, and slot invocation failures propagate to the
//! calling consumer.

use thiserror::Error;

/// Errors surfaced while resolving or invoking slots.
#[derive(Debug, Error)]
pub enum RenderError {
    /// A consumer asked for a slot name that is not currently bound.
    #[error("no slot named `{0}` is bound")]
    UnknownSlot(String),

    /// A slot was invoked after its defining component scope was torn down.
    #[error("slot's defining scope has been dropped")]
    ScopeDropped,

    /// A slot function failed while producing its fragment.
    #[error("render failed: {0}")]
    Render(String),
}

impl RenderError {
    /// Convenience constructor for slot-author failures.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }
}
