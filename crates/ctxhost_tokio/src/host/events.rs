//! Lifecycle event types.
//!
//! Wrapper-side notification stream for observers of the host's lifecycle;
//! tooling can subscribe and log or mirror transitions elsewhere.

use ctxhost_core::lifecycle::{State, Transition};

/// Emitted after each applied transition (including the terminal dispose).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleEvent {
    pub transition: Transition,
    pub from: State,
    pub to: State,
    /// Activation generation after the transition was applied.
    pub generation: u64,
}
