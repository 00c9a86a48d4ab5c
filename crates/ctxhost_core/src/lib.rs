//! ctxhost_core: runtime-agnostic core for the ctxhost context host.
//!
//! Design goals:
//! - Pure, testable logic (no async runtime deps).
//! - Explicit types; no macro wizardry.
//! - Small, stable public API surface.

pub mod error;

/// Lifecycle state machine for an activation-guarded context handle.
pub mod lifecycle;

pub use error::{CoreError, Result};
pub use lifecycle::{State, Transition};
