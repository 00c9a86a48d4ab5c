//! ctxhost_core::lifecycle
//!
//! Pure (runtime-agnostic) lifecycle semantics for an activation-guarded
//! context handle. This module intentionally contains **no** async code.
//!
//! Key ideas:
//! - Four states; `Disposed` is terminal
//! - Explicit transition table: `apply(current, via)` yields the next state
//!   plus the side effect the host must perform (create/release the handle)
//! - A monotonic activation generation scopes readiness signals so a stale
//!   signal can never resolve a newer wait
//! - The wrapper layer owns the async parts (factory calls, write lock,
//!   publish signal)

mod engine;
mod gate;
mod state;
mod transition;

pub use engine::{apply, available_transitions, Effect, Step};
pub use gate::LifecycleGate;
pub use state::{State, ALL_STATES};
pub use transition::Transition;
