//! ctxhost_tokio
//!
//! Tokio-facing layer of ctxhost. Provides the [`host::ContextHost`]
//! (activation lifecycle + serialized write access + generation-scoped
//! publish signal) and the [`debounce::DebounceScheduler`] (burst coalescing
//! with strict supersession), on top of the pure semantics in
//! `ctxhost_core`.

// Public modules
pub mod debounce;
pub mod host;
pub mod util;

// Re-export core types that wrapper users will commonly need
pub use ctxhost_core::error::{CoreError, Result};
pub use ctxhost_core::lifecycle::{State, Transition};

pub use debounce::{DebounceScheduler, Outcome};
pub use host::{
    BoxFuture, CommitSink, ContextFactory, ContextHost, LifecycleEvent, PublishSignal,
};
