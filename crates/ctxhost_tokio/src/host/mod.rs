//! Context host: activation lifecycle + serialized write access.
//!
//! Responsibilities:
//! - Own the context handle obtained from the external factory
//! - Serialize transitions (factory invoked at most once per transition)
//!   and writes (at most one open write transaction process-wide) behind a
//!   single async mutex over the context slot
//! - Expose lock-free lifecycle metadata (state, generation, version)
//! - Arm the generation-scoped publish signal on the first committed write
//! - Resolve every pending wait once dispose occurs; nothing ever hangs

mod events;
mod factory;
mod signal;

pub use events::LifecycleEvent;
pub use factory::{BoxFuture, CommitSink, ContextFactory};
pub use signal::{PublishSignal, SignalValue};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, watch, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use ctxhost_core::error::{CoreError, Domain, ErrorKind, Result};
use ctxhost_core::lifecycle::{apply, Effect, LifecycleGate, State, Transition};

/// Long-lived host for an asynchronously-updated context handle.
///
/// The lifecycle driver calls [`activate`](ContextHost::activate) /
/// [`deactivate`](ContextHost::deactivate) / [`dispose`](ContextHost::dispose);
/// consumers mutate through [`with_write`](ContextHost::with_write) and
/// observe readiness through [`published`](ContextHost::published).
pub struct ContextHost<F: ContextFactory> {
    name: String,
    factory: Arc<F>,
    sink: Option<Arc<dyn CommitSink>>,

    // Lock-free metadata; mutated only while `slot` is held.
    gate: LifecycleGate,

    // Transition serializer and write arbitrator in one: whoever holds this
    // is the single mutator of the context handle.
    slot: Mutex<Option<F::Context>>,

    // Wakes writers parked until the host becomes Active.
    lifecycle_tx: watch::Sender<State>,

    publish: PublishSignal,
    disposed: CancellationToken,

    // Observer stream; lagging receivers drop events rather than stalling
    // the lifecycle.
    events: broadcast::Sender<LifecycleEvent>,

    version: AtomicU64,
}

impl<F: ContextFactory> ContextHost<F> {
    /// Create a host in `NotActivated` with no context handle.
    pub fn new(name: impl Into<String>, factory: Arc<F>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(CoreError::error()
                .domain(Domain::Lifecycle)
                .kind(ErrorKind::InvalidArgument)
                .msg("host name must not be empty")
                .build());
        }

        let (lifecycle_tx, _rx) = watch::channel(State::NotActivated);
        let (events, _rx) = broadcast::channel(32);

        Ok(Self {
            name,
            factory,
            sink: None,
            gate: LifecycleGate::new(),
            slot: Mutex::new(None),
            lifecycle_tx,
            publish: PublishSignal::new(),
            disposed: CancellationToken::new(),
            events,
            version: AtomicU64::new(0),
        })
    }

    /// Attach the progress/version side-channel.
    pub fn with_commit_sink(mut self, sink: Arc<dyn CommitSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Tie the host to an owning cancellation signal: once it fires, every
    /// operation behaves as after dispose and every pending wait resolves
    /// cancelled. The context handle itself is released by `dispose()`.
    pub fn with_owner(mut self, owner: &CancellationToken) -> Self {
        self.disposed = owner.child_token();
        self
    }

    // ---------------- Metadata (never touches the write lock) ----------------

    /// Host name (for logging/introspection).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current lifecycle state; reports `Disposed` once the owning
    /// cancellation has fired, even before `dispose()` ran.
    pub fn state(&self) -> State {
        if self.disposed.is_cancelled() {
            State::Disposed
        } else {
            self.gate.state()
        }
    }

    /// Current activation generation.
    pub fn generation(&self) -> u64 {
        self.gate.generation()
    }

    /// Number of writes committed over the host's lifetime.
    pub fn committed_version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    pub fn is_disposed(&self) -> bool {
        self.state() == State::Disposed
    }

    /// Subscribe to lifecycle transition events.
    pub fn subscribe_events(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.events.subscribe()
    }

    // ---------------- Lifecycle driver surface ----------------

    /// Obtain a context handle and transition to Active.
    ///
    /// Idempotent while Active. Starts a fresh activation generation when a
    /// handle is actually created. Fails with `Disposed` after dispose,
    /// including when dispose wins the race for the transition lock or
    /// fires while the factory is still running.
    pub async fn activate(&self) -> Result<()> {
        if self.disposed.is_cancelled() {
            return Err(CoreError::disposed("activate"));
        }

        let mut slot = self.slot.lock().await;
        if self.disposed.is_cancelled() {
            return Err(CoreError::disposed("activate"));
        }

        let from = self.gate.state();
        let step = apply(from, Transition::Activate)?;
        if step.effect == Effect::None {
            // Already Active; same readiness as the activation that won.
            return Ok(());
        }

        let context = self
            .factory
            .create_context()
            .await
            .map_err(|e| factory_error("create_context", e))?;

        if self.disposed.is_cancelled() {
            // Disposed while the factory was running; hand the fresh handle
            // straight back so nothing leaks.
            if let Err(err) = self.factory.release_context(context).await {
                warn!(host = %self.name, error = %err, "release_context failed after raced dispose");
            }
            return Err(CoreError::disposed("activate"));
        }

        *slot = Some(context);
        let generation = self.gate.begin_generation();
        self.publish.begin(generation);
        self.apply_state(from, step.next, Transition::Activate);
        info!(host = %self.name, generation, "context activated");
        Ok(())
    }

    /// Release the context handle and transition to Deactivated.
    ///
    /// No-op unless Active; readiness queries block again until the next
    /// activate + commit. Fails with `Disposed` after dispose. A factory
    /// release failure propagates, but the host still lands in Deactivated.
    pub async fn deactivate(&self) -> Result<()> {
        if self.disposed.is_cancelled() {
            return Err(CoreError::disposed("deactivate"));
        }

        let mut slot = self.slot.lock().await;
        if self.disposed.is_cancelled() {
            return Err(CoreError::disposed("deactivate"));
        }

        let from = self.gate.state();
        let step = apply(from, Transition::Deactivate)?;
        if step.effect == Effect::None {
            return Ok(());
        }

        // Un-arm readiness before the handle goes away so no reader can
        // observe a committed state that is being torn down.
        self.publish.reset(self.gate.generation());

        let released = match slot.take() {
            Some(context) => self
                .factory
                .release_context(context)
                .await
                .map_err(|e| factory_error("release_context", e)),
            None => Ok(()),
        };

        // The handle is gone either way; the lifecycle must agree, or the
        // host would report Active with an empty slot.
        self.apply_state(from, step.next, Transition::Deactivate);
        released?;
        info!(host = %self.name, "context deactivated");
        Ok(())
    }

    /// Terminal teardown. Idempotent and safe from concurrent callers.
    ///
    /// Cancels waiters *before* taking the transition lock so a pending
    /// `published()` or `with_write()` resolves cancelled immediately, even
    /// if another task currently holds the lock. Factory release errors are
    /// logged, never propagated.
    pub async fn dispose(&self) {
        self.disposed.cancel();
        self.publish.cancel();

        let mut slot = self.slot.lock().await;
        if self.gate.is_disposed() {
            return;
        }

        let from = self.gate.state();
        if let Some(context) = slot.take() {
            if let Err(err) = self.factory.release_context(context).await {
                warn!(host = %self.name, error = %err, "release_context failed during dispose");
            }
        }

        self.apply_state(from, State::Disposed, Transition::Dispose);
        info!(host = %self.name, "context host disposed");
    }

    // ---------------- Consumer surface ----------------

    /// Wait until a write has committed in the generation this call is bound
    /// to.
    ///
    /// While NotActivated/Deactivated the future simply stays pending (this
    /// is "not yet", not an error). Resolves `Err(Cancelled)` as soon as
    /// dispose is observed, including mid-wait; it never hangs after
    /// dispose.
    pub async fn published(&self) -> Result<()> {
        let mut rx = self.publish.subscribe();
        let bound = self.publish.generation();
        loop {
            match *rx.borrow_and_update() {
                SignalValue::Ready => return Ok(()),
                SignalValue::Cancelled => return Err(CoreError::cancelled("published", bound)),
                SignalValue::Pending => {}
            }

            tokio::select! {
                _ = self.disposed.cancelled() => return Err(CoreError::cancelled("published", bound)),
                changed = rx.changed() => {
                    if changed.is_err() {
                        // The signal rotated to a later generation while this
                        // wait stays bound to its own; only dispose can
                        // resolve it now.
                        self.disposed.cancelled().await;
                        return Err(CoreError::cancelled("published", bound));
                    }
                }
            }
        }
    }

    /// Open an exclusive write transaction against the live context.
    ///
    /// Waits (with no lost wakeups) until the host is Active, acquires the
    /// arbitrator, and runs `mutate` with the handle. On `Ok` the commit
    /// arms the publish signal for the current generation (idempotent) and
    /// notifies the commit sink. A `mutate` error propagates to this caller
    /// only; the lock is released on every exit path and the context stays
    /// valid for future writers. Resolves `Err(Cancelled)` if dispose fires
    /// while waiting.
    pub async fn with_write<T>(
        &self,
        mutate: impl for<'a> FnOnce(&'a mut F::Context) -> BoxFuture<'a, Result<T>>,
    ) -> Result<T> {
        let mut lifecycle_rx = self.lifecycle_tx.subscribe();

        let mut slot = loop {
            if self.disposed.is_cancelled() {
                return Err(CoreError::cancelled("with_write", self.gate.generation()));
            }

            let state = *lifecycle_rx.borrow_and_update();
            if state == State::Disposed {
                return Err(CoreError::cancelled("with_write", self.gate.generation()));
            }
            if state != State::Active {
                tokio::select! {
                    _ = self.disposed.cancelled() => {
                        return Err(CoreError::cancelled("with_write", self.gate.generation()));
                    }
                    changed = lifecycle_rx.changed() => {
                        if changed.is_err() {
                            return Err(CoreError::cancelled("with_write", self.gate.generation()));
                        }
                    }
                }
                continue;
            }

            let slot = self.slot.lock().await;
            if self.disposed.is_cancelled() {
                return Err(CoreError::cancelled("with_write", self.gate.generation()));
            }
            if !self.gate.is_active() {
                // Lost the race to a deactivate; park again.
                continue;
            }
            break slot;
        };

        let Some(context) = slot.as_mut() else {
            // Active implies a held handle; reaching here is a host bug.
            return Err(CoreError::error()
                .domain(Domain::Write)
                .kind(ErrorKind::InvalidState)
                .msg("active host without a context handle")
                .build());
        };

        let generation = self.gate.generation();
        let value = mutate(context).await?;

        let version = self.version.fetch_add(1, Ordering::SeqCst) + 1;
        self.publish.arm(generation);
        if let Some(sink) = &self.sink {
            sink.committed(generation, version);
        }
        debug!(host = %self.name, generation, version, "write committed");
        Ok(value)
    }

    // ---------------- Internal ----------------

    /// Publish a transition: gate for lock-free readers, watch for parked
    /// writers, broadcast for observers. Called only while `slot` is held.
    fn apply_state(&self, from: State, to: State, via: Transition) {
        self.gate.set_state(to);
        self.lifecycle_tx.send_replace(to);
        let _ = self.events.send(LifecycleEvent {
            transition: via,
            from,
            to,
            generation: self.gate.generation(),
        });
    }
}

fn factory_error(op: &'static str, err: impl std::fmt::Display) -> CoreError {
    CoreError::error()
        .domain(Domain::Lifecycle)
        .kind(ErrorKind::Factory)
        .msgf(format_args!("context factory {op} failed: {err}"))
        .build()
}

/// Unit tests for ContextHost plumbing; interleaving and arbitration
/// contracts live in `tests/host_semantics.rs`.
#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use std::sync::atomic::AtomicUsize;

    struct VecFactory {
        created: AtomicUsize,
        released: AtomicUsize,
    }

    impl VecFactory {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                created: AtomicUsize::new(0),
                released: AtomicUsize::new(0),
            })
        }
    }

    impl ContextFactory for VecFactory {
        type Context = Vec<String>;
        type Error = Infallible;

        fn create_context(&self) -> BoxFuture<'_, std::result::Result<Vec<String>, Infallible>> {
            self.created.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Ok(Vec::new()) })
        }

        fn release_context(
            &self,
            _context: Vec<String>,
        ) -> BoxFuture<'_, std::result::Result<(), Infallible>> {
            self.released.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Ok(()) })
        }
    }

    #[test]
    fn empty_name_is_rejected() {
        let err = ContextHost::new("", VecFactory::new()).err().expect("must fail");
        assert_eq!(err.kind, ErrorKind::InvalidArgument);
    }

    #[tokio::test]
    async fn activate_is_idempotent_and_counts_one_factory_call() {
        let factory = VecFactory::new();
        let host = ContextHost::new("test_host", Arc::clone(&factory)).unwrap();

        host.activate().await.unwrap();
        host.activate().await.unwrap();

        assert_eq!(host.state(), State::Active);
        assert_eq!(host.generation(), 1);
        assert_eq!(factory.created.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn reactivation_bumps_generation_and_recreates_context() {
        let factory = VecFactory::new();
        let host = ContextHost::new("test_host", Arc::clone(&factory)).unwrap();

        host.activate().await.unwrap();
        host.deactivate().await.unwrap();
        host.activate().await.unwrap();

        assert_eq!(host.generation(), 2);
        assert_eq!(factory.created.load(Ordering::SeqCst), 2);
        assert_eq!(factory.released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn dispose_releases_and_is_idempotent() {
        let factory = VecFactory::new();
        let host = ContextHost::new("test_host", Arc::clone(&factory)).unwrap();

        host.activate().await.unwrap();
        host.dispose().await;
        host.dispose().await;

        assert!(host.is_disposed());
        assert_eq!(factory.released.load(Ordering::SeqCst), 1);

        let err = host.activate().await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Disposed);
        let err = host.deactivate().await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Disposed);
    }

    #[tokio::test]
    async fn write_commits_bump_version_and_emit_events() {
        let factory = VecFactory::new();
        let host = ContextHost::new("test_host", factory).unwrap();
        let mut events = host.subscribe_events();

        host.activate().await.unwrap();
        let len = host
            .with_write(|items| {
                Box::pin(async move {
                    items.push("alpha".to_string());
                    Ok(items.len())
                })
            })
            .await
            .unwrap();

        assert_eq!(len, 1);
        assert_eq!(host.committed_version(), 1);

        let ev = events.try_recv().expect("expected activation event");
        assert_eq!(ev.transition, Transition::Activate);
        assert_eq!(ev.from, State::NotActivated);
        assert_eq!(ev.to, State::Active);
        assert_eq!(ev.generation, 1);
    }

    #[tokio::test]
    async fn owner_cancellation_behaves_as_disposed() {
        let owner = CancellationToken::new();
        let host = ContextHost::new("test_host", VecFactory::new())
            .unwrap()
            .with_owner(&owner);

        host.activate().await.unwrap();
        owner.cancel();

        assert_eq!(host.state(), State::Disposed);
        let err = host.activate().await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Disposed);

        let err = host.published().await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Cancelled);
    }
}
