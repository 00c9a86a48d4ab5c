//! Debounced task scheduling with strict supersession.
//!
//! Coalesces bursts of requests so that only the latest, after a quiet
//! period, executes. Each schedule call starts an independent timer bound
//! only to its own request; scheduling the next request invalidates the
//! previous one outright: it is permanently skipped, never executed late
//! and never re-queued. This is a trailing-edge-of-latest debounce, not a
//! queue.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Resolution of a scheduled request.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Outcome<T> {
    /// The delay elapsed with the request still current; `work` ran.
    Completed(T),
    /// Superseded, cancelled, or the scheduler was disposed before the delay
    /// elapsed. Not a fault: the work never started.
    Skipped,
}

impl<T> Outcome<T> {
    pub fn is_skipped(&self) -> bool {
        matches!(self, Outcome::Skipped)
    }

    pub fn completed(self) -> Option<T> {
        match self {
            Outcome::Completed(value) => Some(value),
            Outcome::Skipped => None,
        }
    }
}

/// The single pending request; replaced (and its token cancelled) by every
/// newer schedule or run call.
#[derive(Debug)]
struct PendingRequest {
    seq: u64,
    cancel: CancellationToken,
}

/// Coalesces bursts of update triggers into one delayed execution.
///
/// At most one request is pending at any instant. Request tokens are
/// children of the scheduler's own token, so disposing (or firing the
/// owning cancellation supplied at construction) skips whatever is pending
/// and makes every later schedule resolve skipped immediately.
#[derive(Debug)]
pub struct DebounceScheduler {
    delay: Duration,
    disposed: CancellationToken,
    pending: Mutex<Option<PendingRequest>>,
    seq: AtomicU64,
}

impl DebounceScheduler {
    /// A scheduler with a fixed delay, tied to an owning cancellation
    /// signal. Firing `owner` is equivalent to [`dispose`](Self::dispose).
    pub fn new(delay: Duration, owner: &CancellationToken) -> Self {
        Self {
            delay,
            disposed: owner.child_token(),
            pending: Mutex::new(None),
            seq: AtomicU64::new(0),
        }
    }

    /// A scheduler with no external owner.
    pub fn unowned(delay: Duration) -> Self {
        Self::new(delay, &CancellationToken::new())
    }

    /// Register `work` as the new current pending request, superseding
    /// (permanently skipping) whatever was pending.
    ///
    /// Registration happens at call time; the returned future resolves with
    /// `work`'s value once the delay elapses with this request still
    /// current, or `Skipped` otherwise. `work` receives this request's
    /// cancellation token for cooperative cancellation.
    pub fn schedule<'a, T, F, Fut>(&'a self, work: F) -> impl Future<Output = Outcome<T>> + 'a
    where
        F: FnOnce(CancellationToken) -> Fut + 'a,
        Fut: Future<Output = T> + 'a,
    {
        self.schedule_inner(work, None)
    }

    /// Like [`schedule`](Self::schedule), with a per-call cancellation that
    /// skips only this request; later requests are unaffected.
    pub fn schedule_with_cancel<'a, T, F, Fut>(
        &'a self,
        work: F,
        cancel: CancellationToken,
    ) -> impl Future<Output = Outcome<T>> + 'a
    where
        F: FnOnce(CancellationToken) -> Fut + 'a,
        Fut: Future<Output = T> + 'a,
    {
        self.schedule_inner(work, Some(cancel))
    }

    fn schedule_inner<'a, T, F, Fut>(
        &'a self,
        work: F,
        call_cancel: Option<CancellationToken>,
    ) -> impl Future<Output = Outcome<T>> + 'a
    where
        F: FnOnce(CancellationToken) -> Fut + 'a,
        Fut: Future<Output = T> + 'a,
    {
        // Register before returning the future so supersession order is the
        // call order, not the poll order.
        let registered = self.register(call_cancel.as_ref());

        async move {
            let Some((seq, token)) = registered else {
                return Outcome::Skipped;
            };

            let call_cancelled = async {
                match &call_cancel {
                    Some(cancel) => cancel.cancelled().await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                _ = token.cancelled() => {
                    self.clear(seq);
                    return Outcome::Skipped;
                }
                _ = call_cancelled => {
                    token.cancel();
                    self.clear(seq);
                    return Outcome::Skipped;
                }
                _ = tokio::time::sleep(self.delay) => {}
            }

            // The delay elapsed, but a newer request may have won a
            // photo-finish; the slot decides.
            if !self.take_if_current(seq) {
                return Outcome::Skipped;
            }

            trace!(seq, "debounced request firing");
            Outcome::Completed(work(token).await)
        }
    }

    /// Bypass the delay: supersede (skip) any pending request and execute
    /// `work` immediately. Skipped only when the scheduler is already
    /// disposed or the owning cancellation has fired.
    pub async fn run_now<T, F, Fut>(&self, work: F) -> Outcome<T>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = T>,
    {
        if self.disposed.is_cancelled() {
            return Outcome::Skipped;
        }

        if let Some(prev) = self.pending_lock().take() {
            prev.cancel.cancel();
        }

        Outcome::Completed(work(self.disposed.child_token()).await)
    }

    /// Cancel the pending request (it resolves skipped, guaranteed never to
    /// execute) and refuse all future scheduling. Idempotent; safe from
    /// concurrent callers.
    pub fn dispose(&self) {
        // Cascades to every outstanding request token.
        self.disposed.cancel();
        self.pending_lock().take();
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.is_cancelled()
    }

    // ---------------- Internal ----------------

    fn register(&self, call_cancel: Option<&CancellationToken>) -> Option<(u64, CancellationToken)> {
        if self.disposed.is_cancelled() {
            return None;
        }
        if call_cancel.is_some_and(|cancel| cancel.is_cancelled()) {
            return None;
        }

        let seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        let token = self.disposed.child_token();

        let mut pending = self.pending_lock();
        if let Some(prev) = pending.replace(PendingRequest {
            seq,
            cancel: token.clone(),
        }) {
            // Supersession: the earlier request transitions pending -> skipped
            // directly, even if its own delay would have elapsed first.
            prev.cancel.cancel();
        }

        Some((seq, token))
    }

    /// Claim the slot if this request is still the current, un-cancelled
    /// one. Claiming empties the slot: once a request fires it is no longer
    /// pending and cannot be superseded.
    fn take_if_current(&self, seq: u64) -> bool {
        let mut pending = self.pending_lock();
        match pending.as_ref() {
            Some(current) if current.seq == seq && !current.cancel.is_cancelled() => {
                pending.take();
                true
            }
            _ => false,
        }
    }

    /// Drop this request's slot entry after it was cancelled, leaving a
    /// newer entry untouched.
    fn clear(&self, seq: u64) {
        let mut pending = self.pending_lock();
        if pending.as_ref().is_some_and(|current| current.seq == seq) {
            pending.take();
        }
    }

    fn pending_lock(&self) -> MutexGuard<'_, Option<PendingRequest>> {
        self.pending.lock().unwrap_or_else(|poison| poison.into_inner())
    }
}

impl Drop for DebounceScheduler {
    fn drop(&mut self) {
        self.dispose();
    }
}
