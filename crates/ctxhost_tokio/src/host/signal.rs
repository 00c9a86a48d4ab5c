use std::sync::Mutex;

use tokio::sync::watch;

/// Resolution of a publish-signal wait.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SignalValue {
    /// No write has committed in the bound generation yet.
    Pending,
    /// A write committed; readiness observations may resolve.
    Ready,
    /// The owning host was disposed; the signal is frozen forever.
    Cancelled,
}

/// Re-armable, generation-scoped readiness signal.
///
/// One `watch` channel per generation: a wait subscribes to the channel
/// current at call time and is bound to it for good. Re-arming swaps in a
/// fresh channel and drops the old sender, so a stale signal can never
/// resolve a newer wait and a newer commit can never resolve a stale wait.
///
/// State per channel:
/// - `reset(g)` force-installs a fresh `Pending` channel (leaving Active)
/// - `begin(g)` retags the current `Pending` channel with the new
///   generation, rotating only if the old one was already armed
/// - `arm(g)` resolves `Ready`, idempotent, ignored for a stale generation
/// - `cancel()` resolves `Cancelled` and freezes: every later reset/arm is a
///   no-op and every future subscriber observes `Cancelled` immediately
#[derive(Debug)]
pub struct PublishSignal {
    inner: Mutex<Inner>,
}

#[derive(Debug)]
struct Inner {
    tx: watch::Sender<SignalValue>,
    generation: u64,
    frozen: bool,
}

impl PublishSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SignalValue::Pending);
        Self {
            inner: Mutex::new(Inner {
                tx,
                generation: 0,
                frozen: false,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poison| poison.into_inner())
    }

    /// Force a fresh unresolved channel (used when leaving Active, so prior
    /// readiness can no longer be observed).
    pub fn reset(&self, generation: u64) {
        let mut inner = self.lock();
        if inner.frozen {
            return;
        }
        let (tx, _rx) = watch::channel(SignalValue::Pending);
        inner.tx = tx;
        inner.generation = generation;
    }

    /// Bind the signal to a new activation generation.
    ///
    /// Waits begun while the host was deactivated stay subscribed to the
    /// current pending channel and resolve on the new generation's first
    /// commit; only an already-armed channel is rotated out.
    pub fn begin(&self, generation: u64) {
        let mut inner = self.lock();
        if inner.frozen {
            return;
        }
        if *inner.tx.borrow() != SignalValue::Pending {
            let (tx, _rx) = watch::channel(SignalValue::Pending);
            inner.tx = tx;
        }
        inner.generation = generation;
    }

    /// Resolve the current generation's signal ready. Idempotent; a stale
    /// generation's commit is ignored.
    pub fn arm(&self, generation: u64) {
        let inner = self.lock();
        if inner.frozen || inner.generation != generation {
            return;
        }
        inner.tx.send_replace(SignalValue::Ready);
    }

    /// Resolve cancelled and freeze all future swaps.
    pub fn cancel(&self) {
        let mut inner = self.lock();
        inner.frozen = true;
        inner.tx.send_replace(SignalValue::Cancelled);
    }

    /// Receiver bound to the channel current at call time.
    pub fn subscribe(&self) -> watch::Receiver<SignalValue> {
        self.lock().tx.subscribe()
    }

    /// Generation the signal is currently bound to.
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }
}

impl Default for PublishSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arm_resolves_current_subscribers() {
        let signal = PublishSignal::new();
        signal.begin(1);

        let rx = signal.subscribe();
        assert_eq!(*rx.borrow(), SignalValue::Pending);

        signal.arm(1);
        assert_eq!(*rx.borrow(), SignalValue::Ready);

        // Idempotent.
        signal.arm(1);
        assert_eq!(*rx.borrow(), SignalValue::Ready);
    }

    #[test]
    fn stale_generation_cannot_arm() {
        let signal = PublishSignal::new();
        signal.begin(1);
        signal.reset(1);
        signal.begin(2);

        let rx = signal.subscribe();
        signal.arm(1);
        assert_eq!(*rx.borrow(), SignalValue::Pending);

        signal.arm(2);
        assert_eq!(*rx.borrow(), SignalValue::Ready);
    }

    #[test]
    fn reset_strands_prior_subscribers_unresolved() {
        let signal = PublishSignal::new();
        signal.begin(1);
        let old = signal.subscribe();

        signal.reset(1);
        signal.begin(2);
        signal.arm(2);

        // The old wait stays bound to generation 1: still pending, and its
        // sender is gone.
        assert_eq!(*old.borrow(), SignalValue::Pending);
        assert!(old.has_changed().is_err());
    }

    #[test]
    fn pending_channel_carries_over_into_next_generation() {
        let signal = PublishSignal::new();
        signal.begin(1);
        signal.reset(1);

        // Subscribed while deactivated.
        let rx = signal.subscribe();

        signal.begin(2);
        signal.arm(2);
        assert_eq!(*rx.borrow(), SignalValue::Ready);
    }

    #[test]
    fn cancel_freezes_forever() {
        let signal = PublishSignal::new();
        signal.begin(1);
        let rx = signal.subscribe();

        signal.cancel();
        assert_eq!(*rx.borrow(), SignalValue::Cancelled);

        signal.reset(2);
        signal.begin(3);
        signal.arm(3);

        assert_eq!(*signal.subscribe().borrow(), SignalValue::Cancelled);
    }
}
