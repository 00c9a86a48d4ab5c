use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

use super::State;

/// Lock-free lifecycle metadata for a context host.
///
/// Intended use (wrapper layer):
/// - the host updates state/generation only while holding its context lock
/// - readers (metadata queries, logging, debounce consumers) load state and
///   generation without acquiring the write lock
///
/// The generation increases monotonically, once per successful activation,
/// and scopes readiness signals: a signal armed for generation G must never
/// resolve a wait bound to a later generation.
#[derive(Debug)]
pub struct LifecycleGate {
    state: AtomicU8,
    generation: AtomicU64,
}

impl LifecycleGate {
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(State::NotActivated.id()),
            generation: AtomicU64::new(0),
        }
    }

    pub fn state(&self) -> State {
        // Only valid ids are ever stored; fall back to the terminal state
        // rather than panicking on a torn value.
        State::from_id(self.state.load(Ordering::Acquire)).unwrap_or(State::Disposed)
    }

    pub fn set_state(&self, state: State) {
        self.state.store(state.id(), Ordering::Release);
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Start a new activation generation; returns the new value.
    pub fn begin_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn is_active(&self) -> bool {
        self.state() == State::Active
    }

    pub fn is_disposed(&self) -> bool {
        self.state() == State::Disposed
    }
}

impl Default for LifecycleGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_gate_test() {
        let gate = LifecycleGate::new();

        assert_eq!(gate.state(), State::NotActivated);
        assert_eq!(gate.generation(), 0);
        assert!(!gate.is_active());

        assert_eq!(gate.begin_generation(), 1);
        gate.set_state(State::Active);
        assert!(gate.is_active());
        assert_eq!(gate.generation(), 1);

        gate.set_state(State::Deactivated);
        assert!(!gate.is_active());

        assert_eq!(gate.begin_generation(), 2);
        gate.set_state(State::Active);
        assert!(gate.is_active());

        gate.set_state(State::Disposed);
        assert!(gate.is_disposed());
    }
}
