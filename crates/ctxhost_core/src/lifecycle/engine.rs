use crate::error::{CoreError, Result};

use super::{State, Transition};

/// Side effect the host must perform while applying a transition.
///
/// The engine stays pure: it only names the effect, the wrapper layer owns
/// the (possibly slow, asynchronous) factory calls.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Effect {
    /// Nothing to do (idempotent call or stateless transition).
    None,
    /// Obtain a fresh context handle from the factory.
    CreateContext,
    /// Release the currently held context handle via the factory.
    ReleaseContext,
}

/// Result of applying a transition to a state.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Step {
    pub next: State,
    pub effect: Effect,
    /// True when the host must start a new activation generation and re-arm
    /// the publish signal unresolved.
    pub fresh_generation: bool,
}

impl Step {
    const fn noop(state: State) -> Self {
        Step {
            next: state,
            effect: Effect::None,
            fresh_generation: false,
        }
    }
}

/// Apply a lifecycle transition.
///
/// This enforces:
/// - which transitions are allowed from which states
/// - idempotence where the contract defines it (Activate while Active,
///   Dispose while Disposed)
/// - determinism after the terminal state: Activate/Deactivate on a
///   disposed host fail with `ErrorKind::Disposed`, they never silently
///   resurrect it
pub fn apply(current: State, via: Transition) -> Result<Step> {
    use State::*;
    use Transition::*;

    let step = match (current, via) {
        (NotActivated | Deactivated, Activate) => Step {
            next: Active,
            effect: Effect::CreateContext,
            fresh_generation: true,
        },
        (Active, Activate) => Step::noop(Active),

        (Active, Deactivate) => Step {
            next: Deactivated,
            effect: Effect::ReleaseContext,
            fresh_generation: false,
        },
        (NotActivated | Deactivated, Deactivate) => Step::noop(current),

        (Active, Dispose) => Step {
            next: Disposed,
            effect: Effect::ReleaseContext,
            fresh_generation: false,
        },
        (NotActivated | Deactivated, Dispose) => Step {
            next: Disposed,
            effect: Effect::None,
            fresh_generation: false,
        },
        (Disposed, Dispose) => Step::noop(Disposed),

        (Disposed, Activate | Deactivate) => {
            return Err(CoreError::warn()
                .domain(crate::error::Domain::Lifecycle)
                .kind(crate::error::ErrorKind::Disposed)
                .msg("lifecycle transition on a disposed host")
                .payload(crate::error::Payload::LifecycleTransition {
                    from_state: current.id(),
                    via_transition: via.id(),
                })
                .build());
        }
    };

    Ok(step)
}

/// Transitions that change state (or perform an effect) from a given state.
///
/// Supports introspection and driver/tooling output. Idempotent no-ops
/// (Activate while Active, Dispose while Disposed) are not listed.
pub fn available_transitions(state: State) -> &'static [Transition] {
    use State::*;
    use Transition::*;

    match state {
        NotActivated => &[Activate, Dispose],
        Active => &[Deactivate, Dispose],
        Deactivated => &[Activate, Dispose],
        Disposed => &[],
    }
}

//
// Tests
//
