/// Lifecycle states of a context host.
///
/// - `NotActivated`: created, no context handle yet
/// - `Active`: context handle held, writes allowed
/// - `Deactivated`: handle released, may be re-activated (fresh generation)
/// - `Disposed`: terminal; every pending wait resolves cancelled
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum State {
    NotActivated,
    Active,
    Deactivated,
    Disposed,
}

/// Internal, compact IDs used for error payloads and the atomic gate.
///
/// These are stable, lightweight identifiers for debugging/telemetry inside
/// ctxhost_core; they are not part of any wire format.
impl State {
    pub const fn id(self) -> u8 {
        match self {
            State::NotActivated => 0,
            State::Active => 1,
            State::Deactivated => 2,
            State::Disposed => 3,
        }
    }

    pub const fn from_id(id: u8) -> Option<State> {
        match id {
            0 => Some(State::NotActivated),
            1 => Some(State::Active),
            2 => Some(State::Deactivated),
            3 => Some(State::Disposed),
            _ => None,
        }
    }

    /// True only for `Disposed`; no transition leaves a terminal state.
    pub const fn is_terminal(self) -> bool {
        matches!(self, State::Disposed)
    }

    /// Stable, human-readable label for logs and introspection.
    pub const fn label(self) -> &'static str {
        match self {
            State::NotActivated => "NotActivated",
            State::Active => "Active",
            State::Deactivated => "Deactivated",
            State::Disposed => "Disposed",
        }
    }
}

/// Canonical list of all lifecycle states.
pub const ALL_STATES: [State; 4] = [
    State::NotActivated,
    State::Active,
    State::Deactivated,
    State::Disposed,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip() {
        for state in ALL_STATES {
            assert_eq!(State::from_id(state.id()), Some(state));
        }
        assert_eq!(State::from_id(250), None);
    }

    #[test]
    fn only_disposed_is_terminal() {
        for state in ALL_STATES {
            assert_eq!(state.is_terminal(), state == State::Disposed);
        }
    }
}
