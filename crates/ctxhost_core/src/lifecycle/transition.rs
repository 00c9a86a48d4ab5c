/// Lifecycle transitions (requests) issued by the external lifecycle driver.
///
/// Outcomes (no-op, effect, rejection) are modeled by
/// `apply(current, via)`; there are no intermediate states.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Transition {
    Activate,
    Deactivate,
    Dispose,
}

/// Internal, compact IDs used for error payloads.
impl Transition {
    pub const fn id(self) -> u8 {
        match self {
            Transition::Activate => 1,
            Transition::Deactivate => 2,
            Transition::Dispose => 3,
        }
    }

    /// Stable, human-readable label for logs and introspection.
    pub const fn label(self) -> &'static str {
        match self {
            Transition::Activate => "activate",
            Transition::Deactivate => "deactivate",
            Transition::Dispose => "dispose",
        }
    }
}
