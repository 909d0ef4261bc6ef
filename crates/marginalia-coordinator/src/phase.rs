//! Lifecycle of a single apply attempt.

use std::fmt;

use tracing::debug;

/// `Idle -> Building -> Applying(1..=K) -> Applied | Failed`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyPhase {
    Idle,
    Building,
    Applying { attempt: u8 },
    Applied,
    Failed,
}

impl ApplyPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplyPhase::Idle => "idle",
            ApplyPhase::Building => "building",
            ApplyPhase::Applying { .. } => "applying",
            ApplyPhase::Applied => "applied",
            ApplyPhase::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ApplyPhase::Applied | ApplyPhase::Failed)
    }

    /// Whether `self -> next` is a legal step.
    pub fn can_transition_to(&self, next: ApplyPhase) -> bool {
        match (self, next) {
            (ApplyPhase::Idle, ApplyPhase::Building) => true,
            (ApplyPhase::Building, ApplyPhase::Applying { attempt: 1 }) => true,
            (ApplyPhase::Building, ApplyPhase::Failed) => true,
            (ApplyPhase::Applying { attempt }, ApplyPhase::Applying { attempt: next }) => {
                next == attempt + 1
            }
            (ApplyPhase::Applying { .. }, ApplyPhase::Applied | ApplyPhase::Failed) => true,
            _ => false,
        }
    }

    /// Move to `next`, logging the transition.
    pub(crate) fn advance(&mut self, next: ApplyPhase) {
        debug_assert!(self.can_transition_to(next), "{} -> {}", self, next);
        debug!(
            subsystem = "coordinator",
            from = %self,
            to = %next,
            "Apply phase transition"
        );
        *self = next;
    }
}

impl fmt::Display for ApplyPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplyPhase::Applying { attempt } => write!(f, "applying({})", attempt),
            other => f.write_str(other.as_str()),
        }
    }
}
