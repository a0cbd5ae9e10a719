//! State machine trait for lifecycle enums.

use super::ValidationError;

/// Lifecycle enum with an explicit transition table.
///
/// Implementors list their legal edges in `valid_transitions`; the checked
/// `transition_to` and `is_terminal` helpers are derived from that table.
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    /// Returns all states reachable from the current one in a single step.
    fn valid_transitions(&self) -> Vec<Self>;

    /// Returns true if `target` is reachable from self in a single step.
    fn can_transition_to(&self, target: &Self) -> bool {
        self.valid_transitions().contains(target)
    }

    /// Performs a checked transition.
    fn transition_to(&self, target: Self) -> Result<Self, ValidationError> {
        if self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(ValidationError::invalid_format(
                "state_transition",
                format!("Cannot transition from {:?} to {:?}", self, target),
            ))
        }
    }

    /// Checks if the state has no outgoing transitions.
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}
