//! Status transition policy.

use common::OrderStatus;

use crate::error::ValidationError;

/// How `advance_status` treats the requested transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusPolicy {
    /// Only the lifecycle transitions of [`OrderStatus::next_statuses`].
    #[default]
    Strict,

    /// Any status may be set from any other.
    Permissive,
}

impl StatusPolicy {
    pub fn check(&self, from: OrderStatus, to: OrderStatus) -> Result<(), ValidationError> {
        match self {
            StatusPolicy::Permissive => Ok(()),
            StatusPolicy::Strict if from.can_transition_to(to) => Ok(()),
            StatusPolicy::Strict => Err(ValidationError::IllegalTransition { from, to }),
        }
    }
}

impl std::str::FromStr for StatusPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(StatusPolicy::Strict),
            "permissive" => Ok(StatusPolicy::Permissive),
            other => Err(format!("unknown status policy: {other}")),
        }
    }
}
