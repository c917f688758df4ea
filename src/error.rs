//! Error types for tempoplan

use thiserror::Error;

/// Result type alias for tempoplan operations
pub type Result<T> = std::result::Result<T, PlannerError>;

/// Main error type for planning, scheduling, and execution
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlannerError {
    /// An action's precondition did not hold in the current state
    #[error("Precondition of action '{action}' is not met: {detail}")]
    PreconditionUnmet { action: String, detail: String },

    /// Every registered method for a task, goal, or multigoal failed
    #[error("No applicable method for {item} at depth {depth}")]
    NoMethodApplicable { item: String, depth: usize },

    /// The root todo list exhausted all alternatives
    #[error("No plan: {detail}")]
    NoPlan { detail: String },

    /// The planner hit its deepening limit
    #[error("Deepening limit of {limit} exceeded")]
    DepthExceeded { limit: usize },

    /// The method-tries limit was hit on a single node
    #[error("Method-tries limit of {limit} exceeded for {item}")]
    MethodTriesExceeded { item: String, limit: usize },

    /// The caller cancelled planning or the deadline passed
    #[error("Planning cancelled: {detail}")]
    Cancelled { detail: String },

    /// The temporal constraint network admits no solution
    #[error("Inconsistent temporal network: {detail}")]
    InconsistentStn { detail: String },

    /// A primitive action failed during lazy execution
    #[error("Execution of '{action}' failed: {detail}")]
    ExecutionFailure { action: String, detail: String },

    /// A duration string, goal, or domain declaration had an invalid shape
    #[error("Malformed input: {detail}")]
    MalformedInput { detail: String },

    /// A todo item named something the domain does not know
    #[error("Item '{item}' isn't an action, task, unigoal, or multigoal at depth {depth}")]
    UnknownItem { item: String, depth: usize },

    /// Invalid verbose level
    #[error("Verbose level must be between 0 and 3, got {level}")]
    InvalidVerboseLevel { level: i32 },

    /// Internal invariant violation
    #[error("tempoplan internal error: {detail}")]
    Internal { detail: String },
}

impl PlannerError {
    /// Create a new PreconditionUnmet error
    pub fn precondition_unmet(action: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::PreconditionUnmet {
            action: action.into(),
            detail: detail.into(),
        }
    }

    /// Create a new NoMethodApplicable error
    pub fn no_method_applicable(item: impl Into<String>, depth: usize) -> Self {
        Self::NoMethodApplicable {
            item: item.into(),
            depth,
        }
    }

    /// Create a new NoPlan error
    pub fn no_plan(detail: impl Into<String>) -> Self {
        Self::NoPlan {
            detail: detail.into(),
        }
    }

    /// Create a new DepthExceeded error
    pub fn depth_exceeded(limit: usize) -> Self {
        Self::DepthExceeded { limit }
    }

    /// Create a new MethodTriesExceeded error
    pub fn method_tries_exceeded(item: impl Into<String>, limit: usize) -> Self {
        Self::MethodTriesExceeded {
            item: item.into(),
            limit,
        }
    }

    /// Create a new Cancelled error
    pub fn cancelled(detail: impl Into<String>) -> Self {
        Self::Cancelled {
            detail: detail.into(),
        }
    }

    /// Create a new InconsistentStn error
    pub fn inconsistent_stn(detail: impl Into<String>) -> Self {
        Self::InconsistentStn {
            detail: detail.into(),
        }
    }

    /// Create a new ExecutionFailure error
    pub fn execution_failure(action: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::ExecutionFailure {
            action: action.into(),
            detail: detail.into(),
        }
    }

    /// Create a new MalformedInput error
    pub fn malformed_input(detail: impl Into<String>) -> Self {
        Self::MalformedInput {
            detail: detail.into(),
        }
    }

    /// Create a new UnknownItem error
    pub fn unknown_item(item: impl Into<String>, depth: usize) -> Self {
        Self::UnknownItem {
            item: item.into(),
            depth,
        }
    }

    /// Create a new Internal error
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::Internal {
            detail: detail.into(),
        }
    }

    /// The error's kind tag (errors carry a kind plus free-text detail)
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PreconditionUnmet { .. } => "precondition_unmet",
            Self::NoMethodApplicable { .. } => "no_method_applicable",
            Self::NoPlan { .. } => "no_plan",
            Self::DepthExceeded { .. } => "depth_exceeded",
            Self::MethodTriesExceeded { .. } => "method_tries_exceeded",
            Self::Cancelled { .. } => "cancelled",
            Self::InconsistentStn { .. } => "inconsistent_stn",
            Self::ExecutionFailure { .. } => "execution_failure",
            Self::MalformedInput { .. } => "malformed_input",
            Self::UnknownItem { .. } => "unknown_item",
            Self::InvalidVerboseLevel { .. } => "invalid_verbose_level",
            Self::Internal { .. } => "internal",
        }
    }

    /// Whether the planner may recover from this error by backtracking.
    /// Recoverable errors never surface unless the root exhausts.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::PreconditionUnmet { .. }
                | Self::NoMethodApplicable { .. }
                | Self::MethodTriesExceeded { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            PlannerError::precondition_unmet("pickup", "hand not empty").kind(),
            "precondition_unmet"
        );
        assert_eq!(PlannerError::no_plan("root exhausted").kind(), "no_plan");
        assert_eq!(PlannerError::depth_exceeded(100).kind(), "depth_exceeded");
        assert_eq!(PlannerError::cancelled("deadline").kind(), "cancelled");
        assert_eq!(
            PlannerError::malformed_input("bad duration").kind(),
            "malformed_input"
        );
    }

    #[test]
    fn test_recoverability() {
        assert!(PlannerError::precondition_unmet("stack", "target not clear").is_recoverable());
        assert!(PlannerError::no_method_applicable("(travel alice park)", 3).is_recoverable());
        assert!(!PlannerError::no_plan("exhausted").is_recoverable());
        assert!(!PlannerError::inconsistent_stn("negative cycle").is_recoverable());
        assert!(!PlannerError::cancelled("token").is_recoverable());
    }

    #[test]
    fn test_error_display() {
        let err = PlannerError::execution_failure("ride_step", "taxi missing");
        assert_eq!(err.to_string(), "Execution of 'ride_step' failed: taxi missing");

        let err = PlannerError::depth_exceeded(50);
        assert_eq!(err.to_string(), "Deepening limit of 50 exceeded");
    }
}
