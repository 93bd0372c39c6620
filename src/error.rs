//! Error types used by the motion runtime and by performers.
//!
//! This module defines two enums:
//!
//! - [`RuntimeError`]: errors surfaced by the runtime's plan-adding operations.
//! - [`PerformError`]: errors a performer returns when it cannot accept a plan.
//!
//! Adding a well-formed plan never fails: both enums only describe contract
//! violations (an empty plan name, a plan dispatched to a performer that cannot
//! execute it). Removing unknown named plans, removing unregistered tracers and
//! terminating terminated tokens are no-ops, not errors.
//!
//! Both types provide `as_label` / `as_message` helpers for logs and tracers.

use thiserror::Error;

/// # Errors produced by the motion runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// `add_plan_named` was called with an empty name.
    #[error("plan name must not be empty")]
    EmptyPlanName,

    /// The resolved performer refused the plan.
    #[error("plan rejected by {performer}: {source}")]
    PlanRejected {
        /// Display name of the performer kind that refused the plan.
        performer: &'static str,
        /// The performer's own error.
        source: PerformError,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs and trace events.
    ///
    /// # Example
    /// ```
    /// use motionvisor::RuntimeError;
    ///
    /// assert_eq!(RuntimeError::EmptyPlanName.as_label(), "runtime_empty_plan_name");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::EmptyPlanName => "runtime_empty_plan_name",
            RuntimeError::PlanRejected { .. } => "runtime_plan_rejected",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::EmptyPlanName => "empty plan name".to_string(),
            RuntimeError::PlanRejected { performer, source } => {
                format!("rejected by {performer}: {}", source.as_message())
            }
        }
    }
}

/// # Errors returned by performers.
///
/// A performer returns one of these from [`Perform::add_plan`](crate::Perform::add_plan)
/// or [`Perform::add_plan_named`](crate::Perform::add_plan_named) when the plan it
/// was handed is not one it can execute.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PerformError {
    /// The plan's concrete type is not the one this performer executes.
    #[error("{performer} cannot execute {plan}")]
    UnexpectedPlan {
        /// Performer display name.
        performer: &'static str,
        /// Plan display name.
        plan: &'static str,
    },

    /// The performer does not implement named plans.
    #[error("{performer} does not accept named plans")]
    NamedPlansUnsupported {
        /// Performer display name.
        performer: &'static str,
    },

    /// Performer-specific refusal.
    #[error("{performer} refused the plan: {reason}")]
    Refused {
        /// Performer display name.
        performer: &'static str,
        /// Free-form reason.
        reason: String,
    },
}

impl PerformError {
    /// Returns a short stable label (snake_case) for use in logs and trace events.
    ///
    /// # Example
    /// ```
    /// use motionvisor::PerformError;
    ///
    /// let err = PerformError::NamedPlansUnsupported { performer: "Spring" };
    /// assert_eq!(err.as_label(), "perform_named_unsupported");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            PerformError::UnexpectedPlan { .. } => "perform_unexpected_plan",
            PerformError::NamedPlansUnsupported { .. } => "perform_named_unsupported",
            PerformError::Refused { .. } => "perform_refused",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            PerformError::UnexpectedPlan { plan, .. } => format!("unexpected plan: {plan}"),
            PerformError::NamedPlansUnsupported { .. } => "named plans unsupported".to_string(),
            PerformError::Refused { reason, .. } => format!("refused: {reason}"),
        }
    }
}
