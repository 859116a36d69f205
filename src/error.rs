//! Canonical error types for step execution.
//!
//! [`StepError`] is the single error surface of the engine. It distinguishes
//! the deliberate bypass signal from genuine failures, and wraps parameter
//! evaluation and formatting problems with the identity of the step they
//! belong to.
//!
//! Step bodies return [`BoxError`], so any error type can be propagated with
//! `?`. A boxed [`StepError`] is recovered intact when the engine captures
//! the outcome; everything else becomes [`StepError::Failure`].

use std::{error::Error as StdError, sync::Arc};

use thiserror::Error;

/// Boxed error returned by step bodies, argument sources and formatters.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Reference-counted error shared between a step result and its caller.
pub type SharedError = Arc<dyn StdError + Send + Sync + 'static>;

/// Errors produced while running a step.
///
/// The type is cheap to clone: the same value is recorded in the step result
/// and returned to the caller of the run.
#[derive(Clone, Debug, Error)]
pub enum StepError {
    /// Deliberate skip of the remaining step logic. Recorded as
    /// [`Bypassed`](crate::ExecutionStatus::Bypassed) and never propagated.
    #[error("{reason}")]
    Bypass {
        /// Reason reported as the step status detail.
        reason: String,
    },

    /// Failure raised by a step body or one of its sub-steps.
    #[error(transparent)]
    Failure(SharedError),

    /// A deferred parameter source raised while being evaluated.
    #[error("unable to evaluate '{parameter}' parameter of step '{step}': {source}")]
    ParameterEvaluation {
        /// Raw name of the parameter.
        parameter: String,
        /// Display identity of the owning step.
        step: String,
        /// Error raised by the parameter source.
        #[source]
        source: SharedError,
    },

    /// An evaluated parameter could not be formatted for the step name.
    #[error("unable to format '{parameter}' parameter of step '{step}': {source}")]
    ParameterFormat {
        /// Raw name of the parameter.
        parameter: String,
        /// Display identity of the owning step.
        step: String,
        /// Error raised by the formatter.
        #[source]
        source: SharedError,
    },

    /// The step body, or a task it spawned, panicked.
    #[error("step panicked: {message}")]
    Panicked {
        /// Formatted panic payload.
        message: String,
    },

    /// A step body requested an argument that is missing or has another type.
    #[error("invalid step argument {index}: {reason}")]
    InvalidArgument {
        /// Position of the requested argument.
        index: usize,
        /// What went wrong.
        reason: String,
    },

    /// The step has already been executed; steps run exactly once.
    #[error("step '{step}' has already been executed")]
    AlreadyExecuted {
        /// Display identity of the step.
        step: String,
    },
}

impl StepError {
    /// Create the bypass signal carrying `reason`.
    ///
    /// ```
    /// use stepwise::{BoxError, StepError};
    ///
    /// fn body() -> Result<(), BoxError> { Err(StepError::bypass("not supported here").into()) }
    /// assert!(body().is_err());
    /// ```
    #[must_use]
    pub fn bypass(reason: impl Into<String>) -> Self {
        Self::Bypass {
            reason: reason.into(),
        }
    }

    /// Wrap an arbitrary error as a step failure.
    #[must_use]
    pub fn failure(error: impl Into<BoxError>) -> Self { Self::from_boxed(error.into()) }

    /// Create a failure from a plain message.
    #[must_use]
    pub fn msg(message: impl Into<String>) -> Self { Self::failure(message.into()) }

    /// Convert an error returned by a step body.
    ///
    /// A boxed `StepError` is unwrapped so that bypass signals and wrapped
    /// parameter errors survive the trip through [`BoxError`].
    #[must_use]
    pub fn from_boxed(error: BoxError) -> Self {
        match error.downcast::<StepError>() {
            Ok(step_error) => *step_error,
            Err(other) => Self::Failure(Arc::from(other)),
        }
    }

    /// Returns `true` for the bypass signal.
    #[must_use]
    pub fn is_bypass(&self) -> bool { matches!(self, Self::Bypass { .. }) }

    /// Borrow the wrapped failure as a concrete error type.
    ///
    /// Status mappers use this to recognise host-specific error categories.
    #[must_use]
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        match self {
            Self::Failure(error)
            | Self::ParameterEvaluation { source: error, .. }
            | Self::ParameterFormat { source: error, .. } => error.downcast_ref::<E>(),
            _ => None,
        }
    }
}

/// Result alias used by engine APIs.
pub type Result<T> = std::result::Result<T, StepError>;
