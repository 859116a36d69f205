//! Step execution outcomes and the policy that classifies failures.

use std::{fmt, sync::Arc};

use crate::error::StepError;

/// Outcome of a step, ordered by severity.
///
/// `NotRun` is the weakest value and `Failed` the strongest, so the
/// representative status of a group of sub-steps is simply their maximum.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ExecutionStatus {
    /// The step was never started.
    #[default]
    NotRun,
    /// The step completed successfully.
    Passed,
    /// The step deliberately skipped its remaining logic.
    Bypassed,
    /// The step failed in a way the host treats as non-fatal.
    Ignored,
    /// The step failed.
    Failed,
}

impl ExecutionStatus {
    /// Lower-case label used in logs and metric labels.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ExecutionStatus::NotRun => "not_run",
            ExecutionStatus::Passed => "passed",
            ExecutionStatus::Bypassed => "bypassed",
            ExecutionStatus::Ignored => "ignored",
            ExecutionStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ExecutionStatus::NotRun => "NotRun",
            ExecutionStatus::Passed => "Passed",
            ExecutionStatus::Bypassed => "Bypassed",
            ExecutionStatus::Ignored => "Ignored",
            ExecutionStatus::Failed => "Failed",
        };
        f.write_str(label)
    }
}

/// Maps an error escaping a step to the status recorded for it.
///
/// Mappers must be pure: they are called once per failed step and their
/// result is recorded verbatim.
pub type StatusMapper = Arc<dyn Fn(&StepError) -> ExecutionStatus + Send + Sync>;

/// Default classification: every error fails the step.
#[must_use]
pub fn default_status_mapper() -> StatusMapper { Arc::new(|_| ExecutionStatus::Failed) }
