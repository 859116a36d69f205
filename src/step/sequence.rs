//! Ordered group of sibling steps.

use std::{fmt, sync::Arc};

use super::{descriptor::StepDescriptor, runnable::RunnableStep};
use crate::{error::StepError, result::StepResult, runner::ExecutionEnvironment};

/// Steps sharing one group prefix, run strictly in order.
///
/// The first failing step stops the sequence; later steps are never started
/// and keep the `NotRun` status.
pub struct StepSequence<C> {
    steps: Vec<RunnableStep<C>>,
}

impl<C: Send + Sync + 'static> StepSequence<C> {
    pub(crate) fn new(
        env: Arc<ExecutionEnvironment<C>>,
        group_prefix: &str,
        descriptors: Vec<StepDescriptor<C>>,
    ) -> Self {
        let steps = descriptors
            .into_iter()
            .zip(1..)
            .map(|(descriptor, number)| {
                RunnableStep::new(Arc::clone(&env), descriptor, group_prefix, number)
            })
            .collect();
        Self { steps }
    }

    /// Run every step in order.
    ///
    /// # Errors
    ///
    /// Returns the error of the first failing step.
    pub async fn run(&mut self) -> Result<(), StepError> {
        for step in &mut self.steps {
            step.run().await?;
        }
        Ok(())
    }
}

impl<C> StepSequence<C> {
    /// Snapshot of every step result, including steps that never ran.
    #[must_use]
    pub fn results(&self) -> Vec<StepResult> {
        self.steps.iter().map(|step| step.result().clone()).collect()
    }

    /// The runnable steps.
    #[must_use]
    pub fn steps(&self) -> &[RunnableStep<C>] { &self.steps }

    /// Number of steps.
    #[must_use]
    pub fn len(&self) -> usize { self.steps.len() }

    /// Returns `true` when the sequence holds no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.steps.is_empty() }
}

impl<C> fmt::Debug for StepSequence<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.steps).finish()
    }
}
