//! Scenario configuration and step construction.
//!
//! [`ScenarioRunner`] holds everything shared by the steps of one scenario:
//! the context value, the progress notifier, the middleware pipeline and the
//! error classification policy.

use std::{fmt, sync::Arc};

use crate::{
    error::StepError,
    middleware::{StepMiddleware, StepPipeline},
    notify::{NoProgressNotifier, ProgressNotifier},
    status::{ExecutionStatus, StatusMapper, default_status_mapper},
    step::{StepDescriptor, StepSequence},
};

/// Collaborators shared by every step of a scenario.
pub(crate) struct ExecutionEnvironment<C> {
    pub(crate) context: Arc<C>,
    pub(crate) notifier: Arc<dyn ProgressNotifier>,
    pub(crate) pipeline: StepPipeline,
    pub(crate) status_mapper: StatusMapper,
}

/// Builder for the steps of one scenario.
///
/// ```
/// use std::sync::Arc;
///
/// use stepwise::{ExecutionStatus, ScenarioRunner, StepDescriptor, notify::TracingProgressNotifier};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let runner = ScenarioRunner::new(())
///     .with_notifier(Arc::new(TracingProgressNotifier))
///     .with_status_mapper(|_| ExecutionStatus::Ignored);
/// let mut steps = runner.steps(vec![
///     StepDescriptor::from_fn("a passing step", |_| Ok::<_, stepwise::BoxError>(())),
/// ]);
/// steps.run().await.expect("scenario passes");
/// assert_eq!(steps.results()[0].status(), ExecutionStatus::Passed);
/// # }
/// ```
pub struct ScenarioRunner<C> {
    context: Arc<C>,
    notifier: Arc<dyn ProgressNotifier>,
    pipeline: StepPipeline,
    status_mapper: StatusMapper,
}

impl<C: Send + Sync + 'static> ScenarioRunner<C> {
    /// Create a runner for `context` with default collaborators.
    #[must_use]
    pub fn new(context: C) -> Self { Self::from_shared(Arc::new(context)) }

    /// Create a runner for a context that is already shared.
    #[must_use]
    pub fn from_shared(context: Arc<C>) -> Self {
        Self {
            context,
            notifier: Arc::new(NoProgressNotifier),
            pipeline: StepPipeline::new(),
            status_mapper: default_status_mapper(),
        }
    }

    /// Report progress to `notifier`.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn ProgressNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Wrap every step invocation with `middleware`.
    ///
    /// Middleware registered first runs outermost.
    #[must_use]
    pub fn wrap<M: StepMiddleware + 'static>(mut self, middleware: M) -> Self {
        self.pipeline.push(Arc::new(middleware));
        self
    }

    /// Classify step failures with `mapper` instead of marking them `Failed`.
    #[must_use]
    pub fn with_status_mapper<F>(mut self, mapper: F) -> Self
    where
        F: Fn(&StepError) -> ExecutionStatus + Send + Sync + 'static,
    {
        self.status_mapper = Arc::new(mapper);
        self
    }

    /// Scenario context shared by all steps.
    #[must_use]
    pub fn context(&self) -> &Arc<C> { &self.context }

    /// Bind `descriptors` as the top-level steps of the scenario, numbered
    /// from 1.
    #[must_use]
    pub fn steps(&self, descriptors: Vec<StepDescriptor<C>>) -> StepSequence<C> {
        StepSequence::new(self.environment(), "", descriptors)
    }

    fn environment(&self) -> Arc<ExecutionEnvironment<C>> {
        Arc::new(ExecutionEnvironment {
            context: Arc::clone(&self.context),
            notifier: Arc::clone(&self.notifier),
            pipeline: self.pipeline.clone(),
            status_mapper: Arc::clone(&self.status_mapper),
        })
    }
}

impl<C> fmt::Debug for ScenarioRunner<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScenarioRunner")
            .field("middleware", &self.pipeline.len())
            .finish_non_exhaustive()
    }
}
