//! Execution of a single step and its generated sub-steps.

use std::{fmt, panic::AssertUnwindSafe, sync::Arc};

use futures::{FutureExt, future::BoxFuture};
use log::warn;
use tracing::{Instrument, debug, info_span};

use super::{
    descriptor::{StepCall, StepDescriptor, StepInvocation, StepResultDescriptor},
    sequence::StepSequence,
};
use crate::{
    argument::{ArgValue, StepArgs, StepArgument},
    comment::StepComments,
    error::StepError,
    metrics,
    name::StepNameFormat,
    panic::panicked,
    result::{StepInfo, StepResult},
    runner::ExecutionEnvironment,
    scope::ScopeGuard,
    status::ExecutionStatus,
    time::ExecutionTimeWatch,
};

/// Lifecycle position of a [`RunnableStep`].
///
/// States only ever advance; a step that failed jumps straight to
/// [`Finished`](Self::Finished).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum StepState {
    /// Declared, not yet run.
    Created,
    /// Every argument has been evaluated.
    ParametersEvaluated,
    /// Start has been notified.
    Started,
    /// The body returned and its tracked tasks settled.
    BodyInvoked,
    /// Generated sub-steps ran.
    SubStepsInvoked,
    /// Final status resolved and finish notified.
    Finished,
}

/// A step bound to its scenario, ready to run once.
pub struct RunnableStep<C> {
    env: Arc<ExecutionEnvironment<C>>,
    result: StepResult,
    arguments: Vec<StepArgument<C>>,
    invocation: StepInvocation<C>,
    comments: StepComments,
    state: StepState,
    returned_value: Option<ArgValue>,
}

impl<C: Send + Sync + 'static> RunnableStep<C> {
    pub(crate) fn new(
        env: Arc<ExecutionEnvironment<C>>,
        descriptor: StepDescriptor<C>,
        group_prefix: &str,
        number: usize,
    ) -> Self {
        let (template, step_type, arguments, invocation) = descriptor.into_parts();
        let names: Vec<&str> = arguments.iter().map(StepArgument::raw_name).collect();
        let format = StepNameFormat::bind(&template, &names);
        let info = StepInfo::new(group_prefix, number, step_type, format);
        let comments = StepComments::new(info.clone(), Arc::clone(&env.notifier));
        Self {
            env,
            result: StepResult::new(info),
            arguments,
            invocation,
            comments,
            state: StepState::Created,
            returned_value: None,
        }
    }

    /// Run the step: evaluate arguments, invoke the body through the
    /// middleware pipeline, run generated sub-steps and resolve the status.
    ///
    /// A bypassed step completes successfully.
    ///
    /// # Errors
    ///
    /// Returns the error that failed the step, after it has been recorded in
    /// [`result`](Self::result) and finish has been notified. Running a step
    /// twice yields [`StepError::AlreadyExecuted`].
    pub fn run(&mut self) -> BoxFuture<'_, Result<(), StepError>> {
        let span = info_span!(
            "step",
            id = %self.result.info().label(),
            name = tracing::field::Empty
        );
        async move {
            if self.state != StepState::Created {
                return Err(StepError::AlreadyExecuted {
                    step: self.result.info().to_string(),
                });
            }
            let outcome = self.execute().await;
            self.complete(outcome)
        }
        .instrument(span)
        .boxed()
    }

    async fn execute(&mut self) -> Result<(), StepError> {
        let evaluated = self.evaluate_parameters();
        if evaluated.is_ok() {
            self.state = StepState::ParametersEvaluated;
        }
        tracing::Span::current()
            .record("name", tracing::field::display(self.result.info().name()));
        self.env.notifier.notify_step_start(self.result.info());
        self.comments.open();
        self.state = StepState::Started;
        debug!(step = %self.result.info(), "step started");
        evaluated?;

        let env = Arc::clone(&self.env);
        let info = self.result.info().clone();
        env.pipeline
            .execute_step(&info, self.time_measured_invoke().boxed())
            .await
    }

    fn evaluate_parameters(&mut self) -> Result<(), StepError> {
        let step = self.result.info().clone();
        let context = Arc::clone(&self.env.context);
        let evaluated = self
            .arguments
            .iter_mut()
            .try_for_each(|argument| argument.evaluate(&context, &step));
        let named = self.update_name_details();
        evaluated.and(named)
    }

    fn update_name_details(&mut self) -> Result<(), StepError> {
        if self.arguments.is_empty() {
            return Ok(());
        }
        let step = self.result.info().clone();
        let params = self
            .arguments
            .iter()
            .map(|argument| argument.format_name_parameter(&step))
            .collect::<Result<Vec<_>, _>>()?;
        self.result.update_name(&params);
        self.comments.set_info(self.result.info().clone());
        Ok(())
    }

    async fn time_measured_invoke(&mut self) -> Result<(), StepError> {
        let watch = ExecutionTimeWatch::start_new();
        let outcome = match self.invoke_step_method().await {
            Ok(descriptor) => {
                let (sub_steps, value) = descriptor.into_parts();
                self.returned_value = value;
                self.invoke_sub_steps(sub_steps).await
            }
            Err(error) => Err(error),
        };
        self.result.set_execution_time(watch.time());
        outcome
    }

    async fn invoke_step_method(&mut self) -> Result<StepResultDescriptor<C>, StepError> {
        let guard = ScopeGuard::install();
        let call = StepCall {
            context: Arc::clone(&self.env.context),
            args: self.argument_values(),
            tasks: guard.scope(),
            comments: self.comments.clone(),
        };
        let invocation = (self.invocation)(call);
        let outcome = match AssertUnwindSafe(invocation).catch_unwind().await {
            Ok(result) => result.map_err(StepError::from_boxed),
            Err(payload) => Err(panicked(payload.as_ref())),
        };
        let drained = guard.restore().wait().await;
        self.state = StepState::BodyInvoked;
        match (outcome, drained) {
            (Ok(descriptor), Ok(())) => Ok(descriptor),
            (Ok(_), Err(fault)) => Err(fault),
            (Err(error), Ok(())) => Err(error),
            (Err(StepError::Bypass { reason }), Err(fault)) => {
                warn!(
                    "bypass overridden by background task failure: step={}, reason={reason}",
                    self.result.info()
                );
                Err(fault)
            }
            (Err(error), Err(fault)) => {
                warn!(
                    "background task failure discarded: step={}, error={fault}",
                    self.result.info()
                );
                Err(error)
            }
        }
    }

    async fn invoke_sub_steps(&mut self, declarations: Vec<StepDescriptor<C>>) -> Result<(), StepError> {
        if declarations.is_empty() {
            return Ok(());
        }
        debug!(count = declarations.len(), "running sub-steps");
        let mut sub_steps = StepSequence::new(
            Arc::clone(&self.env),
            &self.result.info().sub_step_prefix(),
            declarations,
        );
        let outcome = sub_steps.run().await;
        self.state = StepState::SubStepsInvoked;
        self.result.set_sub_steps(sub_steps.results());
        outcome
    }

    fn argument_values(&self) -> StepArgs {
        StepArgs::new(
            self.arguments
                .iter()
                .filter_map(|argument| argument.value().cloned())
                .collect(),
        )
    }

    fn complete(&mut self, outcome: Result<(), StepError>) -> Result<(), StepError> {
        let resolved = match outcome {
            Ok(()) => {
                self.resolve_from_sub_steps();
                Ok(())
            }
            Err(StepError::Bypass { reason }) => {
                self.result.set_status(ExecutionStatus::Bypassed, Some(&reason));
                Ok(())
            }
            Err(error) => {
                let status = (self.env.status_mapper)(&error);
                self.result.set_status(status, Some(&error.to_string()));
                self.result.set_execution_exception(error.clone());
                tracing::warn!(step = %self.result.info(), %status, %error, "step failed");
                Err(error)
            }
        };

        if self.state >= StepState::Started {
            for comment in self.comments.close() {
                self.result.add_comment(comment);
            }
            self.state = StepState::Finished;
            metrics::inc_steps_finished(self.result.status());
            debug!(
                step = %self.result.info(),
                status = %self.result.status(),
                elapsed = ?self.result.execution_time().map(|time| time.duration()),
                "step finished"
            );
            self.env.notifier.notify_step_finished(&self.result);
        }
        resolved
    }

    fn resolve_from_sub_steps(&mut self) {
        let representative = self
            .result
            .sub_steps()
            .iter()
            .fold(None::<&StepResult>, |best, candidate| match best {
                Some(best) if best.status() >= candidate.status() => Some(best),
                _ => Some(candidate),
            })
            .map(|sub_step| (sub_step.status(), sub_step.status_details().map(str::to_owned)));
        match representative {
            Some((status, details)) => self.result.adopt_status(status, details),
            None => self.result.set_status(ExecutionStatus::Passed, None),
        }
    }
}

impl<C> RunnableStep<C> {
    /// Outcome recorded so far.
    #[must_use]
    pub fn result(&self) -> &StepResult { &self.result }

    /// Current lifecycle position.
    #[must_use]
    pub fn state(&self) -> StepState { self.state }

    /// Payload returned by the body, if any.
    #[must_use]
    pub fn returned_value(&self) -> Option<&ArgValue> { self.returned_value.as_ref() }

    /// Typed view of the returned payload.
    #[must_use]
    pub fn returned<T: 'static>(&self) -> Option<&T> {
        self.returned_value.as_ref()?.downcast_ref::<T>()
    }

    /// Declared arguments and their evaluation state.
    #[must_use]
    pub fn arguments(&self) -> &[StepArgument<C>] { &self.arguments }

    /// Record a comment on the step.
    pub fn comment(&self, comment: impl Into<String>) { self.comments.comment(comment); }
}

impl<C> fmt::Debug for RunnableStep<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunnableStep")
            .field("result", &self.result)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
