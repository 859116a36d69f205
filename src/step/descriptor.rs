//! Declarative description of a step and its invocation delegate.

use std::{fmt, future::Future, sync::Arc};

use futures::{FutureExt, future::BoxFuture};

use crate::{
    argument::{ArgValue, StepArgs, StepArgument},
    comment::StepComments,
    error::BoxError,
    scope::TaskScope,
};

/// Future returned by a step invocation.
pub type StepFuture<C> = BoxFuture<'static, Result<StepResultDescriptor<C>, BoxError>>;

/// Type-erased step body.
pub type StepInvocation<C> = Arc<dyn Fn(StepCall<C>) -> StepFuture<C> + Send + Sync>;

/// Everything a step body receives when it is invoked.
pub struct StepCall<C> {
    pub(crate) context: Arc<C>,
    pub(crate) args: StepArgs,
    pub(crate) tasks: TaskScope,
    pub(crate) comments: StepComments,
}

impl<C> StepCall<C> {
    /// Scenario context shared by all steps of the scenario.
    #[must_use]
    pub fn context(&self) -> &Arc<C> { &self.context }

    /// Evaluated argument values, in declaration order.
    #[must_use]
    pub fn args(&self) -> &StepArgs { &self.args }

    /// Scope for background work the step must wait for.
    #[must_use]
    pub fn tasks(&self) -> &TaskScope { &self.tasks }

    /// Comment channel of the running step.
    #[must_use]
    pub fn comments(&self) -> &StepComments { &self.comments }

    /// Record a comment on the running step.
    pub fn comment(&self, comment: impl Into<String>) { self.comments.comment(comment); }
}

impl<C> fmt::Debug for StepCall<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepCall")
            .field("args", &self.args)
            .field("tasks", &self.tasks)
            .finish_non_exhaustive()
    }
}

/// What a step body hands back: generated sub-steps and an optional payload.
pub struct StepResultDescriptor<C> {
    sub_steps: Vec<StepDescriptor<C>>,
    value: Option<ArgValue>,
}

impl<C> StepResultDescriptor<C> {
    /// Descriptor without sub-steps or payload.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sub_steps: Vec::new(),
            value: None,
        }
    }

    /// Sub-steps to run, in order, after the body returns.
    #[must_use]
    pub fn with_sub_steps(mut self, sub_steps: impl IntoIterator<Item = StepDescriptor<C>>) -> Self {
        self.sub_steps.extend(sub_steps);
        self
    }

    /// Value made available through
    /// [`RunnableStep::returned_value`](crate::step::RunnableStep::returned_value).
    #[must_use]
    pub fn with_value<T: Send + Sync + 'static>(mut self, value: T) -> Self {
        self.value = Some(Arc::new(value));
        self
    }

    /// Declared sub-steps.
    #[must_use]
    pub fn sub_steps(&self) -> &[StepDescriptor<C>] { &self.sub_steps }

    pub(crate) fn into_parts(self) -> (Vec<StepDescriptor<C>>, Option<ArgValue>) {
        (self.sub_steps, self.value)
    }
}

impl<C> Default for StepResultDescriptor<C> {
    fn default() -> Self { Self::new() }
}

impl<C> From<()> for StepResultDescriptor<C> {
    fn from((): ()) -> Self { Self::new() }
}

impl<C> From<Vec<StepDescriptor<C>>> for StepResultDescriptor<C> {
    fn from(sub_steps: Vec<StepDescriptor<C>>) -> Self { Self::new().with_sub_steps(sub_steps) }
}

impl<C> fmt::Debug for StepResultDescriptor<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepResultDescriptor")
            .field("sub_steps", &self.sub_steps)
            .field("has_value", &self.value.is_some())
            .finish()
    }
}

/// Declaration of one step: name template, arguments and body.
///
/// ```
/// use stepwise::{StepArgument, StepDescriptor};
///
/// let step: StepDescriptor<()> = StepDescriptor::from_fn("the total is TOTAL", |call| {
///     let total: &i32 = call.args().get(0)?;
///     assert_eq!(*total, 10);
///     Ok::<_, stepwise::BoxError>(())
/// })
/// .with_type("Then")
/// .with_argument(StepArgument::constant("total", 10));
/// assert_eq!(step.template(), "the total is TOTAL");
/// ```
pub struct StepDescriptor<C> {
    template: String,
    step_type: Option<String>,
    arguments: Vec<StepArgument<C>>,
    invocation: StepInvocation<C>,
}

impl<C: Send + Sync + 'static> StepDescriptor<C> {
    /// Declare a step with a synchronous body.
    pub fn from_fn<F, R, E>(template: impl Into<String>, body: F) -> Self
    where
        F: Fn(StepCall<C>) -> Result<R, E> + Send + Sync + 'static,
        R: Into<StepResultDescriptor<C>> + 'static,
        E: Into<BoxError> + 'static,
    {
        let body = Arc::new(body);
        Self::with_invocation(
            template,
            Arc::new(move |call: StepCall<C>| -> StepFuture<C> {
                let body = Arc::clone(&body);
                async move { body(call).map(Into::into).map_err(Into::into) }.boxed()
            }),
        )
    }

    /// Declare a step whose body returns a future.
    pub fn from_async<F, Fut, R, E>(template: impl Into<String>, body: F) -> Self
    where
        F: Fn(StepCall<C>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
        R: Into<StepResultDescriptor<C>> + 'static,
        E: Into<BoxError> + 'static,
    {
        let body = Arc::new(body);
        Self::with_invocation(
            template,
            Arc::new(move |call: StepCall<C>| -> StepFuture<C> {
                let body = Arc::clone(&body);
                async move { body(call).await.map(Into::into).map_err(Into::into) }.boxed()
            }),
        )
    }
}

impl<C> StepDescriptor<C> {
    /// Declare a step from an already type-erased invocation.
    pub fn with_invocation(template: impl Into<String>, invocation: StepInvocation<C>) -> Self {
        Self {
            template: template.into(),
            step_type: None,
            arguments: Vec::new(),
            invocation,
        }
    }

    /// Set the step type keyword rendered before the name.
    #[must_use]
    pub fn with_type(mut self, step_type: impl Into<String>) -> Self {
        self.step_type = Some(step_type.into());
        self
    }

    /// Append an argument.
    #[must_use]
    pub fn with_argument(mut self, argument: StepArgument<C>) -> Self {
        self.arguments.push(argument);
        self
    }

    /// Name template.
    #[must_use]
    pub fn template(&self) -> &str { &self.template }

    /// Step type keyword, if any.
    #[must_use]
    pub fn step_type(&self) -> Option<&str> { self.step_type.as_deref() }

    /// Declared arguments.
    #[must_use]
    pub fn arguments(&self) -> &[StepArgument<C>] { &self.arguments }

    pub(crate) fn into_parts(
        self,
    ) -> (String, Option<String>, Vec<StepArgument<C>>, StepInvocation<C>) {
        (self.template, self.step_type, self.arguments, self.invocation)
    }
}

impl<C> fmt::Debug for StepDescriptor<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepDescriptor")
            .field("template", &self.template)
            .field("step_type", &self.step_type)
            .field("arguments", &self.arguments)
            .finish_non_exhaustive()
    }
}
