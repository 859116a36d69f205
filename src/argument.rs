//! Step arguments and their lazy evaluation.
//!
//! A [`StepArgument`] holds either a constant or a deferred source evaluated
//! against the scenario context immediately before the step body runs. The
//! evaluated value is handed to the body through [`StepArgs`] and formatted
//! into the step name.

use std::{
    any::Any,
    fmt,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::Arc,
};

use crate::{
    error::{BoxError, StepError},
    name::NameParameter,
    panic::panicked,
};

/// Type-erased argument value shared between the step and its body.
pub type ArgValue = Arc<dyn Any + Send + Sync>;

type DeferredSource<C> = Box<dyn Fn(&C) -> Result<ArgValue, BoxError> + Send + Sync>;
type ValueFormatter = Arc<dyn Fn(&(dyn Any + Send + Sync)) -> Result<String, BoxError> + Send + Sync>;

enum ArgumentSource<C> {
    Constant(ArgValue),
    Deferred(DeferredSource<C>),
}

/// Evaluation state of a [`StepArgument`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EvaluationState {
    /// The source has not been evaluated yet.
    Unevaluated,
    /// The value is available.
    Evaluated,
    /// The source raised while being evaluated.
    Failed,
}

/// One parameter slot of a step.
pub struct StepArgument<C> {
    raw_name: String,
    source: ArgumentSource<C>,
    formatter: ValueFormatter,
    value: Option<ArgValue>,
    state: EvaluationState,
}

impl<C> StepArgument<C> {
    /// Argument with a value known when the step is declared.
    pub fn constant<T>(name: impl Into<String>, value: T) -> Self
    where
        T: fmt::Display + Send + Sync + 'static,
    {
        Self {
            raw_name: name.into(),
            source: ArgumentSource::Constant(Arc::new(value)),
            formatter: display_formatter::<T>(),
            value: None,
            state: EvaluationState::Unevaluated,
        }
    }

    /// Argument computed from the scenario context when the step starts.
    pub fn deferred<T, E, F>(name: impl Into<String>, source: F) -> Self
    where
        T: fmt::Display + Send + Sync + 'static,
        E: Into<BoxError>,
        F: Fn(&C) -> Result<T, E> + Send + Sync + 'static,
    {
        let source: DeferredSource<C> = Box::new(move |context: &C| {
            source(context)
                .map(|value| Arc::new(value) as ArgValue)
                .map_err(Into::into)
        });
        Self {
            raw_name: name.into(),
            source: ArgumentSource::Deferred(source),
            formatter: display_formatter::<T>(),
            value: None,
            state: EvaluationState::Unevaluated,
        }
    }

    /// Replace the display formatter used for the step name.
    ///
    /// The formatter receives the evaluated value; it must be declared for the
    /// same type the argument was created with.
    #[must_use]
    pub fn with_formatter<T, E, F>(mut self, formatter: F) -> Self
    where
        T: Send + Sync + 'static,
        E: Into<BoxError>,
        F: Fn(&T) -> Result<String, E> + Send + Sync + 'static,
    {
        self.formatter = Arc::new(move |value: &(dyn Any + Send + Sync)| {
            let typed = value
                .downcast_ref::<T>()
                .ok_or_else(|| BoxError::from("formatter declared for a different value type"))?;
            formatter(typed).map_err(Into::into)
        });
        self
    }

    /// Name under which the argument was declared.
    #[must_use]
    pub fn raw_name(&self) -> &str { &self.raw_name }

    /// Current evaluation state.
    #[must_use]
    pub fn state(&self) -> EvaluationState { self.state }

    /// Evaluated value, if evaluation succeeded.
    #[must_use]
    pub fn value(&self) -> Option<&ArgValue> { self.value.as_ref() }

    /// Resolve the argument value against `context`.
    ///
    /// An already evaluated argument is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`StepError::ParameterEvaluation`] naming the parameter and
    /// `step` when a deferred source raises or panics.
    pub fn evaluate(&mut self, context: &C, step: &impl fmt::Display) -> Result<(), StepError> {
        if self.state == EvaluationState::Evaluated {
            return Ok(());
        }
        let outcome = match &self.source {
            ArgumentSource::Constant(value) => Ok(Arc::clone(value)),
            ArgumentSource::Deferred(source) => guarded(|| source(context)),
        };
        match outcome {
            Ok(value) => {
                self.value = Some(value);
                self.state = EvaluationState::Evaluated;
                Ok(())
            }
            Err(source) => {
                self.state = EvaluationState::Failed;
                Err(StepError::ParameterEvaluation {
                    parameter: self.raw_name.clone(),
                    step: step.to_string(),
                    source: Arc::from(source),
                })
            }
        }
    }

    /// Produce the display token for the step name.
    ///
    /// # Errors
    ///
    /// Returns [`StepError::ParameterFormat`] naming the parameter and `step`
    /// when the formatter fails or panics.
    pub fn format_name_parameter(
        &self,
        step: &impl fmt::Display,
    ) -> Result<NameParameter, StepError> {
        let Some(value) = &self.value else {
            return Ok(NameParameter::unknown());
        };
        guarded(|| (self.formatter)(value.as_ref()))
            .map(NameParameter::evaluated)
            .map_err(|source| StepError::ParameterFormat {
                parameter: self.raw_name.clone(),
                step: step.to_string(),
                source: Arc::from(source),
            })
    }
}

impl<C> fmt::Debug for StepArgument<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepArgument")
            .field("raw_name", &self.raw_name)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Run user code, turning a panic into an ordinary error.
fn guarded<T>(f: impl FnOnce() -> Result<T, BoxError>) -> Result<T, BoxError> {
    catch_unwind(AssertUnwindSafe(f))
        .unwrap_or_else(|payload| Err(BoxError::from(panicked(payload.as_ref()))))
}

fn display_formatter<T: fmt::Display + 'static>() -> ValueFormatter {
    Arc::new(|value: &(dyn Any + Send + Sync)| {
        value
            .downcast_ref::<T>()
            .map(ToString::to_string)
            .ok_or_else(|| BoxError::from("argument value has an unexpected type"))
    })
}

/// Evaluated argument values passed to a step body, in declaration order.
#[derive(Clone, Default)]
pub struct StepArgs {
    values: Vec<ArgValue>,
}

impl StepArgs {
    /// Wrap evaluated values.
    #[must_use]
    pub fn new(values: Vec<ArgValue>) -> Self { Self { values } }

    /// Number of arguments.
    #[must_use]
    pub fn len(&self) -> usize { self.values.len() }

    /// Returns `true` if the step declares no arguments.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.values.is_empty() }

    /// Borrow argument `index` as `T`.
    ///
    /// # Errors
    ///
    /// Returns [`StepError::InvalidArgument`] if the index is out of range or
    /// the value has another type.
    pub fn get<T: Any>(&self, index: usize) -> Result<&T, StepError> {
        let value = self.values.get(index).ok_or_else(|| StepError::InvalidArgument {
            index,
            reason: format!("only {} argument(s) declared", self.values.len()),
        })?;
        value
            .downcast_ref::<T>()
            .ok_or_else(|| StepError::InvalidArgument {
                index,
                reason: format!("value is not a {}", std::any::type_name::<T>()),
            })
    }

    /// Raw value of argument `index`.
    #[must_use]
    pub fn raw(&self, index: usize) -> Option<&ArgValue> { self.values.get(index) }
}

impl fmt::Debug for StepArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepArgs").field("len", &self.values.len()).finish()
    }
}
