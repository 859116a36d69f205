//! Extension pipeline wrapping every timed step invocation.
//!
//! Middleware registered on a [`ScenarioRunner`](crate::ScenarioRunner) sees
//! each step before and after its body runs. The invocation is handed over as
//! a [`Next`] continuation, which is consumed by [`Next::run`]: a middleware
//! can therefore invoke the step at most once and gets its outcome back
//! unchanged.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::{error::StepError, result::StepInfo};

/// Cross-cutting instrumentation around step invocations.
///
/// ```
/// use async_trait::async_trait;
/// use stepwise::{StepError, StepInfo, middleware::{Next, StepMiddleware}};
///
/// struct Audit;
///
/// #[async_trait]
/// impl StepMiddleware for Audit {
///     async fn execute(&self, step: &StepInfo, next: Next<'_>) -> Result<(), StepError> {
///         tracing::info!(step = %step, "before");
///         let outcome = next.run().await;
///         tracing::info!(step = %step, ok = outcome.is_ok(), "after");
///         outcome
///     }
/// }
/// ```
#[async_trait]
pub trait StepMiddleware: Send + Sync {
    /// Run `next` for `step`, optionally surrounding it with extra work.
    ///
    /// Implementations must call [`Next::run`] exactly once and return its
    /// result unchanged.
    async fn execute(&self, step: &StepInfo, next: Next<'_>) -> Result<(), StepError>;
}

/// Continuation used by middleware to call the rest of the chain.
pub struct Next<'a> {
    chain: &'a [Arc<dyn StepMiddleware>],
    step: &'a StepInfo,
    invocation: BoxFuture<'a, Result<(), StepError>>,
}

impl<'a> Next<'a> {
    fn new(
        chain: &'a [Arc<dyn StepMiddleware>],
        step: &'a StepInfo,
        invocation: BoxFuture<'a, Result<(), StepError>>,
    ) -> Self {
        Self {
            chain,
            step,
            invocation,
        }
    }

    /// Run the remaining middleware and finally the step invocation.
    ///
    /// # Errors
    ///
    /// Propagates the error of the step invocation or of a middleware further
    /// down the chain.
    pub async fn run(self) -> Result<(), StepError> {
        match self.chain.split_first() {
            Some((first, rest)) => {
                first
                    .execute(self.step, Next::new(rest, self.step, self.invocation))
                    .await
            }
            None => self.invocation.await,
        }
    }
}

/// Ordered middleware chain applied to every step of a scenario.
#[derive(Clone, Default)]
pub struct StepPipeline {
    middleware: Vec<Arc<dyn StepMiddleware>>,
}

impl StepPipeline {
    /// Create an empty pipeline.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Append `middleware`; earlier registrations run outermost.
    pub fn push(&mut self, middleware: Arc<dyn StepMiddleware>) { self.middleware.push(middleware); }

    /// Number of registered middleware.
    #[must_use]
    pub fn len(&self) -> usize { self.middleware.len() }

    /// Returns `true` when no middleware is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.middleware.is_empty() }

    /// Execute `invocation` for `step` through the whole chain.
    ///
    /// # Errors
    ///
    /// Returns whatever error the chain produces.
    pub async fn execute_step<'a>(
        &'a self,
        step: &'a StepInfo,
        invocation: BoxFuture<'a, Result<(), StepError>>,
    ) -> Result<(), StepError> {
        Next::new(&self.middleware, step, invocation).run().await
    }
}
