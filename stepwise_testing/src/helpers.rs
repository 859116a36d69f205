//! Constructors for frequently used step shapes.

use std::time::Duration;

use stepwise::{BoxError, StepDescriptor, StepError};

/// Step whose body succeeds immediately.
pub fn passing_step<C: Send + Sync + 'static>(name: &str) -> StepDescriptor<C> {
    StepDescriptor::from_fn(name, |_| Ok::<_, BoxError>(()))
}

/// Step whose body fails with `message`.
pub fn failing_step<C: Send + Sync + 'static>(name: &str, message: &'static str) -> StepDescriptor<C> {
    StepDescriptor::from_fn(name, move |_| Err::<(), _>(message))
}

/// Step whose body raises the bypass signal with `reason`.
pub fn bypassed_step<C: Send + Sync + 'static>(name: &str, reason: &'static str) -> StepDescriptor<C> {
    StepDescriptor::from_fn(name, move |_| Err::<(), _>(StepError::bypass(reason)))
}

/// Step whose body sleeps for `delay` before succeeding.
pub fn sleeping_step<C: Send + Sync + 'static>(name: &str, delay: Duration) -> StepDescriptor<C> {
    StepDescriptor::from_async(name, move |_| async move {
        tokio::time::sleep(delay).await;
        Ok::<_, BoxError>(())
    })
}

/// Step whose body generates the sub-steps built by `children`.
pub fn composite_step<C, F>(name: &str, children: F) -> StepDescriptor<C>
where
    C: Send + Sync + 'static,
    F: Fn() -> Vec<StepDescriptor<C>> + Send + Sync + 'static,
{
    StepDescriptor::from_fn(name, move |_| Ok::<_, BoxError>(children()))
}
