//! Step declarations and their execution.
//!
//! A [`StepDescriptor`] declares a step: its name template, arguments and
//! body. The runner binds descriptors into [`RunnableStep`]s grouped in a
//! [`StepSequence`]. Running a step evaluates its arguments, invokes the body
//! through the middleware pipeline inside a fresh
//! [`TaskScope`](crate::scope::TaskScope), runs any sub-steps the body
//! generated and resolves the final [`StepResult`](crate::StepResult).

mod descriptor;
mod runnable;
mod sequence;

#[cfg(test)]
mod tests;

pub use descriptor::{StepCall, StepDescriptor, StepFuture, StepInvocation, StepResultDescriptor};
pub use runnable::{RunnableStep, StepState};
pub use sequence::StepSequence;
