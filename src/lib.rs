#![doc(html_root_url = "https://docs.rs/stepwise/latest")]
//! Public API for the `stepwise` library.
//!
//! This crate executes behaviour-driven scenario steps: it evaluates step
//! parameters, renders readable step names, invokes step bodies through an
//! extensible middleware pipeline, waits for the background work they start,
//! runs the sub-steps they generate and aggregates the outcome into a
//! [`StepResult`] tree reported through a [`ProgressNotifier`].

pub mod argument;
pub mod comment;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod name;
pub mod notify;
pub mod panic;
pub mod prelude;
pub mod result;
pub mod runner;
pub mod scope;
pub mod status;
pub mod step;
pub mod time;

pub use argument::{ArgValue, EvaluationState, StepArgs, StepArgument};
pub use comment::StepComments;
pub use error::{BoxError, Result, SharedError, StepError};
pub use middleware::{Next, StepMiddleware, StepPipeline};
pub use name::{NameParameter, StepNameFormat, UNKNOWN_VALUE};
pub use notify::{
    DelegatingProgressNotifier,
    NoProgressNotifier,
    ProgressNotifier,
    TracingProgressNotifier,
};
pub use result::{StepInfo, StepResult};
pub use runner::ScenarioRunner;
pub use scope::TaskScope;
pub use status::{ExecutionStatus, StatusMapper};
pub use step::{
    RunnableStep,
    StepCall,
    StepDescriptor,
    StepResultDescriptor,
    StepSequence,
    StepState,
};
pub use time::{ExecutionTime, ExecutionTimeWatch};
