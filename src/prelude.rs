//! Optional convenience imports for writing steps.
//!
//! This module is intentionally small and focused on the types a step
//! definition touches. Prefer importing specialised APIs directly from their
//! owning modules.
//!
//! # Examples
//!
//! ```rust
//! use stepwise::prelude::*;
//!
//! fn given_a_number() -> StepDescriptor<()> {
//!     StepDescriptor::from_fn("a number N", |call: StepCall<()>| {
//!         let n: &u32 = call.args().get(0)?;
//!         call.comment(format!("got {n}"));
//!         Ok::<_, BoxError>(())
//!     })
//!     .with_type("Given")
//!     .with_argument(StepArgument::constant("n", 7_u32))
//! }
//! # let _ = given_a_number();
//! ```

pub use crate::{
    argument::StepArgument,
    error::{BoxError, StepError},
    notify::ProgressNotifier,
    result::{StepInfo, StepResult},
    runner::ScenarioRunner,
    status::ExecutionStatus,
    step::{StepCall, StepDescriptor, StepResultDescriptor},
};
