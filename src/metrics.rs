//! Metric helpers for `stepwise`.
//!
//! This module defines metric names and simple helper functions wrapping the
//! [`metrics`](https://docs.rs/metrics) crate. Without the `metrics` feature
//! the helpers compile to no-ops. No exporter is installed by the library.

use crate::status::ExecutionStatus;

/// Name of the counter tracking finished steps, labelled by status.
pub const STEPS_FINISHED: &str = "stepwise_steps_finished_total";
/// Name of the counter tracking panics captured from steps and their tasks.
pub const STEP_PANICS: &str = "stepwise_step_panics_total";

/// Record a finished step with its final status.
#[cfg(feature = "metrics")]
pub fn inc_steps_finished(status: ExecutionStatus) {
    metrics::counter!(STEPS_FINISHED, "status" => status.as_str()).increment(1);
}

/// Record a finished step with its final status.
#[cfg(not(feature = "metrics"))]
pub fn inc_steps_finished(_status: ExecutionStatus) {}

/// Record a panic captured from a step body or tracked task.
#[cfg(feature = "metrics")]
pub fn inc_step_panics() { metrics::counter!(STEP_PANICS).increment(1); }

/// Record a panic captured from a step body or tracked task.
#[cfg(not(feature = "metrics"))]
pub fn inc_step_panics() {}
