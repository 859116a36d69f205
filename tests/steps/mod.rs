//! Step definitions for behavioural tests.

mod execution_steps;
