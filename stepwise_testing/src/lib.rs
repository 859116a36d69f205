//! Utilities for exercising `stepwise` scenarios in tests.
//!
//! [`RecordingNotifier`] captures progress notifications in order, the
//! [`helpers`] build common step shapes, and [`logger`] serialises access to
//! the global `log` capture.
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use stepwise::ScenarioRunner;
//! use stepwise_testing::{RecordingNotifier, helpers::passing_step};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let notifier = Arc::new(RecordingNotifier::default());
//! let runner = ScenarioRunner::new(()).with_notifier(notifier.clone());
//! let mut steps = runner.steps(vec![passing_step("a step")]);
//! steps.run().await.unwrap();
//! assert_eq!(notifier.events().len(), 2);
//! # }
//! ```

pub mod helpers;
pub mod logging;
pub mod notifier;

pub use helpers::{bypassed_step, composite_step, failing_step, passing_step, sleeping_step};
pub use logging::{LoggerHandle, logger};
pub use notifier::{ProgressEvent, RecordingNotifier};
