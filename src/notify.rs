//! Progress notification ports.
//!
//! The engine reports step start, finish and comments to a
//! [`ProgressNotifier`]. Notifiers are fire-and-forget: they must not panic
//! and should return quickly, as they are called inline with step
//! execution.

use std::sync::Arc;

use tracing::info;

use crate::result::{StepInfo, StepResult};

/// Receives step progress notifications.
pub trait ProgressNotifier: Send + Sync {
    /// A step is about to invoke its body.
    fn notify_step_start(&self, info: &StepInfo);

    /// A step has finished; `result` is final.
    fn notify_step_finished(&self, result: &StepResult);

    /// A step body recorded a comment.
    fn notify_step_comment(&self, info: &StepInfo, comment: &str);
}

/// Notifier that discards every notification.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProgressNotifier;

impl ProgressNotifier for NoProgressNotifier {
    fn notify_step_start(&self, _info: &StepInfo) {}

    fn notify_step_finished(&self, _result: &StepResult) {}

    fn notify_step_comment(&self, _info: &StepInfo, _comment: &str) {}
}

/// Forwards every notification to several notifiers, in registration order.
#[derive(Clone, Default)]
pub struct DelegatingProgressNotifier {
    notifiers: Vec<Arc<dyn ProgressNotifier>>,
}

impl DelegatingProgressNotifier {
    /// Delegate to `notifiers`.
    #[must_use]
    pub fn new(notifiers: Vec<Arc<dyn ProgressNotifier>>) -> Self { Self { notifiers } }

    /// Append another notifier.
    #[must_use]
    pub fn with(mut self, notifier: Arc<dyn ProgressNotifier>) -> Self {
        self.notifiers.push(notifier);
        self
    }
}

impl ProgressNotifier for DelegatingProgressNotifier {
    fn notify_step_start(&self, info: &StepInfo) {
        for notifier in &self.notifiers {
            notifier.notify_step_start(info);
        }
    }

    fn notify_step_finished(&self, result: &StepResult) {
        for notifier in &self.notifiers {
            notifier.notify_step_finished(result);
        }
    }

    fn notify_step_comment(&self, info: &StepInfo, comment: &str) {
        for notifier in &self.notifiers {
            notifier.notify_step_comment(info, comment);
        }
    }
}

/// Reports progress through `tracing` events at `INFO` level.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingProgressNotifier;

impl ProgressNotifier for TracingProgressNotifier {
    fn notify_step_start(&self, info: &StepInfo) { info!(step = %info, "step started"); }

    fn notify_step_finished(&self, result: &StepResult) {
        info!(
            step = %result.info(),
            status = %result.status(),
            details = result.status_details().unwrap_or_default(),
            elapsed_ms = result.execution_time().map_or(0, |time| {
                u64::try_from(time.duration().as_millis()).unwrap_or(u64::MAX)
            }),
            "step finished"
        );
    }

    fn notify_step_comment(&self, info: &StepInfo, comment: &str) {
        info!(step = %info, comment, "step comment");
    }
}
