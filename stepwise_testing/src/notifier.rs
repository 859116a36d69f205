//! Progress notifier recording every notification for later assertions.

use std::sync::{Mutex, PoisonError};

use stepwise::{ExecutionStatus, ProgressNotifier, StepInfo, StepResult};

/// One captured notification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Start of the step with the given display identity.
    Started(String),
    /// Finish of the step with its final status and details.
    Finished {
        step: String,
        status: ExecutionStatus,
        details: Option<String>,
    },
    /// Comment recorded on the step.
    Comment { step: String, comment: String },
}

impl ProgressEvent {
    /// Display identity of the step the event belongs to.
    pub fn step(&self) -> &str {
        match self {
            Self::Started(step) | Self::Finished { step, .. } | Self::Comment { step, .. } => step,
        }
    }
}

/// Records notifications in the order they were received.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingNotifier {
    fn push(&self, event: ProgressEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }

    /// Snapshot of every recorded event.
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Display identities of started steps, in order.
    pub fn started(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ProgressEvent::Started(step) => Some(step),
                _ => None,
            })
            .collect()
    }

    /// `(step, status)` pairs of finished steps, in order.
    pub fn finished(&self) -> Vec<(String, ExecutionStatus)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ProgressEvent::Finished { step, status, .. } => Some((step, status)),
                _ => None,
            })
            .collect()
    }

    /// Comments recorded for `step`, in order.
    pub fn comments_for(&self, step: &str) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ProgressEvent::Comment { step: owner, comment } if owner == step => Some(comment),
                _ => None,
            })
            .collect()
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl ProgressNotifier for RecordingNotifier {
    fn notify_step_start(&self, info: &StepInfo) { self.push(ProgressEvent::Started(info.to_string())); }

    fn notify_step_finished(&self, result: &StepResult) {
        self.push(ProgressEvent::Finished {
            step: result.info().to_string(),
            status: result.status(),
            details: result.status_details().map(str::to_owned),
        });
    }

    fn notify_step_comment(&self, info: &StepInfo, comment: &str) {
        self.push(ProgressEvent::Comment {
            step: info.to_string(),
            comment: comment.to_owned(),
        });
    }
}
