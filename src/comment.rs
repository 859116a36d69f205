//! Comment channel available to running step bodies.

use std::sync::{Arc, Mutex, PoisonError};

use log::warn;

use crate::{notify::ProgressNotifier, result::StepInfo};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum Phase {
    #[default]
    Pending,
    Open,
    Closed,
}

#[derive(Debug, Default)]
struct CommentLog {
    entries: Vec<String>,
    phase: Phase,
}

/// Records comments for one step and forwards them to the progress notifier.
///
/// The handle is cheap to clone and may be used from tasks the step body
/// spawns. Entries keep the order in which they were appended. The channel
/// only accepts comments between the step's start and finish notifications;
/// anything outside that window is dropped with a warning.
#[derive(Clone)]
pub struct StepComments {
    info: Arc<StepInfo>,
    notifier: Arc<dyn ProgressNotifier>,
    log: Arc<Mutex<CommentLog>>,
}

impl StepComments {
    pub(crate) fn new(info: StepInfo, notifier: Arc<dyn ProgressNotifier>) -> Self {
        Self {
            info: Arc::new(info),
            notifier,
            log: Arc::default(),
        }
    }

    /// Append `comment` to the step and notify progress.
    pub fn comment(&self, comment: impl Into<String>) {
        let comment = comment.into();
        {
            let mut log = self.log.lock().unwrap_or_else(PoisonError::into_inner);
            match log.phase {
                Phase::Pending => {
                    warn!(
                        "comment on step that has not started ignored: step={}, comment={comment}",
                        self.info
                    );
                    return;
                }
                Phase::Closed => {
                    warn!(
                        "comment on finished step ignored: step={}, comment={comment}",
                        self.info
                    );
                    return;
                }
                Phase::Open => log.entries.push(comment.clone()),
            }
        }
        self.notifier.notify_step_comment(&self.info, &comment);
    }

    /// Refresh the step identity used for notifications.
    pub(crate) fn set_info(&mut self, info: StepInfo) { self.info = Arc::new(info); }

    /// Start accepting comments once start has been notified.
    pub(crate) fn open(&self) {
        let mut log = self.log.lock().unwrap_or_else(PoisonError::into_inner);
        if log.phase == Phase::Pending {
            log.phase = Phase::Open;
        }
    }

    /// Close the channel and take the recorded comments.
    pub(crate) fn close(&self) -> Vec<String> {
        let mut log = self.log.lock().unwrap_or_else(PoisonError::into_inner);
        log.phase = Phase::Closed;
        std::mem::take(&mut log.entries)
    }
}

impl std::fmt::Debug for StepComments {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepComments")
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}
