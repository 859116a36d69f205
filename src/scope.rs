//! Join boundary for background work started by a step body.
//!
//! A fresh [`TaskScope`] is installed around every step body. Work the body
//! spawns through it is tracked by a [`TaskTracker`], and the step is not
//! considered complete until all of it has settled. A tracked task that
//! fails or panics fails the step once everything has finished.
//!
//! The lifecycle is strictly ordered: [`ScopeGuard::install`] creates the
//! scope, [`ScopeGuard::restore`] closes it exactly once (dropping the guard
//! closes it too), and [`PendingTasks::wait`] joins the tracked work.

use std::{
    future::Future,
    panic::AssertUnwindSafe,
    sync::{
        Arc,
        Mutex,
        PoisonError,
        atomic::{AtomicBool, Ordering},
    },
};

use futures::FutureExt;
use log::warn;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;

use crate::{
    error::{BoxError, StepError},
    panic::panicked,
};

#[derive(Debug, Default)]
struct ScopeState {
    tracker: TaskTracker,
    faults: Mutex<Vec<StepError>>,
    settled: AtomicBool,
}

impl ScopeState {
    fn record(&self, fault: StepError) {
        self.faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(fault);
    }
}

/// Handle used by step bodies to start tracked background work.
#[derive(Clone, Debug, Default)]
pub struct TaskScope {
    state: Arc<ScopeState>,
}

impl TaskScope {
    /// Spawn `task` on the runtime and track it until the step completes.
    ///
    /// The returned handle may be awaited, but does not have to be: the
    /// step waits for every tracked task before it finishes. An error or
    /// panic from `task` fails the step.
    pub fn spawn<F, E>(&self, task: F) -> JoinHandle<()>
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        if self.state.settled.load(Ordering::Acquire) {
            warn!("task spawned after its step scope settled; its outcome is ignored");
        }
        let state = Arc::clone(&self.state);
        self.state.tracker.spawn(async move {
            match AssertUnwindSafe(task).catch_unwind().await {
                Ok(Ok(())) => {}
                Ok(Err(error)) => state.record(StepError::from_boxed(error.into())),
                Err(payload) => state.record(panicked(payload.as_ref())),
            }
        })
    }

    /// Number of tracked tasks still running.
    #[must_use]
    pub fn pending(&self) -> usize { self.state.tracker.len() }
}

/// Installed scope for one step body invocation.
#[derive(Debug)]
pub struct ScopeGuard {
    scope: TaskScope,
}

impl ScopeGuard {
    /// Install a fresh scope.
    #[must_use]
    pub fn install() -> Self {
        Self {
            scope: TaskScope::default(),
        }
    }

    /// Spawning handle passed to the step body.
    #[must_use]
    pub fn scope(&self) -> TaskScope { self.scope.clone() }

    /// Close the scope; tracked tasks keep running until joined.
    #[must_use]
    pub fn restore(self) -> PendingTasks {
        self.scope.state.tracker.close();
        PendingTasks {
            scope: self.scope.clone(),
        }
    }
}

impl Drop for ScopeGuard {
    fn drop(&mut self) { self.scope.state.tracker.close(); }
}

/// Tracked work of a closed scope.
#[derive(Debug)]
#[must_use = "tracked tasks are only joined when waited for"]
pub struct PendingTasks {
    scope: TaskScope,
}

impl PendingTasks {
    /// Wait until every tracked task has finished.
    ///
    /// # Errors
    ///
    /// Returns the first recorded task failure once all tasks have settled.
    pub async fn wait(self) -> Result<(), StepError> {
        let state = &self.scope.state;
        state.tracker.wait().await;
        state.settled.store(true, Ordering::Release);
        let mut faults = state.faults.lock().unwrap_or_else(PoisonError::into_inner);
        if faults.is_empty() {
            return Ok(());
        }
        let first = faults.remove(0);
        for extra in faults.drain(..) {
            warn!("additional background task failure: {extra}");
        }
        Err(first)
    }
}
