//! Execution timing for steps.
//!
//! [`ExecutionTimeWatch`] is started immediately before a step body runs and
//! stopped on every exit path, yielding an immutable [`ExecutionTime`].

use std::time::{Duration, SystemTime};

use tokio::time::Instant;

/// Wall-clock start and monotonic duration of one step execution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExecutionTime {
    start: SystemTime,
    duration: Duration,
}

impl ExecutionTime {
    /// Create a new execution time record.
    #[must_use]
    pub const fn new(start: SystemTime, duration: Duration) -> Self { Self { start, duration } }

    /// Wall-clock time at which the step started.
    #[must_use]
    pub const fn start(&self) -> SystemTime { self.start }

    /// Elapsed time between start and stop.
    #[must_use]
    pub const fn duration(&self) -> Duration { self.duration }

    /// Wall-clock time at which the step finished.
    #[must_use]
    pub fn end(&self) -> SystemTime { self.start + self.duration }
}

/// Monotonic stopwatch used to time step invocations.
///
/// Durations come from [`tokio::time::Instant`], so tests running on a paused
/// runtime observe exact, deterministic elapsed times.
#[derive(Debug)]
pub struct ExecutionTimeWatch {
    start: SystemTime,
    started_at: Instant,
}

impl ExecutionTimeWatch {
    /// Start a new watch.
    #[must_use]
    pub fn start_new() -> Self {
        Self {
            start: SystemTime::now(),
            started_at: Instant::now(),
        }
    }

    /// Read the time elapsed since the watch started.
    #[must_use]
    pub fn time(&self) -> ExecutionTime { ExecutionTime::new(self.start, self.started_at.elapsed()) }
}
