//! Conversion of captured panics into step failures.
//!
//! Step bodies, tracked tasks, deferred argument sources and value formatters
//! all run under `catch_unwind`. The payload they leave behind is reduced to
//! its message and recorded like any other step failure.

use std::any::Any;

use crate::{error::StepError, metrics};

/// Extract the message carried by a panic payload.
///
/// `panic!` payloads are either a `&'static str` or a formatted `String`;
/// anything else is reported as opaque.
///
/// ```
/// use stepwise::panic::panic_message;
///
/// assert_eq!(panic_message(&"boom"), "boom");
/// assert_eq!(panic_message(&String::from("boom")), "boom");
/// assert_eq!(panic_message(&5_u32), "non-string panic payload");
/// ```
#[must_use]
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&'static str>()
        .map(|message| (*message).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_owned())
}

/// Record a captured panic and turn it into [`StepError::Panicked`].
pub(crate) fn panicked(payload: &(dyn Any + Send)) -> StepError {
    metrics::inc_step_panics();
    StepError::Panicked {
        message: panic_message(payload),
    }
}
