//! Resilient action dispatch
//!
//! Tries alternative ways of producing the same UI effect in priority order
//! (a semantic `check`, then a forced click, ...). The first attempt that
//! completes wins. Failures of earlier attempts are discarded; only when every
//! attempt fails does the caller see an error, carrying the last one.
//!
//! There is no rollback: a failed attempt may have left partial effects.

use std::fmt;
use std::future::Future;

use futures::future::{BoxFuture, FutureExt};
use tracing::debug;

use crate::driver::{Driver, DriverError, UiAction};
use crate::error::{Error, Result};
use crate::locator::Descriptor;

/// Future returned by one attempt.
pub type ActionFuture<'a> = BoxFuture<'a, std::result::Result<(), DriverError>>;

type ActionFn<'a> = Box<dyn FnOnce() -> ActionFuture<'a> + Send + 'a>;

/// One strategy for achieving a logical action.
pub struct ActionAttempt<'a> {
    label: String,
    run: ActionFn<'a>,
}

impl<'a> ActionAttempt<'a> {
    pub fn new<F, Fut>(label: impl Into<String>, run: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'a,
        Fut: Future<Output = std::result::Result<(), DriverError>> + Send + 'a,
    {
        Self {
            label: label.into(),
            run: Box::new(move || run().boxed()),
        }
    }

    /// Perform `action` on `target` through `driver`.
    pub fn perform<D>(driver: &'a D, target: Descriptor, action: UiAction) -> Self
    where
        D: Driver + ?Sized,
    {
        let label = format!("{} {}", action, target);
        Self::new(label, move || async move { driver.perform(&target, &action).await })
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl fmt::Debug for ActionAttempt<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionAttempt")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// Run `attempts` in order until one succeeds; returns the winning index.
pub async fn attempt_with_fallback(attempts: Vec<ActionAttempt<'_>>) -> Result<usize> {
    if attempts.is_empty() {
        return Err(Error::NoAttempts);
    }

    let total = attempts.len();
    let mut last_error = None;

    for (index, attempt) in attempts.into_iter().enumerate() {
        let ActionAttempt { label, run } = attempt;
        match run().await {
            Ok(()) => {
                if index > 0 {
                    debug!(attempt = %label, index, "fallback attempt succeeded");
                }
                return Ok(index);
            }
            Err(err) => {
                debug!(attempt = %label, index, error = %err, "attempt failed");
                last_error = Some(err);
            }
        }
    }

    Err(Error::AllAttemptsFailed {
        attempts: total,
        last: last_error.unwrap_or(DriverError::Closed),
    })
}
