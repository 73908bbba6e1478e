//! State probes
//!
//! A probe is a named, read-only check of the current UI state. It is
//! re-evaluated from scratch on every poll, so it never caches a previous
//! answer.

use std::fmt;
use std::future::Future;

use futures::future::{BoxFuture, FutureExt};

use crate::driver::{Driver, DriverError};
use crate::locator::{Descriptor, TextMatch};

/// Future returned by a single probe evaluation.
pub type ProbeFuture<'a> = BoxFuture<'a, Result<bool, DriverError>>;

type ProbeFn<'a> = Box<dyn Fn() -> ProbeFuture<'a> + Send + Sync + 'a>;

/// A named asynchronous predicate over UI state.
pub struct StateProbe<'a> {
    name: String,
    check: ProbeFn<'a>,
}

impl<'a> StateProbe<'a> {
    /// Wrap an arbitrary async predicate.
    pub fn new<F, Fut>(name: impl Into<String>, check: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'a,
        Fut: Future<Output = Result<bool, DriverError>> + Send + 'a,
    {
        Self {
            name: name.into(),
            check: Box::new(move || check().boxed()),
        }
    }

    /// True while an element matching `target` is visible.
    pub fn visible<D>(driver: &'a D, target: Descriptor) -> Self
    where
        D: Driver + ?Sized,
    {
        Self::new(format!("visible {}", target), move || {
            let target = target.clone();
            async move { Ok(driver.is_visible(&target).await) }
        })
    }

    /// True while no element matching `target` is visible.
    pub fn hidden<D>(driver: &'a D, target: Descriptor) -> Self
    where
        D: Driver + ?Sized,
    {
        Self::new(format!("hidden {}", target), move || {
            let target = target.clone();
            async move { Ok(!driver.is_visible(&target).await) }
        })
    }

    /// True once the session URL matches `pattern`.
    pub fn url_matches<D>(driver: &'a D, pattern: TextMatch) -> Self
    where
        D: Driver + ?Sized,
    {
        Self::new(format!("url {}", pattern), move || {
            let pattern = pattern.clone();
            async move {
                let url = driver.current_url().await?;
                Ok(pattern.is_match(&url))
            }
        })
    }

    /// True once the text of `target` matches `expected`.
    pub fn text_matches<D>(driver: &'a D, target: Descriptor, expected: TextMatch) -> Self
    where
        D: Driver + ?Sized,
    {
        Self::new(format!("text of {} {}", target, expected), move || {
            let target = target.clone();
            let expected = expected.clone();
            async move {
                let text = driver.read_text(&target).await?;
                Ok(expected.is_match(text.trim()))
            }
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the check once.
    pub fn evaluate(&self) -> ProbeFuture<'a> {
        (self.check)()
    }
}

impl fmt::Debug for StateProbe<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateProbe")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
