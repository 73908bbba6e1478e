//! Browser driver boundary
//!
//! The synchronization primitives never talk to a browser directly. They go
//! through [`Driver`], which any automation backend (the Playwright bridge in
//! `pagesync-e2e`, or an in-memory fake in tests) implements.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::Error;
use crate::locator::{Descriptor, TextMatch};
use crate::probe::StateProbe;
use crate::wait::{wait_until, WaitOptions};

/// Errors raised by a driver operation.
#[derive(Error, Debug)]
pub enum DriverError {
    #[error("No element matches {0}")]
    NotFound(String),

    #[error("{action} on {target} failed: {reason}")]
    ActionFailed {
        action: String,
        target: String,
        reason: String,
    },

    #[error("Bridge error: {0}")]
    Bridge(String),

    #[error("Driver session is closed")]
    Closed,

    #[error("Driver operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A UI interaction performed against a resolved element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UiAction {
    Click {
        #[serde(default)]
        force: bool,
    },
    Fill {
        text: String,
    },
    Check {
        #[serde(default)]
        force: bool,
    },
    Uncheck {
        #[serde(default)]
        force: bool,
    },
    SelectOption {
        value: String,
    },
    ScrollIntoView,
}

impl UiAction {
    pub fn click() -> Self {
        UiAction::Click { force: false }
    }

    pub fn force_click() -> Self {
        UiAction::Click { force: true }
    }

    pub fn fill(text: impl Into<String>) -> Self {
        UiAction::Fill { text: text.into() }
    }

    pub fn name(&self) -> &'static str {
        match self {
            UiAction::Click { .. } => "click",
            UiAction::Fill { .. } => "fill",
            UiAction::Check { .. } => "check",
            UiAction::Uncheck { .. } => "uncheck",
            UiAction::SelectOption { .. } => "select_option",
            UiAction::ScrollIntoView => "scroll_into_view",
        }
    }
}

impl fmt::Display for UiAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UiAction::Click { force: true }
            | UiAction::Check { force: true }
            | UiAction::Uncheck { force: true } => write!(f, "{}(force)", self.name()),
            UiAction::SelectOption { value } => write!(f, "select_option({})", value),
            _ => f.write_str(self.name()),
        }
    }
}

/// Operations the synchronization layer consumes from a browser session.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Whether an element matching `target` is visible right now. Never fails;
    /// a driver error reads as "not visible".
    async fn is_visible(&self, target: &Descriptor) -> bool;

    async fn read_text(&self, target: &Descriptor) -> Result<String, DriverError>;

    async fn count(&self, target: &Descriptor) -> Result<usize, DriverError>;

    async fn is_checked(&self, target: &Descriptor) -> Result<bool, DriverError>;

    async fn perform(&self, target: &Descriptor, action: &UiAction) -> Result<(), DriverError>;

    async fn goto(&self, url: &str) -> Result<(), DriverError>;

    async fn current_url(&self) -> Result<String, DriverError>;

    /// Block until the current URL matches `pattern`.
    ///
    /// The provided implementation polls [`Driver::current_url`] through the
    /// wait engine; backends with a native primitive should override it.
    async fn wait_for_url(&self, pattern: &TextMatch, timeout: Duration) -> Result<(), DriverError> {
        let options = WaitOptions::default().with_timeout(timeout);
        let probe = StateProbe::url_matches(self, pattern.clone());
        match wait_until(probe, &options).await {
            Ok(_) => Ok(()),
            Err(Error::TimeoutExceeded { elapsed, .. }) => Err(DriverError::Timeout(elapsed)),
            Err(other) => Err(DriverError::Bridge(other.to_string())),
        }
    }
}
