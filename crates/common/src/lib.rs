//! pagesync Common Library
//!
//! Synchronization primitives for browser end-to-end suites whose pages can
//! land in one of several states after an action:
//!
//! - [`wait`]: block until any of several state probes is true
//! - [`extract`]: pull independent numeric fields out of status text
//! - [`dispatch`]: try fallback strategies for one logical action
//!
//! The browser itself sits behind the [`Driver`] trait.

pub mod config;
pub mod dispatch;
pub mod driver;
pub mod error;
pub mod extract;
pub mod locator;
pub mod probe;
pub mod wait;

// Re-export commonly used types
pub use config::SuiteConfig;
pub use dispatch::{attempt_with_fallback, ActionAttempt};
pub use driver::{Driver, DriverError, UiAction};
pub use error::{Error, Result};
pub use extract::{extract_fields, ExtractionPattern, ExtractionResult, PatternTable};
pub use locator::{Descriptor, TextMatch};
pub use probe::StateProbe;
pub use wait::{poll_any, wait_for_any_state, wait_until, ProbeMatch, WaitOptions, WaitOutcome};

/// pagesync version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
