//! pagesync E2E Test Framework
//!
//! This crate drives real browsers against the demo storefront and the
//! story tracker:
//! - Controls Playwright through a persistent Node bridge
//! - Exposes page objects built on the wait engine, extractor and dispatcher
//! - Parses declarative YAML test specs and runs them with retries
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    E2E Test Runner (Rust)                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestRunner                                                 │
//! │    ├── preflight(base_url)        reqwest GET via wait_until│
//! │    ├── PlaywrightDriver::launch() -> impl Driver            │
//! │    ├── execute_step(driver, step) -> detail                 │
//! │    └── write_results() -> test-results.json                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestSpec (YAML)                                            │
//! │    ├── name, tags, app, requires_credentials                │
//! │    └── steps: [Step]                                        │
//! │          ├── navigate / click / fill / check / select       │
//! │          ├── attempt { strategies }   -> dispatcher         │
//! │          ├── wait_any { states }      -> wait engine        │
//! │          ├── extract { fields }       -> extractor          │
//! │          └── assert_visible / assert_text                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  pages::*  (generic over Driver)                            │
//! │    ├── LoginPage, InventoryPage, CartPage                   │
//! │    └── TrackerLoginPage, EpicDetailsPage, AiStoriesPanel,   │
//! │        UserStoryCreatePage                                  │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod pages;
pub mod playwright;
pub mod runner;
pub mod spec;
pub mod workflow;

pub use error::{E2eError, E2eResult};
pub use playwright::{PlaywrightConfig, PlaywrightDriver};
pub use runner::{execute_step, RunnerConfig, TestRunner, TestSuiteResult};
pub use spec::{TestSpec, TestStep};
pub use workflow::{generate_and_select, retry, RetryPolicy, TokenPolicy, TokenSummary};
