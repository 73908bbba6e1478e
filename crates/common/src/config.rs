//! Suite configuration
//!
//! Loaded from a TOML file when present, then overridden from the environment
//! (`BASE_URL`, `STANDARD_USER`, `SLICKFOX_EMAIL`, ...), so the same suite runs
//! locally and in CI without edits.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::wait::WaitOptions;

/// Top-level suite configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteConfig {
    /// Extra runs granted to a failing test
    pub retries: u32,

    /// Demo e-commerce storefront
    pub storefront: StorefrontConfig,

    /// Project / epic / user-story tracker
    pub tracker: TrackerConfig,

    /// Browser launch settings
    pub browser: BrowserSettings,

    /// Deadlines and poll cadence
    pub timeouts: TimeoutConfig,

    /// Token accounting rules of the tracker
    pub tokens: TokenConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorefrontConfig {
    pub base_url: String,
    pub username: String,
    pub password: String,
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.saucedemo.com".to_string(),
            username: "standard_user".to_string(),
            password: "secret_sauce".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub base_url: String,
    pub email: Option<String>,
    pub password: Option<String>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            base_url: "https://demo.slickfox.com".to_string(),
            email: None,
            password: None,
        }
    }
}

impl TrackerConfig {
    /// Credentials, if both halves are configured.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.email, &self.password) {
            (Some(email), Some(password)) => Some((email.as_str(), password.as_str())),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    /// chromium, firefox or webkit
    pub name: String,
    pub headless: bool,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            name: "chromium".to_string(),
            headless: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Deadline for one synchronization step
    pub step_ms: u64,
    /// Deadline for a single expectation
    pub expect_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            step_ms: 30_000,
            expect_ms: 5_000,
            poll_interval_ms: 250,
        }
    }
}

impl TimeoutConfig {
    pub fn step(&self) -> Duration {
        Duration::from_millis(self.step_ms)
    }

    pub fn expect(&self) -> Duration {
        Duration::from_millis(self.expect_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Wait options for a full step.
    pub fn step_wait(&self) -> WaitOptions {
        WaitOptions::from_config(self)
    }

    /// Wait options for a single expectation.
    pub fn expect_wait(&self) -> WaitOptions {
        WaitOptions::new(self.expect(), self.poll_interval())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    /// Tokens charged per generated user story
    pub cost_per_story: u32,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self { cost_per_story: 5 }
    }
}

impl SuiteConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load from `path`, then apply process environment overrides.
    pub fn load_with_env(path: &Path) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply overrides from `lookup` (normally the process environment).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("BASE_URL") {
            self.storefront.base_url = v;
        }
        if let Some(v) = lookup("STANDARD_USER") {
            self.storefront.username = v;
        }
        if let Some(v) = lookup("STANDARD_PASSWORD") {
            self.storefront.password = v;
        }
        if let Some(v) = lookup("SLICKFOX_BASE_URL") {
            self.tracker.base_url = v;
        }
        if let Some(v) = lookup("SLICKFOX_EMAIL") {
            self.tracker.email = Some(v);
        }
        if let Some(v) = lookup("SLICKFOX_PASSWORD") {
            self.tracker.password = Some(v);
        }
        if let Some(v) = lookup("BROWSER") {
            self.browser.name = v;
        }
        if let Some(v) = lookup("HEADLESS") {
            self.browser.headless = v == "true";
        }
        if let Some(v) = lookup("TIMEOUT") {
            self.timeouts.step_ms = parse_number("TIMEOUT", &v)?;
        }
        if let Some(v) = lookup("RETRIES") {
            self.retries = parse_number("RETRIES", &v)?;
        }
        if let Some(v) = lookup("TOKEN_COST_PER_STORY") {
            self.tokens.cost_per_story = parse_number("TOKEN_COST_PER_STORY", &v)?;
        }
        self.validate()
    }

    fn validate(&self) -> Result<()> {
        if !matches!(self.browser.name.as_str(), "chromium" | "firefox" | "webkit") {
            return Err(Error::InvalidConfig(format!(
                "unknown browser '{}'",
                self.browser.name
            )));
        }
        if self.timeouts.poll_interval_ms == 0 {
            return Err(Error::InvalidConfig("poll_interval_ms must be positive".into()));
        }
        for (name, url) in [
            ("storefront.base_url", &self.storefront.base_url),
            ("tracker.base_url", &self.tracker.base_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(Error::InvalidConfig(format!("{} is not an http(s) URL: {}", name, url)));
            }
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::InvalidConfig(format!("{} must be a number, got '{}'", key, value)))
}
