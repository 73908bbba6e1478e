//! Main test runner that orchestrates reachability checks, Playwright and the step executor

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use pagesync_common::config::{SuiteConfig, TimeoutConfig};
use pagesync_common::{
    attempt_with_fallback, extract_fields, wait_for_any_state, wait_until, ActionAttempt, Driver,
    DriverError, PatternTable, StateProbe, UiAction, WaitOptions,
};

use crate::error::{E2eError, E2eResult};
use crate::pages::join_url;
use crate::playwright::{PlaywrightConfig, PlaywrightDriver};
use crate::spec::{App, StateSpec, TestSpec, TestStep};

/// Outcome of one executed step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub step: String,
    pub success: bool,
    pub duration_ms: u64,
    /// What the step observed: winning strategy, matched state, extracted values
    pub detail: Option<String>,
    pub error: Option<String>,
}

/// Result of running a single test
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub name: String,
    pub success: bool,
    pub skipped: bool,
    /// Runs used, including retries
    pub attempts: u32,
    pub duration_ms: u64,
    pub steps: Vec<StepResult>,
    pub error: Option<String>,
}

impl TestResult {
    fn skipped(name: &str, reason: &str) -> Self {
        Self {
            name: name.to_string(),
            success: true,
            skipped: true,
            attempts: 0,
            duration_ms: 0,
            steps: vec![],
            error: Some(reason.to_string()),
        }
    }

    fn failed(name: &str, attempts: u32, error: String) -> Self {
        Self {
            name: name.to_string(),
            success: false,
            skipped: false,
            attempts,
            duration_ms: 0,
            steps: vec![],
            error: Some(error),
        }
    }
}

/// Result of running all tests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSuiteResult {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
    pub results: Vec<TestResult>,
}

impl TestSuiteResult {
    pub fn from_results(
        run_id: Uuid,
        started_at: DateTime<Utc>,
        duration: Duration,
        results: Vec<TestResult>,
    ) -> Self {
        let skipped = results.iter().filter(|r| r.skipped).count();
        let passed = results.iter().filter(|r| r.success && !r.skipped).count();
        Self {
            run_id,
            started_at,
            finished_at: Utc::now(),
            total: results.len(),
            passed,
            failed: results.len() - passed - skipped,
            skipped,
            duration_ms: duration.as_millis() as u64,
            results,
        }
    }
}

/// Values available to steps for `${name}` expansion, plus deadlines.
#[derive(Debug, Clone)]
pub struct StepContext {
    pub base_url: String,
    pub timeouts: TimeoutConfig,
    pub vars: BTreeMap<String, String>,
}

impl StepContext {
    pub fn for_app(config: &SuiteConfig, app: App) -> Self {
        let mut vars = BTreeMap::new();
        vars.insert("username".to_string(), config.storefront.username.clone());
        vars.insert("password".to_string(), config.storefront.password.clone());
        if let Some((email, password)) = config.tracker.credentials() {
            vars.insert("email".to_string(), email.to_string());
            vars.insert("tracker_password".to_string(), password.to_string());
        }
        let base_url = match app {
            App::Storefront => config.storefront.base_url.clone(),
            App::Tracker => config.tracker.base_url.clone(),
        };
        vars.insert("base_url".to_string(), base_url.clone());

        Self {
            base_url,
            timeouts: config.timeouts,
            vars,
        }
    }

    /// Replace `${name}` with its value; unknown names are left as written.
    pub fn expand(&self, input: &str) -> String {
        let mut out = String::with_capacity(input.len());
        let mut rest = input;
        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            match after.find('}') {
                Some(end) => {
                    let name = &after[..end];
                    match self.vars.get(name) {
                        Some(value) => out.push_str(value),
                        None => out.push_str(&rest[start..start + 3 + end]),
                    }
                    rest = &after[end + 1..];
                }
                None => {
                    out.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }
        out.push_str(rest);
        out
    }

    fn wait(&self, timeout_ms: Option<u64>) -> WaitOptions {
        match timeout_ms {
            Some(ms) => self.timeouts.step_wait().with_timeout(Duration::from_millis(ms)),
            None => self.timeouts.step_wait(),
        }
    }

    fn expect_wait(&self, timeout_ms: Option<u64>) -> WaitOptions {
        match timeout_ms {
            Some(ms) => self.timeouts.expect_wait().with_timeout(Duration::from_millis(ms)),
            None => self.timeouts.expect_wait(),
        }
    }
}

fn probe_for<'a, D: Driver + ?Sized>(driver: &'a D, state: &StateSpec) -> StateProbe<'a> {
    match state {
        StateSpec::Visible { target } => StateProbe::visible(driver, target.clone()),
        StateSpec::Hidden { target } => StateProbe::hidden(driver, target.clone()),
        StateSpec::Url { pattern } => StateProbe::url_matches(driver, pattern.clone()),
        StateSpec::Text { target, expected } => {
            StateProbe::text_matches(driver, target.clone(), expected.clone())
        }
    }
}

/// Execute one step; returns an observation worth recording, if any.
pub async fn execute_step<D>(driver: &D, step: &TestStep, ctx: &StepContext) -> E2eResult<Option<String>>
where
    D: Driver + ?Sized,
{
    match step {
        TestStep::Navigate { url } => {
            let url = join_url(&ctx.base_url, &ctx.expand(url));
            driver.goto(&url).await?;
            Ok(Some(url))
        }
        TestStep::Click { target, force } => {
            let action = UiAction::Click { force: *force };
            driver.perform(target, &action).await?;
            Ok(None)
        }
        TestStep::Fill { target, value } => {
            driver.perform(target, &UiAction::fill(ctx.expand(value))).await?;
            Ok(None)
        }
        TestStep::Check { target, force } => {
            driver.perform(target, &UiAction::Check { force: *force }).await?;
            Ok(None)
        }
        TestStep::Uncheck { target, force } => {
            driver
                .perform(target, &UiAction::Uncheck { force: *force })
                .await?;
            Ok(None)
        }
        TestStep::Select { target, value } => {
            let action = UiAction::SelectOption {
                value: ctx.expand(value),
            };
            driver.perform(target, &action).await?;
            Ok(None)
        }
        TestStep::Attempt { strategies } => {
            let attempts = strategies
                .iter()
                .map(|s| ActionAttempt::perform(driver, s.target.clone(), s.action.clone()))
                .collect();
            let winner = attempt_with_fallback(attempts).await?;
            Ok(Some(format!("strategy {} succeeded", winner + 1)))
        }
        TestStep::WaitAny { states, timeout_ms } => {
            let probes: Vec<_> = states.iter().map(|s| probe_for(driver, s)).collect();
            let matched = wait_for_any_state(&probes, &ctx.wait(*timeout_ms)).await?;
            Ok(Some(format!("{} after {:?}", matched.name, matched.elapsed)))
        }
        TestStep::WaitUrl { pattern, timeout_ms } => {
            let timeout = ctx.wait(*timeout_ms).timeout;
            driver.wait_for_url(pattern, timeout).await?;
            Ok(None)
        }
        TestStep::Extract {
            target,
            fields,
            expect,
        } => {
            let mut table = PatternTable::new();
            for (name, pattern) in fields {
                table = table.field(name.as_str(), pattern)?;
            }
            let text = driver.read_text(target).await?;
            let values = extract_fields(&text, &table);
            for (field, expected) in expect {
                let actual = values.get(field);
                if actual != *expected {
                    return Err(E2eError::AssertionFailed(format!(
                        "field '{}': expected {}, extracted {} from '{}'",
                        field,
                        show(*expected),
                        show(actual),
                        text.trim()
                    )));
                }
            }
            Ok(Some(serde_json::to_string(&values)?))
        }
        TestStep::AssertVisible {
            target,
            visible,
            timeout_ms,
        } => {
            let probe = if *visible {
                StateProbe::visible(driver, target.clone())
            } else {
                StateProbe::hidden(driver, target.clone())
            };
            wait_until(probe, &ctx.expect_wait(*timeout_ms))
                .await
                .map_err(|e| E2eError::AssertionFailed(format!("{}: {}", step, e)))?;
            Ok(None)
        }
        TestStep::AssertText {
            target,
            expected,
            timeout_ms,
        } => {
            let probe = StateProbe::text_matches(driver, target.clone(), expected.clone());
            if let Err(e) = wait_until(probe, &ctx.expect_wait(*timeout_ms)).await {
                let actual = driver
                    .read_text(target)
                    .await
                    .unwrap_or_else(|err| format!("<{}>", err));
                return Err(E2eError::AssertionFailed(format!(
                    "{}: {} (actual text '{}')",
                    step,
                    e,
                    actual.trim()
                )));
            }
            Ok(None)
        }
        TestStep::Sleep { ms } => {
            tokio::time::sleep(Duration::from_millis(*ms)).await;
            Ok(None)
        }
        TestStep::Log { message } => {
            info!("[spec] {}", ctx.expand(message));
            Ok(None)
        }
    }
}

fn show(value: Option<i64>) -> String {
    value.map_or_else(|| "unknown".to_string(), |v| v.to_string())
}

/// Run `spec`'s steps in order, stopping at the first failure.
pub async fn execute_steps<D>(driver: &D, spec: &TestSpec, ctx: &StepContext) -> Vec<StepResult>
where
    D: Driver + ?Sized,
{
    let mut results = Vec::with_capacity(spec.steps.len());
    for step in &spec.steps {
        let start = Instant::now();
        let outcome = execute_step(driver, step, ctx).await;
        let duration_ms = start.elapsed().as_millis() as u64;
        match outcome {
            Ok(detail) => {
                debug!(step = %step, ?detail, "step passed");
                results.push(StepResult {
                    step: step.to_string(),
                    success: true,
                    duration_ms,
                    detail,
                    error: None,
                });
            }
            Err(e) => {
                results.push(StepResult {
                    step: step.to_string(),
                    success: false,
                    duration_ms,
                    detail: None,
                    error: Some(e.to_string()),
                });
                break; // Stop on first failure
            }
        }
    }
    results
}

/// Configuration for the test runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub suite: SuiteConfig,
    pub playwright: PlaywrightConfig,
    pub specs_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Skip the HTTP reachability check of each app
    pub skip_preflight: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        let suite = SuiteConfig::default();
        Self {
            playwright: PlaywrightConfig::from_settings(&suite.browser),
            suite,
            specs_dir: PathBuf::from("crates/e2e/specs"),
            output_dir: PathBuf::from("test-results"),
            skip_preflight: false,
        }
    }
}

/// Main E2E test runner
pub struct TestRunner {
    config: RunnerConfig,
    reachable: Vec<String>,
}

impl TestRunner {
    /// Create a new test runner with default configuration
    pub fn new() -> Self {
        Self::with_config(RunnerConfig::default())
    }

    /// Create a test runner with custom configuration
    pub fn with_config(config: RunnerConfig) -> Self {
        Self {
            config,
            reachable: Vec::new(),
        }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Wait for `base_url` to answer HTTP through the wait engine.
    pub async fn preflight(&mut self, base_url: &str) -> E2eResult<()> {
        if self.config.skip_preflight || self.reachable.iter().any(|u| u == base_url) {
            return Ok(());
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()?;
        let url = base_url.to_string();
        let probe = StateProbe::new(format!("GET {}", url), || {
            let client = client.clone();
            let url = url.clone();
            async move {
                match client.get(&url).send().await {
                    Ok(resp) => {
                        debug!("Reachability check {}: {}", url, resp.status());
                        Ok(!resp.status().is_server_error())
                    }
                    Err(e) => Err(DriverError::Bridge(e.to_string())),
                }
            }
        });

        let options = self.config.suite.timeouts.step_wait();
        match wait_until(probe, &options).await {
            Ok(matched) => {
                info!("{} reachable after {:?}", base_url, matched.elapsed);
                self.reachable.push(base_url.to_string());
                Ok(())
            }
            Err(e) => Err(E2eError::TargetUnreachable {
                url: base_url.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    /// Run all tests in the specs directory
    pub async fn run_all(&mut self) -> E2eResult<TestSuiteResult> {
        let specs = TestSpec::load_all(&self.config.specs_dir)?;
        self.run_specs(&specs).await
    }

    /// Run tests matching a tag
    pub async fn run_tagged(&mut self, tag: &str) -> E2eResult<TestSuiteResult> {
        let specs = TestSpec::load_all(&self.config.specs_dir)?;
        let filtered: Vec<TestSpec> = TestSpec::filter_by_tag(&specs, tag)
            .into_iter()
            .cloned()
            .collect();
        self.run_specs(&filtered).await
    }

    /// Run a specific test by name
    pub async fn run_test(&mut self, name: &str) -> E2eResult<TestSuiteResult> {
        let specs = TestSpec::load_all(&self.config.specs_dir)?;
        let spec = specs
            .into_iter()
            .find(|s| s.name == name)
            .ok_or_else(|| E2eError::SpecParse(format!("Test not found: {}", name)))?;

        self.run_specs(std::slice::from_ref(&spec)).await
    }

    /// Run a list of test specs
    pub async fn run_specs(&mut self, specs: &[TestSpec]) -> E2eResult<TestSuiteResult> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let start = Instant::now();
        let mut results = Vec::with_capacity(specs.len());

        info!(%run_id, "Running {} test(s)...", specs.len());

        for spec in specs {
            let result = self.run_spec(spec).await;
            if result.skipped {
                warn!("- {} skipped: {}", result.name, result.error.as_deref().unwrap_or(""));
            } else if result.success {
                info!("✓ {} ({} ms, {} run(s))", result.name, result.duration_ms, result.attempts);
            } else {
                error!(
                    "✗ {} - {}",
                    result.name,
                    result.error.as_deref().unwrap_or("unknown error")
                );
            }
            results.push(result);
        }

        let suite = TestSuiteResult::from_results(run_id, started_at, start.elapsed(), results);

        info!(
            "Test Results: {} passed, {} failed, {} skipped ({} ms)",
            suite.passed, suite.failed, suite.skipped, suite.duration_ms
        );

        Ok(suite)
    }

    /// Run a single spec, retrying failed runs up to the configured count.
    pub async fn run_spec(&mut self, spec: &TestSpec) -> TestResult {
        if spec.requires_credentials && self.config.suite.tracker.credentials().is_none() {
            return TestResult::skipped(&spec.name, "tracker credentials not configured");
        }

        let ctx = StepContext::for_app(&self.config.suite, spec.app);
        if let Err(e) = self.preflight(&ctx.base_url).await {
            return TestResult::failed(&spec.name, 0, e.to_string());
        }

        let runs = self.config.suite.retries + 1;
        let mut last = None;
        for attempt in 1..=runs {
            if attempt > 1 {
                warn!("Retrying {} (run {} of {})", spec.name, attempt, runs);
            }
            let result = match self.run_spec_once(spec, &ctx, attempt).await {
                Ok(result) => result,
                Err(e) => TestResult::failed(&spec.name, attempt, e.to_string()),
            };
            if result.success {
                return result;
            }
            last = Some(result);
        }
        last.unwrap_or_else(|| TestResult::failed(&spec.name, runs, "no runs executed".into()))
    }

    async fn run_spec_once(
        &self,
        spec: &TestSpec,
        ctx: &StepContext,
        attempt: u32,
    ) -> E2eResult<TestResult> {
        let start = Instant::now();
        debug!("Running test: {} (run {})", spec.name, attempt);

        let driver = PlaywrightDriver::launch(self.config.playwright.clone()).await?;
        let steps = execute_steps(&driver, spec, ctx).await;
        if let Err(e) = driver.close().await {
            warn!("Failed to close browser for {}: {}", spec.name, e);
        }

        let error = steps
            .iter()
            .find(|s| !s.success)
            .map(|s| {
                E2eError::StepFailed {
                    step: s.step.clone(),
                    reason: s.error.clone().unwrap_or_else(|| "failed".to_string()),
                }
                .to_string()
            });

        Ok(TestResult {
            name: spec.name.clone(),
            success: error.is_none(),
            skipped: false,
            attempts: attempt,
            duration_ms: start.elapsed().as_millis() as u64,
            steps,
            error,
        })
    }

    /// Write test results to JSON file
    pub fn write_results(&self, results: &TestSuiteResult) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(&self.config.output_dir)?;

        let path = self.config.output_dir.join("test-results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}

impl Default for TestRunner {
    fn default() -> Self {
        Self::new()
    }
}
