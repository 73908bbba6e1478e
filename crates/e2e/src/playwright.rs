//! Playwright browser automation
//!
//! [`PlaywrightDriver`] keeps one Node process alive per browser session and
//! talks to it over a JSON-line protocol on stdin/stdout. The embedded bridge
//! script translates [`Descriptor`]s into Playwright locators.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command as TokioCommand};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use pagesync_common::config::BrowserSettings;
use pagesync_common::{Descriptor, Driver, DriverError, TextMatch, UiAction};

use crate::error::{E2eError, E2eResult};

/// Bridge script run under `node`.
pub const BRIDGE_SCRIPT: &str = include_str!("../scripts/bridge.js");

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "chromium" => Some(Browser::Chromium),
            "firefox" => Some(Browser::Firefox),
            "webkit" => Some(Browser::Webkit),
            _ => None,
        }
    }
}

/// Configuration for Playwright
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    pub browser: Browser,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,

    /// Directory whose `node_modules` provides `playwright`
    pub working_dir: PathBuf,

    /// Node executable running the bridge
    pub node_path: PathBuf,

    /// Previously saved session (cookies, local storage) to start from
    pub storage_state: Option<PathBuf>,

    /// Per-action timeout applied inside the browser
    pub action_timeout: Duration,

    /// Upper bound for one bridge round trip
    pub request_timeout: Duration,

    /// Upper bound for browser launch
    pub launch_timeout: Duration,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            browser: Browser::Chromium,
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            working_dir: PathBuf::from("."),
            node_path: PathBuf::from("node"),
            storage_state: None,
            action_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(15),
            launch_timeout: Duration::from_secs(60),
        }
    }
}

impl PlaywrightConfig {
    /// Browser settings from the suite configuration.
    pub fn from_settings(settings: &BrowserSettings) -> Self {
        Self {
            browser: Browser::from_name(&settings.name).unwrap_or_default(),
            headless: settings.headless,
            ..Default::default()
        }
    }
}

/// Launch parameters handed to the bridge through the environment.
#[derive(Debug, Serialize)]
struct BridgeLaunch<'a> {
    browser: &'static str,
    headless: bool,
    viewport_width: u32,
    viewport_height: u32,
    action_timeout_ms: u64,
    storage_state: Option<&'a Path>,
}

impl<'a> From<&'a PlaywrightConfig> for BridgeLaunch<'a> {
    fn from(config: &'a PlaywrightConfig) -> Self {
        Self {
            browser: config.browser.as_str(),
            headless: config.headless,
            viewport_width: config.viewport_width,
            viewport_height: config.viewport_height,
            action_timeout_ms: config.action_timeout.as_millis() as u64,
            storage_state: config.storage_state.as_deref(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum BridgeOp<'a> {
    IsVisible { target: &'a Descriptor },
    ReadText { target: &'a Descriptor },
    Count { target: &'a Descriptor },
    IsChecked { target: &'a Descriptor },
    Perform {
        target: &'a Descriptor,
        action: &'a UiAction,
    },
    Goto { url: &'a str },
    CurrentUrl,
    WaitForUrl {
        pattern: &'a TextMatch,
        timeout_ms: u64,
    },
    SaveStorageState { path: &'a Path },
    Close,
}

#[derive(Debug, Serialize)]
struct BridgeRequest<'a> {
    id: u64,
    #[serde(flatten)]
    op: &'a BridgeOp<'a>,
}

#[derive(Debug, Deserialize)]
struct BridgeResponse {
    id: Option<u64>,
    ok: bool,
    #[serde(default)]
    value: JsonValue,
    #[serde(default)]
    error: Option<String>,
}

struct BridgeIo {
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    /// Set while a request line is being written. Still set afterwards means
    /// the write was abandoned part way and stdin holds a torn line.
    torn: bool,
}

/// Persistent Playwright session behind the [`Driver`] trait.
pub struct PlaywrightDriver {
    child: Child,
    io: Mutex<BridgeIo>,
    next_id: AtomicU64,
    request_timeout: Duration,
    closed: bool,
    // Holds the bridge script on disk for the lifetime of the process
    _script_dir: tempfile::TempDir,
}

impl PlaywrightDriver {
    /// Spawn the bridge and wait until the browser page is open.
    pub async fn launch(config: PlaywrightConfig) -> E2eResult<Self> {
        Self::check_playwright_installed(&config.working_dir)?;

        let script_dir = tempfile::tempdir()?;
        let script_path = script_dir.path().join("bridge.js");
        std::fs::write(&script_path, BRIDGE_SCRIPT)?;

        let launch = serde_json::to_string(&BridgeLaunch::from(&config))?;
        debug!("Launching Playwright bridge: {}", script_path.display());

        let mut child = TokioCommand::new(&config.node_path)
            .arg(&script_path)
            .current_dir(&config.working_dir)
            .env("NODE_PATH", config.working_dir.join("node_modules"))
            .env("PAGESYNC_BRIDGE_CONFIG", launch)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                E2eError::Bridge(format!("failed to spawn {}: {}", config.node_path.display(), e))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| E2eError::Bridge("bridge stdin unavailable".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| E2eError::Bridge("bridge stdout unavailable".into()))?;
        let mut lines = BufReader::new(stdout).lines();

        match timeout(config.launch_timeout, wait_ready(&mut lines)).await {
            Ok(result) => result?,
            Err(_) => {
                let _ = child.start_kill();
                return Err(E2eError::Bridge(format!(
                    "bridge not ready after {:?}",
                    config.launch_timeout
                )));
            }
        }

        info!(
            browser = config.browser.as_str(),
            headless = config.headless,
            "Playwright bridge ready"
        );

        Ok(Self {
            child,
            io: Mutex::new(BridgeIo {
                stdin,
                stdout: lines,
                torn: false,
            }),
            next_id: AtomicU64::new(1),
            request_timeout: config.request_timeout,
            closed: false,
            _script_dir: script_dir,
        })
    }

    /// Check if Playwright is installed
    fn check_playwright_installed(working_dir: &Path) -> E2eResult<()> {
        let output = Command::new("npx")
            .args(["playwright", "--version"])
            .current_dir(working_dir)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match output {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::PlaywrightNotFound),
        }
    }

    /// Persist cookies and local storage so later sessions can skip login.
    pub async fn save_storage_state(&self, path: &Path) -> E2eResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.request(&BridgeOp::SaveStorageState { path }, self.request_timeout)
            .await?;
        Ok(())
    }

    /// Ask the bridge to close the browser, then reap the process.
    pub async fn close(mut self) -> E2eResult<()> {
        if let Err(e) = self.request(&BridgeOp::Close, self.request_timeout).await {
            warn!("Bridge did not acknowledge close: {}", e);
        }
        match timeout(Duration::from_secs(5), self.child.wait()).await {
            Ok(Ok(status)) => debug!(?status, "Bridge exited"),
            _ => {
                warn!("Bridge still running after close; killing");
                self.child.kill().await?;
            }
        }
        self.closed = true;
        Ok(())
    }

    async fn request(
        &self,
        op: &BridgeOp<'_>,
        deadline: Duration,
    ) -> Result<JsonValue, DriverError> {
        if self.closed {
            return Err(DriverError::Closed);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut line = serde_json::to_string(&BridgeRequest { id, op })?;
        line.push('\n');

        let mut io = self.io.lock().await;
        let BridgeIo { stdin, torn, .. } = &mut *io;
        send_line(stdin, torn, line.as_bytes()).await?;

        let response = timeout(deadline, read_response(&mut io.stdout, id))
            .await
            .map_err(|_| DriverError::Timeout(deadline))??;

        if response.ok {
            Ok(response.value)
        } else {
            Err(DriverError::Bridge(
                response
                    .error
                    .unwrap_or_else(|| "unknown bridge error".to_string()),
            ))
        }
    }
}

/// Write one request line. Once a write is cancelled mid-line the bridge can
/// no longer parse the stream, so every later request fails.
async fn send_line<W: AsyncWrite + Unpin>(
    writer: &mut W,
    torn: &mut bool,
    line: &[u8],
) -> Result<(), DriverError> {
    if *torn {
        return Err(DriverError::Bridge(
            "bridge input is corrupt after an interrupted request".to_string(),
        ));
    }
    *torn = true;
    writer.write_all(line).await?;
    writer.flush().await?;
    *torn = false;
    Ok(())
}

async fn wait_ready(lines: &mut Lines<BufReader<ChildStdout>>) -> E2eResult<()> {
    while let Some(line) = lines.next_line().await? {
        match serde_json::from_str::<JsonValue>(&line) {
            Ok(value) if value.get("ready").and_then(JsonValue::as_bool) == Some(true) => {
                return Ok(());
            }
            _ => debug!("[bridge] {}", line),
        }
    }
    Err(E2eError::Bridge("bridge exited before becoming ready".into()))
}

/// Read lines until the response for `id` arrives.
///
/// Responses for other ids belong to requests abandoned after a timeout and
/// are dropped; non-JSON lines are browser console noise.
async fn read_response(
    lines: &mut Lines<BufReader<ChildStdout>>,
    id: u64,
) -> Result<BridgeResponse, DriverError> {
    loop {
        let line = lines.next_line().await?.ok_or(DriverError::Closed)?;
        match parse_response_line(&line) {
            Some(response) if response.id == Some(id) => return Ok(response),
            Some(response) => debug!(expected = id, got = ?response.id, "discarding stale bridge response"),
            None => debug!("[bridge] {}", line),
        }
    }
}

fn parse_response_line(line: &str) -> Option<BridgeResponse> {
    serde_json::from_str(line).ok()
}

fn unexpected(op: &str, value: &JsonValue) -> DriverError {
    DriverError::Bridge(format!("unexpected {} reply: {}", op, value))
}

#[async_trait]
impl Driver for PlaywrightDriver {
    async fn is_visible(&self, target: &Descriptor) -> bool {
        match self
            .request(&BridgeOp::IsVisible { target }, self.request_timeout)
            .await
        {
            Ok(value) => value.as_bool().unwrap_or(false),
            Err(e) => {
                debug!(target = %target, error = %e, "visibility query failed");
                false
            }
        }
    }

    async fn read_text(&self, target: &Descriptor) -> Result<String, DriverError> {
        let value = self
            .request(&BridgeOp::ReadText { target }, self.request_timeout)
            .await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| unexpected("read_text", &value))
    }

    async fn count(&self, target: &Descriptor) -> Result<usize, DriverError> {
        let value = self
            .request(&BridgeOp::Count { target }, self.request_timeout)
            .await?;
        value
            .as_u64()
            .map(|n| n as usize)
            .ok_or_else(|| unexpected("count", &value))
    }

    async fn is_checked(&self, target: &Descriptor) -> Result<bool, DriverError> {
        let value = self
            .request(&BridgeOp::IsChecked { target }, self.request_timeout)
            .await?;
        value
            .as_bool()
            .ok_or_else(|| unexpected("is_checked", &value))
    }

    async fn perform(&self, target: &Descriptor, action: &UiAction) -> Result<(), DriverError> {
        self.request(&BridgeOp::Perform { target, action }, self.request_timeout)
            .await
            .map(|_| ())
            .map_err(|e| match e {
                DriverError::Bridge(reason) => DriverError::ActionFailed {
                    action: action.to_string(),
                    target: target.to_string(),
                    reason,
                },
                other => other,
            })
    }

    async fn goto(&self, url: &str) -> Result<(), DriverError> {
        self.request(&BridgeOp::Goto { url }, self.request_timeout)
            .await
            .map(|_| ())
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        let value = self
            .request(&BridgeOp::CurrentUrl, self.request_timeout)
            .await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| unexpected("current_url", &value))
    }

    async fn wait_for_url(&self, pattern: &TextMatch, timeout: Duration) -> Result<(), DriverError> {
        let op = BridgeOp::WaitForUrl {
            pattern,
            timeout_ms: timeout.as_millis() as u64,
        };
        // The browser enforces `timeout`; the round trip gets slack on top of it.
        self.request(&op, timeout + self.request_timeout)
            .await
            .map(|_| ())
            .map_err(|e| match e {
                DriverError::Bridge(reason) if reason.contains("Timeout") => {
                    DriverError::Timeout(timeout)
                }
                other => other,
            })
    }
}

impl Drop for PlaywrightDriver {
    fn drop(&mut self) {
        if self.closed {
            return;
        }

        // Try graceful shutdown first
        #[cfg(unix)]
        if let Some(pid) = self.child.id() {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
        }

        let _ = self.child.start_kill();
    }
}
