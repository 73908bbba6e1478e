//! Multi-condition wait engine
//!
//! Polls an ordered list of [`StateProbe`]s until one of them reports true or
//! the deadline passes. Every poll cycle evaluates the probes left to right and
//! stops at the first true one, so list order decides ties between states that
//! become true in the same cycle.
//!
//! A probe that errors, or that does not answer within its cycle's budget,
//! counts as "not yet true". Each cycle gets the time left before the deadline
//! (at least one poll interval), shared by all its probes, so a wait ends no
//! later than one poll interval past the deadline. One misbehaving probe never aborts
//! the whole wait.

use std::time::Duration;

use tokio::time::{sleep, timeout, Instant};
use tracing::debug;

use crate::config::TimeoutConfig;
use crate::error::{Error, Result};
use crate::probe::StateProbe;

/// Default overall deadline (30 seconds)
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default delay between poll cycles (250ms)
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Deadline and cadence for a wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl WaitOptions {
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval,
        }
    }

    /// Step-level deadline and poll cadence from the suite configuration.
    pub fn from_config(config: &TimeoutConfig) -> Self {
        Self::new(config.step(), config.poll_interval())
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

/// Which probe matched, and when.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeMatch {
    /// Position of the probe in the list passed to the engine
    pub index: usize,
    pub name: String,
    pub elapsed: Duration,
}

/// Result of one wait call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome {
    Matched(ProbeMatch),
    TimedOut { elapsed: Duration },
}

impl WaitOutcome {
    pub fn is_matched(&self) -> bool {
        matches!(self, WaitOutcome::Matched(_))
    }

    pub fn elapsed(&self) -> Duration {
        match self {
            WaitOutcome::Matched(m) => m.elapsed,
            WaitOutcome::TimedOut { elapsed } => *elapsed,
        }
    }
}

/// Poll `probes` until one is true or `options.timeout` elapses.
///
/// A timeout is reported as [`WaitOutcome::TimedOut`]. At least one full pass
/// over the probes runs even with a zero timeout.
pub async fn poll_any(probes: &[StateProbe<'_>], options: &WaitOptions) -> Result<WaitOutcome> {
    if probes.is_empty() {
        return Err(Error::NoProbes);
    }

    let start = Instant::now();
    let deadline = start + options.timeout;
    let mut cycles = 0usize;

    loop {
        cycles += 1;
        // One budget per pass, shared by every probe in it.
        let cycle_start = Instant::now();
        let cycle_deadline =
            cycle_start + deadline.saturating_duration_since(cycle_start).max(options.poll_interval);
        for (index, probe) in probes.iter().enumerate() {
            if evaluate(probe, cycle_deadline).await {
                let elapsed = start.elapsed();
                debug!(probe = probe.name(), index, ?elapsed, cycles, "state matched");
                return Ok(WaitOutcome::Matched(ProbeMatch {
                    index,
                    name: probe.name().to_string(),
                    elapsed,
                }));
            }
        }

        let now = Instant::now();
        if now >= deadline {
            let elapsed = now - start;
            debug!(probes = probes.len(), ?elapsed, cycles, "no state matched before deadline");
            return Ok(WaitOutcome::TimedOut { elapsed });
        }

        sleep(options.poll_interval.min(deadline - now)).await;
    }
}

/// Like [`poll_any`], but a timeout is an [`Error::TimeoutExceeded`].
pub async fn wait_for_any_state(
    probes: &[StateProbe<'_>],
    options: &WaitOptions,
) -> Result<ProbeMatch> {
    match poll_any(probes, options).await? {
        WaitOutcome::Matched(matched) => Ok(matched),
        WaitOutcome::TimedOut { elapsed } => Err(Error::TimeoutExceeded {
            elapsed,
            probes: probes.len(),
        }),
    }
}

/// Wait for a single probe.
pub async fn wait_until(probe: StateProbe<'_>, options: &WaitOptions) -> Result<ProbeMatch> {
    wait_for_any_state(std::slice::from_ref(&probe), options).await
}

async fn evaluate(probe: &StateProbe<'_>, cycle_deadline: Instant) -> bool {
    let budget = cycle_deadline.saturating_duration_since(Instant::now());

    match timeout(budget, probe.evaluate()).await {
        Ok(Ok(value)) => value,
        Ok(Err(err)) => {
            debug!(probe = probe.name(), error = %err, "probe failed, treating as false");
            false
        }
        Err(_) => {
            debug!(probe = probe.name(), ?budget, "probe did not answer in time, treating as false");
            false
        }
    }
}
