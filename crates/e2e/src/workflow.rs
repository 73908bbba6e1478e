//! Multi-step flows composed from the page objects
//!
//! `generate_and_select` is the dispatch -> wait -> extract -> validate chain
//! of the AI story preview. `retry` re-runs a whole flow; the primitives
//! below it never retry on their own.

use std::future::Future;
use std::time::Duration;

use pagesync_common::config::TokenConfig;
use pagesync_common::{Driver, ExtractionResult};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{E2eError, E2eResult};
use crate::pages::ai_stories::{self, AiStoriesPanel};
use crate::pages::EpicDetailsPage;

/// Token numbers of the preview summary line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSummary {
    pub available: Option<i64>,
    pub selected_stories: Option<i64>,
    pub selected_tokens: Option<i64>,
    pub remaining: Option<i64>,
}

impl TokenSummary {
    pub fn from_extraction(values: &ExtractionResult) -> Self {
        Self {
            available: values.get(ai_stories::AVAILABLE),
            selected_stories: values.get(ai_stories::SELECTED_STORIES),
            selected_tokens: values.get(ai_stories::SELECTED_TOKENS),
            remaining: values.get(ai_stories::REMAINING),
        }
    }
}

/// Token accounting rule of the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenPolicy {
    pub cost_per_story: u32,
}

impl From<&TokenConfig> for TokenPolicy {
    fn from(config: &TokenConfig) -> Self {
        Self {
            cost_per_story: config.cost_per_story,
        }
    }
}

impl TokenPolicy {
    pub fn cost_of(&self, stories: i64) -> i64 {
        stories * i64::from(self.cost_per_story)
    }

    pub fn expected_remaining(&self, available: i64, selected: i64) -> i64 {
        available - self.cost_of(selected)
    }

    /// Check a summary against the policy.
    ///
    /// `available`, `selected_stories` and `remaining` must be readable. The
    /// token figure in parentheses is optional but must agree when shown.
    pub fn verify(&self, summary: &TokenSummary) -> E2eResult<()> {
        let (available, selected, remaining) =
            match (summary.available, summary.selected_stories, summary.remaining) {
                (Some(a), Some(s), Some(r)) => (a, s, r),
                _ => {
                    return Err(E2eError::AssertionFailed(format!(
                        "token summary incomplete: {:?}",
                        summary
                    )))
                }
            };

        if let Some(tokens) = summary.selected_tokens {
            if tokens != self.cost_of(selected) {
                return Err(E2eError::AssertionFailed(format!(
                    "{} selected stories should cost {} tokens, page shows {}",
                    selected,
                    self.cost_of(selected),
                    tokens
                )));
            }
        }

        let expected = self.expected_remaining(available, selected);
        if remaining != expected {
            return Err(E2eError::AssertionFailed(format!(
                "remaining tokens {} != {} - {} x {}",
                remaining, available, selected, self.cost_per_story
            )));
        }
        Ok(())
    }
}

/// Open the AI preview, tick `n` stories and verify the token deduction.
pub async fn generate_and_select<D>(
    epic: &EpicDetailsPage<'_, D>,
    panel: &AiStoriesPanel<'_, D>,
    n: usize,
    policy: TokenPolicy,
) -> E2eResult<TokenSummary>
where
    D: Driver + ?Sized,
{
    epic.open_generate_ai_stories().await?;
    panel.wait_for_shown().await?;

    let before = TokenSummary::from_extraction(&panel.read_token_numbers().await?);
    let available = before.available.ok_or_else(|| {
        E2eError::AssertionFailed("available tokens not shown before selection".into())
    })?;

    let selected = panel.select_first_n(n).await?;
    if selected == 0 {
        return Err(E2eError::AssertionFailed("no selectable AI stories".into()));
    }

    panel.wait_for_selected(selected).await?;

    let after = TokenSummary::from_extraction(&panel.read_token_numbers().await?);
    if after.available != Some(available) {
        warn!(before = available, after = ?after.available, "available tokens changed during selection");
    }
    if after.selected_stories != Some(selected as i64) {
        return Err(E2eError::AssertionFailed(format!(
            "ticked {} stories, summary shows {:?}",
            selected, after.selected_stories
        )));
    }
    policy.verify(&after)?;

    info!(available, selected, remaining = ?after.remaining, "token deduction verified");
    Ok(after)
}

/// How often and how far apart a flow is re-run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

/// Run `op` until it succeeds or `policy.attempts` runs have failed.
pub async fn retry<T, F, Fut>(policy: RetryPolicy, mut op: F) -> E2eResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = E2eResult<T>>,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= attempts => {
                return Err(E2eError::RetriesExhausted {
                    attempts,
                    last: Box::new(e),
                })
            }
            Err(e) => {
                warn!("Attempt {} failed: {}", attempt, e);
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
        }
    }
}
