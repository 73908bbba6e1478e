//! AI user story preview panel
//!
//! The preview renders in stages: a heading or the token summary first, then
//! an optional loader, then either story checkboxes, an empty state or the
//! cost line. Which of them appear varies between runs, so every wait here is
//! a multi-state wait.

use pagesync_common::{
    attempt_with_fallback, extract_fields, wait_for_any_state, wait_until, ActionAttempt,
    Descriptor, Driver, ExtractionResult, PatternTable, ProbeMatch, StateProbe, TextMatch,
    UiAction, WaitOptions,
};
use tracing::debug;

use crate::error::E2eResult;

/// Fields read from the token summary line.
pub const AVAILABLE: &str = "available";
pub const SELECTED_STORIES: &str = "selected_stories";
pub const SELECTED_TOKENS: &str = "selected_tokens";
pub const REMAINING: &str = "remaining";

/// Patterns for "Available Tokens: 300 | Selected: 2 (10 tokens) | Remaining: 290".
pub fn token_patterns() -> pagesync_common::Result<PatternTable> {
    PatternTable::new()
        .field(AVAILABLE, r"(?i)available tokens:\s*(\d+)")?
        .field(SELECTED_STORIES, r"(?i)selected:\s*(\d+)")?
        .field(SELECTED_TOKENS, r"(?i)\((\d+)\s*tokens?\)")?
        .field(REMAINING, r"(?i)remaining:\s*(\d+)")
}

pub struct AiStoriesPanel<'a, D: ?Sized> {
    driver: &'a D,
    wait: WaitOptions,
}

impl<'a, D: Driver + ?Sized> AiStoriesPanel<'a, D> {
    pub fn new(driver: &'a D, wait: WaitOptions) -> Self {
        Self { driver, wait }
    }

    // Scoped to <main> so the navbar never collides with panel matches.
    fn in_main(inner: Descriptor) -> Descriptor {
        inner.within(Descriptor::css("main"))
    }

    pub fn preview_heading() -> Descriptor {
        Descriptor::role_named("heading", TextMatch::iregex("ai generated user stories")).first()
    }

    pub fn review_heading() -> Descriptor {
        Descriptor::role_named("heading", TextMatch::iregex("review and select user stories"))
            .first()
    }

    pub fn checkboxes() -> Descriptor {
        Self::in_main(Descriptor::css("input[type=\"checkbox\"]"))
    }

    pub fn result_items() -> Descriptor {
        Self::in_main(Descriptor::Role {
            role: "heading".to_string(),
            name: Some(TextMatch::regex(".{3,}")),
            level: Some(3),
        })
    }

    pub fn token_summary() -> Descriptor {
        Self::in_main(Descriptor::text(TextMatch::iregex(r"available tokens:\s*\d+"))).first()
    }

    pub fn cost_line() -> Descriptor {
        Self::in_main(Descriptor::text(TextMatch::iregex(
            r"each user story costs\s*\d+\s*tokens",
        )))
        .first()
    }

    pub fn empty_state() -> Descriptor {
        Self::in_main(Descriptor::text(TextMatch::iregex(
            "no (user )?stories|nothing to show|empty",
        )))
        .first()
    }

    pub fn loader() -> Descriptor {
        Self::in_main(
            Descriptor::text(TextMatch::iregex("generating|loading|please wait")).or(
                Descriptor::css("[aria-busy=\"true\"], [data-loading=\"true\"], .spinner, .loading"),
            ),
        )
        .first()
    }

    pub fn select_all_button() -> Descriptor {
        Self::in_main(Descriptor::role_named(
            "button",
            TextMatch::iregex("select all available"),
        ))
    }

    pub fn deselect_all_button() -> Descriptor {
        Self::in_main(Descriptor::role_named("button", TextMatch::iregex("deselect all")))
    }

    pub fn save_button() -> Descriptor {
        Self::in_main(Descriptor::role_named("button", TextMatch::iregex("save")))
    }

    pub fn back_link() -> Descriptor {
        Descriptor::role_named("link", TextMatch::iregex("cancel|back to epic")).first()
    }

    /// Wait until the panel shows meaningful content.
    ///
    /// Returns the content state that matched last.
    pub async fn wait_for_shown(&self) -> E2eResult<ProbeMatch> {
        let d = self.driver;
        let shell = [
            StateProbe::visible(d, Self::preview_heading()),
            StateProbe::visible(d, Self::review_heading()),
            StateProbe::visible(d, Self::token_summary()),
        ];
        let shown = wait_for_any_state(&shell, &self.wait).await?;
        debug!(state = %shown.name, elapsed = ?shown.elapsed, "AI panel shell rendered");

        // A loader is optional and may never leave; content is checked regardless.
        if d.is_visible(&Self::loader()).await {
            if let Err(e) = wait_until(StateProbe::hidden(d, Self::loader()), &self.wait).await {
                debug!(error = %e, "loader still visible, continuing");
            }
        }

        let content = [
            StateProbe::visible(d, Self::checkboxes().first()),
            StateProbe::visible(d, Self::result_items().first()),
            StateProbe::visible(d, Self::empty_state()),
            StateProbe::visible(d, Self::cost_line()),
        ];
        Ok(wait_for_any_state(&content, &self.wait).await?)
    }

    pub async fn has_selectable_items(&self) -> E2eResult<bool> {
        if self.driver.count(&Self::checkboxes()).await? == 0 {
            return Ok(false);
        }
        Ok(self.driver.is_visible(&Self::checkboxes().first()).await)
    }

    /// Tick up to `n` stories; returns how many were ticked.
    pub async fn select_first_n(&self, n: usize) -> E2eResult<usize> {
        self.wait_for_shown().await?;
        let total = self.driver.count(&Self::checkboxes()).await?;
        let take = n.min(total);
        for i in 0..take {
            let checkbox = Self::checkboxes().nth(i);
            self.driver
                .perform(&checkbox, &UiAction::ScrollIntoView)
                .await?;
            attempt_with_fallback(vec![
                ActionAttempt::perform(self.driver, checkbox.clone(), UiAction::Check { force: true }),
                ActionAttempt::perform(self.driver, checkbox, UiAction::force_click()),
            ])
            .await?;
        }
        Ok(take)
    }

    /// Wait for the summary line to report `n` selected stories.
    pub async fn wait_for_selected(&self, n: usize) -> E2eResult<()> {
        let settled = StateProbe::text_matches(
            self.driver,
            Self::token_summary(),
            TextMatch::iregex(format!(r"selected:\s*{}\b", n)),
        );
        wait_until(settled, &self.wait).await?;
        Ok(())
    }

    /// Clear every selection, by the bulk button when the page offers one.
    pub async fn deselect_all(&self) -> E2eResult<()> {
        self.wait_for_shown().await?;
        if self.driver.is_visible(&Self::deselect_all_button()).await {
            self.driver
                .perform(&Self::deselect_all_button(), &UiAction::click())
                .await?;
            return Ok(());
        }

        let total = self.driver.count(&Self::checkboxes()).await?;
        for i in 0..total {
            let checkbox = Self::checkboxes().nth(i);
            if !self.driver.is_checked(&checkbox).await.unwrap_or(false) {
                continue;
            }
            attempt_with_fallback(vec![
                ActionAttempt::perform(self.driver, checkbox.clone(), UiAction::Uncheck { force: true }),
                ActionAttempt::perform(self.driver, checkbox, UiAction::force_click()),
            ])
            .await?;
        }
        Ok(())
    }

    /// Read the token summary line through [`token_patterns`].
    pub async fn read_token_numbers(&self) -> E2eResult<ExtractionResult> {
        self.wait_for_shown().await?;
        let text = self.driver.read_text(&Self::token_summary()).await?;
        Ok(extract_fields(&text, &token_patterns()?))
    }

    /// Click save if present; returns whether it was clicked.
    pub async fn click_save_if_present(&self) -> E2eResult<bool> {
        self.wait_for_shown().await?;
        if !self.driver.is_visible(&Self::save_button()).await {
            return Ok(false);
        }
        self.driver
            .perform(&Self::save_button(), &UiAction::click())
            .await?;
        Ok(true)
    }

    pub async fn back_to_epic(&self) -> E2eResult<bool> {
        if !self.driver.is_visible(&Self::back_link()).await {
            return Ok(false);
        }
        self.driver.perform(&Self::back_link(), &UiAction::click()).await?;
        Ok(true)
    }
}
