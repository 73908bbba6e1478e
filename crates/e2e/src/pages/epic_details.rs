//! Epic details page

use std::time::Duration;

use pagesync_common::{
    attempt_with_fallback, extract_fields, poll_any, wait_for_any_state, wait_until, ActionAttempt,
    Descriptor, Driver, PatternTable, ProbeMatch, StateProbe, TextMatch, UiAction, WaitOptions,
};
use tracing::debug;

use crate::error::E2eResult;
use crate::pages::join_url;

/// How long a delete confirmation may take to appear before it is assumed absent.
const CONFIRM_GRACE: Duration = Duration::from_secs(2);

pub struct EpicDetailsPage<'a, D: ?Sized> {
    driver: &'a D,
    base_url: String,
    wait: WaitOptions,
}

impl<'a, D: Driver + ?Sized> EpicDetailsPage<'a, D> {
    pub fn new(driver: &'a D, base_url: impl Into<String>, wait: WaitOptions) -> Self {
        Self {
            driver,
            base_url: base_url.into(),
            wait,
        }
    }

    pub fn heading() -> Descriptor {
        Descriptor::role_named("heading", TextMatch::iregex("epic details?"))
    }

    pub fn url_pattern() -> TextMatch {
        TextMatch::regex(r"/epics/\d+")
    }

    /// Button or link, whichever the deployment renders.
    pub fn generate_ai_stories() -> Descriptor {
        let name = TextMatch::iregex("generate ai user stor(y|ies)");
        Descriptor::role_named("button", name.clone())
            .or(Descriptor::role_named("link", name))
            .first()
    }

    pub fn create_user_story() -> Descriptor {
        let name = TextMatch::iregex("create user story");
        Descriptor::role_named("button", name.clone())
            .or(Descriptor::role_named("link", name))
            .first()
    }

    pub fn token_balance() -> Descriptor {
        Descriptor::text(TextMatch::iregex(r"tokens?\s*:\s*\d+")).first()
    }

    /// Story title text inside the main content.
    pub fn story_title(title: &str) -> Descriptor {
        Descriptor::text(TextMatch::contains(title))
            .within(Descriptor::css("main"))
            .first()
    }

    /// The row or card holding the story titled `title`.
    pub fn story_row(title: &str) -> Descriptor {
        Descriptor::css("..").within(Self::story_title(title))
    }

    /// Row-scoped button, link or labelled control matching `name`.
    fn row_control(title: &str, name: &str, attribute: &str) -> Descriptor {
        let row = Self::story_row(title);
        Descriptor::role_named("button", TextMatch::iregex(name))
            .within(row.clone())
            .or(Descriptor::role_named("link", TextMatch::iregex(name)).within(row.clone()))
            .or(Descriptor::css(format!(
                "[aria-label*=\"{0}\" i], [title*=\"{0}\" i]",
                attribute
            ))
            .within(row))
    }

    pub fn view_story_button(title: &str) -> Descriptor {
        Self::row_control(title, "view|details", "view")
            .or(Descriptor::css("a:has(svg), button:has(svg)").within(Self::story_row(title)))
            .first()
    }

    pub fn edit_story_button(title: &str) -> Descriptor {
        Self::row_control(title, "edit", "edit").first()
    }

    pub fn delete_story_button(title: &str) -> Descriptor {
        Self::row_control(title, "delete|remove", "delete").first()
    }

    /// Confirmation control of the delete dialog, when the deployment shows one.
    ///
    /// Outside a dialog only unambiguous labels count, so the row's own delete
    /// button is never taken for the confirmation.
    pub fn confirm_button() -> Descriptor {
        Descriptor::role_named("button", TextMatch::iregex("confirm|yes|delete|^ok$"))
            .within(Descriptor::role("dialog"))
            .or(Descriptor::role_named("button", TextMatch::iregex("^(confirm|yes|ok)$")))
            .or(Descriptor::text(TextMatch::iregex("^confirm$")))
            .first()
    }

    pub async fn open(&self, epic_id: u64) -> E2eResult<ProbeMatch> {
        self.driver
            .goto(&join_url(&self.base_url, &format!("/epics/{}", epic_id)))
            .await?;
        self.wait_for_loaded().await
    }

    /// Loaded once the heading shows or the URL settles on an epic route.
    pub async fn wait_for_loaded(&self) -> E2eResult<ProbeMatch> {
        let probes = [
            StateProbe::visible(self.driver, Self::heading()),
            StateProbe::url_matches(self.driver, Self::url_pattern()),
        ];
        Ok(wait_for_any_state(&probes, &self.wait).await?)
    }

    pub async fn open_generate_ai_stories(&self) -> E2eResult<()> {
        self.click_when_visible(Self::generate_ai_stories()).await?;
        Ok(())
    }

    pub async fn open_create_user_story(&self) -> E2eResult<()> {
        let button = Self::create_user_story();
        wait_until(StateProbe::visible(self.driver, button.clone()), &self.wait).await?;
        self.driver.perform(&button, &UiAction::click()).await?;
        self.driver
            .wait_for_url(&TextMatch::iregex("user-stories/create"), self.wait.timeout)
            .await?;
        Ok(())
    }

    /// Wait until a story with `title` is listed on the epic.
    pub async fn wait_for_story(&self, title: &str) -> E2eResult<()> {
        wait_until(StateProbe::visible(self.driver, Self::story_title(title)), &self.wait).await?;
        Ok(())
    }

    /// Wait until no story with `title` is listed.
    pub async fn wait_for_story_gone(&self, title: &str) -> E2eResult<()> {
        let story = Self::story_title(title);
        let driver = self.driver;
        let gone = StateProbe::new(format!("no {}", story), move || {
            let story = story.clone();
            async move { Ok(driver.count(&story).await? == 0) }
        });
        wait_until(gone, &self.wait).await?;
        Ok(())
    }

    async fn click_when_visible(&self, control: Descriptor) -> E2eResult<usize> {
        wait_until(StateProbe::visible(self.driver, control.clone()), &self.wait).await?;
        Ok(attempt_with_fallback(vec![
            ActionAttempt::perform(self.driver, control.clone(), UiAction::click()),
            ActionAttempt::perform(self.driver, control, UiAction::force_click()),
        ])
        .await?)
    }

    pub async fn open_story_view(&self, title: &str) -> E2eResult<()> {
        self.click_when_visible(Self::view_story_button(title)).await?;
        self.driver
            .wait_for_url(&TextMatch::iregex("user-stories|story"), self.wait.timeout)
            .await?;
        Ok(())
    }

    pub async fn open_story_edit(&self, title: &str) -> E2eResult<()> {
        self.click_when_visible(Self::edit_story_button(title)).await?;
        self.driver
            .wait_for_url(&TextMatch::iregex(r"user-stories/\d+/edit|edit"), self.wait.timeout)
            .await?;
        Ok(())
    }

    /// Delete the story, confirming the dialog if one appears, and wait for
    /// the title to leave the list. Returns whether a confirmation was clicked.
    pub async fn delete_story(&self, title: &str) -> E2eResult<bool> {
        self.click_when_visible(Self::delete_story_button(title)).await?;

        let grace = self.wait.with_timeout(CONFIRM_GRACE.min(self.wait.timeout));
        let confirm = [StateProbe::visible(self.driver, Self::confirm_button())];
        let confirmed = poll_any(&confirm, &grace).await?.is_matched();
        if confirmed {
            self.driver
                .perform(&Self::confirm_button(), &UiAction::click())
                .await?;
        } else {
            debug!(title, "no delete confirmation shown");
        }

        self.wait_for_story_gone(title).await?;
        Ok(confirmed)
    }

    /// Token balance shown on the epic, `None` when absent or unreadable.
    pub async fn token_balance_number(&self) -> E2eResult<Option<i64>> {
        let balance = Self::token_balance();
        if !self.driver.is_visible(&balance).await {
            return Ok(None);
        }
        let text = self.driver.read_text(&balance).await?;
        let table = PatternTable::new().field("balance", r"(\d+)")?;
        Ok(extract_fields(&text, &table).get("balance"))
    }
}
