//! Epic list and create-epic form, manual or AI assisted

use pagesync_common::{
    attempt_with_fallback, wait_until, ActionAttempt, Descriptor, Driver, StateProbe, TextMatch,
    UiAction, WaitOptions,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::E2eResult;

/// A manually written epic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpicForm {
    pub title: String,
    pub description: String,
    pub priority: Option<String>,
}

pub struct EpicsPage<'a, D: ?Sized> {
    driver: &'a D,
    wait: WaitOptions,
}

impl<'a, D: Driver + ?Sized> EpicsPage<'a, D> {
    pub fn new(driver: &'a D, wait: WaitOptions) -> Self {
        Self { driver, wait }
    }

    pub fn list_heading() -> Descriptor {
        Descriptor::role_named("heading", TextMatch::iregex("^epics$"))
    }

    pub fn create_action() -> Descriptor {
        let name = TextMatch::iregex("create new epic");
        Descriptor::role_named("link", name.clone())
            .or(Descriptor::role_named("button", name))
            .first()
    }

    pub fn create_button() -> Descriptor {
        Descriptor::role_named("button", TextMatch::iregex("^create epic$"))
    }

    pub fn cancel_action() -> Descriptor {
        let name = TextMatch::iregex("^cancel$");
        Descriptor::role_named("link", name.clone())
            .or(Descriptor::role_named("button", name))
            .first()
    }

    /// Checkbox or switch that turns on AI generation.
    pub fn ai_toggle() -> Descriptor {
        let name = TextMatch::iregex(r"\bai\b");
        Descriptor::role_named("checkbox", name.clone())
            .or(Descriptor::role_named("switch", name))
            .first()
    }

    pub fn title_input() -> Descriptor {
        Descriptor::role_named("textbox", TextMatch::iregex("epic title"))
    }

    pub fn description_input() -> Descriptor {
        Descriptor::role_named("textbox", TextMatch::iregex("description"))
    }

    pub fn priority_select() -> Descriptor {
        Descriptor::role_named("combobox", TextMatch::iregex("priority"))
    }

    pub fn edit_epic_link() -> Descriptor {
        Descriptor::role_named("link", TextMatch::iregex("edit epic"))
    }

    pub fn project_details_heading() -> Descriptor {
        Descriptor::role_named("heading", TextMatch::iregex("project details"))
    }

    async fn expect_visible(&self, target: Descriptor) -> E2eResult<()> {
        wait_until(StateProbe::visible(self.driver, target), &self.wait).await?;
        Ok(())
    }

    pub async fn expect_on_epic_list(&self) -> E2eResult<()> {
        self.expect_visible(Self::list_heading()).await
    }

    pub async fn expect_on_create_epic_page(&self) -> E2eResult<()> {
        self.expect_visible(Self::create_button()).await
    }

    pub async fn expect_on_epic_details_page(&self) -> E2eResult<()> {
        self.expect_visible(Self::edit_epic_link()).await
    }

    pub async fn expect_on_project_details_page(&self) -> E2eResult<()> {
        self.expect_visible(Self::project_details_heading()).await
    }

    pub async fn open_create_epic(&self) -> E2eResult<()> {
        self.expect_on_epic_list().await?;
        self.driver
            .perform(&Self::create_action(), &UiAction::click())
            .await?;
        self.expect_on_create_epic_page().await
    }

    /// Put the AI toggle in the wanted state. Forms without a toggle are
    /// left alone.
    pub async fn set_ai(&self, enabled: bool) -> E2eResult<()> {
        let toggle = Self::ai_toggle();
        if self.driver.count(&toggle).await? == 0 {
            debug!("create-epic form has no AI toggle");
            return Ok(());
        }
        if self.driver.is_checked(&toggle).await? == enabled {
            return Ok(());
        }
        attempt_with_fallback(vec![
            ActionAttempt::perform(self.driver, toggle.clone(), UiAction::click()),
            ActionAttempt::perform(self.driver, toggle, UiAction::force_click()),
        ])
        .await?;
        Ok(())
    }

    /// Create an epic with AI off and wait for its details page.
    pub async fn create_epic_manually(&self, epic: &EpicForm) -> E2eResult<()> {
        self.set_ai(false).await?;
        self.driver
            .perform(&Self::title_input(), &UiAction::fill(epic.title.as_str()))
            .await?;
        self.driver
            .perform(&Self::description_input(), &UiAction::fill(epic.description.as_str()))
            .await?;
        if let Some(priority) = &epic.priority {
            self.driver
                .perform(
                    &Self::priority_select(),
                    &UiAction::SelectOption {
                        value: priority.clone(),
                    },
                )
                .await?;
        }
        self.driver
            .perform(&Self::create_button(), &UiAction::click())
            .await?;
        self.expect_on_epic_details_page().await
    }

    /// Submit with AI on; the app stays on the create page while it generates.
    pub async fn create_epic_using_ai(&self) -> E2eResult<()> {
        self.set_ai(true).await?;
        self.driver
            .perform(&Self::create_button(), &UiAction::click())
            .await?;
        self.expect_on_create_epic_page().await
    }

    pub async fn cancel_epic_creation(&self) -> E2eResult<()> {
        self.driver
            .perform(&Self::cancel_action(), &UiAction::click())
            .await?;
        self.expect_on_project_details_page().await
    }
}
