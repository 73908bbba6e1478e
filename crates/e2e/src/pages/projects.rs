//! Tracker projects list and the create-project form

use pagesync_common::{
    attempt_with_fallback, wait_for_any_state, wait_until, ActionAttempt, Descriptor, Driver,
    StateProbe, TextMatch, UiAction, WaitOptions,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::E2eResult;

/// Values for the create-project form; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectForm {
    pub name: Option<String>,
    pub description: Option<String>,
    /// Status option label, e.g. "Active"
    pub status: Option<String>,
}

pub struct ProjectsPage<'a, D: ?Sized> {
    driver: &'a D,
    wait: WaitOptions,
}

impl<'a, D: Driver + ?Sized> ProjectsPage<'a, D> {
    pub fn new(driver: &'a D, wait: WaitOptions) -> Self {
        Self { driver, wait }
    }

    pub fn nav_link() -> Descriptor {
        Descriptor::role_named("link", TextMatch::iregex("^projects$"))
    }

    /// The projects list route, without the create form.
    pub fn list_url() -> TextMatch {
        TextMatch::iregex(r"/projects/?(\?.*)?$")
    }

    pub fn create_action() -> Descriptor {
        let name = TextMatch::iregex("create new project|new project|create project");
        Descriptor::role_named("button", name.clone())
            .or(Descriptor::role_named("link", name))
            .first()
    }

    pub fn create_heading() -> Descriptor {
        Descriptor::role_named("heading", TextMatch::iregex("create new project|create project"))
    }

    pub fn name_input() -> Descriptor {
        Descriptor::role_named("textbox", TextMatch::iregex("project name"))
    }

    pub fn description_input() -> Descriptor {
        Descriptor::role_named("textbox", TextMatch::iregex("^description$"))
    }

    pub fn status_select() -> Descriptor {
        Descriptor::role_named("combobox", TextMatch::iregex("status"))
    }

    pub fn create_button() -> Descriptor {
        Descriptor::role_named("button", TextMatch::iregex("^create project$"))
    }

    pub fn cancel_link() -> Descriptor {
        Descriptor::role_named("link", TextMatch::iregex("^cancel$"))
    }

    /// Validation text, or the name input flagged invalid.
    pub fn name_required_error() -> Descriptor {
        Descriptor::text(TextMatch::iregex(
            "name.*required|field is required|can't be blank|required",
        ))
        .or(Descriptor::css("input[aria-invalid=\"true\"]"))
        .first()
    }

    pub fn project_in_list(name: &str) -> Descriptor {
        Descriptor::text(TextMatch::contains(name))
            .within(Descriptor::css("main"))
            .first()
    }

    pub async fn goto_projects(&self) -> E2eResult<()> {
        self.driver.perform(&Self::nav_link(), &UiAction::click()).await?;
        self.driver
            .wait_for_url(&TextMatch::iregex("/projects"), self.wait.timeout)
            .await?;
        Ok(())
    }

    pub async fn open_create_project(&self) -> E2eResult<()> {
        self.goto_projects().await?;
        let action = Self::create_action();
        wait_until(StateProbe::visible(self.driver, action.clone()), &self.wait).await?;
        attempt_with_fallback(vec![
            ActionAttempt::perform(self.driver, action.clone(), UiAction::click()),
            ActionAttempt::perform(self.driver, action, UiAction::force_click()),
        ])
        .await?;
        wait_until(StateProbe::visible(self.driver, Self::create_heading()), &self.wait).await?;
        Ok(())
    }

    pub async fn fill_create_project_form(&self, form: &ProjectForm) -> E2eResult<()> {
        if let Some(name) = &form.name {
            self.driver
                .perform(&Self::name_input(), &UiAction::fill(name.as_str()))
                .await?;
        }
        if let Some(description) = &form.description {
            self.driver
                .perform(&Self::description_input(), &UiAction::fill(description.as_str()))
                .await?;
        }
        if let Some(status) = &form.status {
            self.driver
                .perform(
                    &Self::status_select(),
                    &UiAction::SelectOption {
                        value: status.clone(),
                    },
                )
                .await?;
        }
        Ok(())
    }

    /// Submit the form. `true` when the app returned to the list, `false`
    /// when it stayed on the form with a validation error.
    pub async fn submit_create_project(&self) -> E2eResult<bool> {
        self.driver
            .perform(&Self::create_button(), &UiAction::click())
            .await?;
        let outcomes = [
            StateProbe::url_matches(self.driver, Self::list_url()),
            StateProbe::visible(self.driver, Self::name_required_error()),
        ];
        let matched = wait_for_any_state(&outcomes, &self.wait).await?;
        info!(outcome = %matched.name, "project form submitted");
        Ok(matched.index == 0)
    }

    pub async fn cancel_create_project(&self) -> E2eResult<()> {
        self.driver
            .perform(&Self::cancel_link(), &UiAction::click())
            .await?;
        self.driver
            .wait_for_url(&Self::list_url(), self.wait.timeout)
            .await?;
        Ok(())
    }

    async fn ensure_on_list(&self) -> E2eResult<()> {
        let url = self.driver.current_url().await?;
        if !TextMatch::iregex("/projects").is_match(&url) {
            self.goto_projects().await?;
        }
        Ok(())
    }

    pub async fn expect_project_in_list(&self, name: &str) -> E2eResult<()> {
        self.ensure_on_list().await?;
        wait_until(
            StateProbe::visible(self.driver, Self::project_in_list(name)),
            &self.wait,
        )
        .await?;
        Ok(())
    }

    pub async fn expect_project_not_in_list(&self, name: &str) -> E2eResult<()> {
        self.ensure_on_list().await?;
        let project = Self::project_in_list(name);
        let driver = self.driver;
        let absent = StateProbe::new(format!("no {}", project), move || {
            let project = project.clone();
            async move { Ok(driver.count(&project).await? == 0) }
        });
        wait_until(absent, &self.wait).await?;
        Ok(())
    }

    pub async fn expect_name_required_error(&self) -> E2eResult<()> {
        wait_until(
            StateProbe::visible(self.driver, Self::name_required_error()),
            &self.wait,
        )
        .await?;
        Ok(())
    }
}
