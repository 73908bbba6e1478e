//! Manual user story form

use pagesync_common::{
    wait_for_any_state, wait_until, Descriptor, Driver, StateProbe, TextMatch, UiAction,
    WaitOptions,
};
use serde::{Deserialize, Serialize};

use crate::error::E2eResult;

/// Fields of a manually written story; `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualStory {
    pub title: Option<String>,
    pub as_a: Option<String>,
    pub i_want: Option<String>,
    pub so_that: Option<String>,
}

pub struct UserStoryCreatePage<'a, D: ?Sized> {
    driver: &'a D,
    wait: WaitOptions,
}

/// Label, then placeholder, then a name-attribute CSS match.
fn form_field(label: &str, placeholder: &str, css: &str) -> Descriptor {
    Descriptor::label(TextMatch::iregex(label))
        .or(Descriptor::placeholder(TextMatch::iregex(placeholder)))
        .or(Descriptor::css(css))
        .first()
}

impl<'a, D: Driver + ?Sized> UserStoryCreatePage<'a, D> {
    pub fn new(driver: &'a D, wait: WaitOptions) -> Self {
        Self { driver, wait }
    }

    pub fn heading() -> Descriptor {
        Descriptor::role_named(
            "heading",
            TextMatch::iregex("create user stor(y|ies)|user stor(y|ies) create"),
        )
        .first()
    }

    pub fn title_field() -> Descriptor {
        form_field(
            "title",
            "title",
            "input[name*=\"title\" i], textarea[name*=\"title\" i], #title",
        )
    }

    pub fn as_a_field() -> Descriptor {
        form_field("^as a$", "as a", "textarea[name*=\"as\" i], input[name*=\"as\" i]")
    }

    pub fn i_want_field() -> Descriptor {
        form_field(
            "i want",
            "i want",
            "textarea[name*=\"want\" i], input[name*=\"want\" i]",
        )
    }

    pub fn so_that_field() -> Descriptor {
        form_field("so that", "so that", "textarea[name*=\"so\" i], input[name*=\"so\" i]")
    }

    pub fn submit_button() -> Descriptor {
        Descriptor::role_named("button", TextMatch::iregex("create user stor(y|ies)|save|create"))
            .first()
    }

    pub fn cancel_button() -> Descriptor {
        Descriptor::role_named("button", TextMatch::iregex("^cancel$"))
            .or(Descriptor::role_named("link", TextMatch::iregex("^cancel$")))
            .first()
    }

    pub fn required_message() -> Descriptor {
        Descriptor::text(TextMatch::iregex("required|can't be blank|please fill")).first()
    }

    /// Wait for the create route, then for the title field.
    ///
    /// Some deployments omit the heading, so heading or title is enough to
    /// consider the page rendered; the title field is required either way.
    pub async fn wait_for_loaded(&self) -> E2eResult<()> {
        self.driver
            .wait_for_url(&TextMatch::iregex("user-stories/create"), self.wait.timeout)
            .await?;
        let rendered = [
            StateProbe::visible(self.driver, Self::heading()),
            StateProbe::visible(self.driver, Self::title_field()),
        ];
        wait_for_any_state(&rendered, &self.wait).await?;
        wait_until(StateProbe::visible(self.driver, Self::title_field()), &self.wait).await?;
        Ok(())
    }

    pub async fn fill_manual_form(&self, story: &ManualStory) -> E2eResult<()> {
        let fields = [
            (Self::title_field(), &story.title),
            (Self::as_a_field(), &story.as_a),
            (Self::i_want_field(), &story.i_want),
            (Self::so_that_field(), &story.so_that),
        ];
        for (field, value) in fields {
            if let Some(value) = value {
                self.driver.perform(&field, &UiAction::fill(value.as_str())).await?;
            }
        }
        Ok(())
    }

    pub async fn submit(&self) -> E2eResult<()> {
        self.driver
            .perform(&Self::submit_button(), &UiAction::click())
            .await?;
        Ok(())
    }

    /// Leave the form without saving and wait to be off the create route.
    pub async fn cancel(&self) -> E2eResult<()> {
        self.driver
            .perform(&Self::cancel_button(), &UiAction::click())
            .await?;
        let driver = self.driver;
        let left = StateProbe::new("left user-stories/create", move || async move {
            let url = driver.current_url().await?;
            Ok(!TextMatch::iregex("user-stories/create").is_match(&url))
        });
        wait_until(left, &self.wait).await?;
        Ok(())
    }

    /// Wait for the form's required-field validation to show.
    pub async fn wait_for_required_validation(&self) -> E2eResult<()> {
        wait_until(
            StateProbe::visible(self.driver, Self::required_message()),
            &self.wait,
        )
        .await?;
        Ok(())
    }
}
