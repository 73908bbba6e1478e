//! Tracker login

use pagesync_common::{
    attempt_with_fallback, wait_until, ActionAttempt, Descriptor, Driver, StateProbe, TextMatch,
    UiAction, WaitOptions,
};

use crate::error::E2eResult;
use crate::pages::join_url;

pub struct TrackerLoginPage<'a, D: ?Sized> {
    driver: &'a D,
    base_url: String,
    wait: WaitOptions,
}

impl<'a, D: Driver + ?Sized> TrackerLoginPage<'a, D> {
    pub fn new(driver: &'a D, base_url: impl Into<String>, wait: WaitOptions) -> Self {
        Self {
            driver,
            base_url: base_url.into(),
            wait,
        }
    }

    pub fn login_link() -> Descriptor {
        Descriptor::role_named("link", TextMatch::iregex("log in"))
    }

    pub fn email() -> Descriptor {
        Descriptor::css("input[type=\"email\"]")
    }

    pub fn password() -> Descriptor {
        Descriptor::css("input[type=\"password\"]")
    }

    pub fn submit() -> Descriptor {
        Descriptor::role_named("button", TextMatch::iregex("login|sign in"))
    }

    /// Open the landing page and follow its "Log in" link.
    ///
    /// Falls back to the `/login` route when the link cannot be clicked.
    pub async fn open(&self) -> E2eResult<()> {
        self.driver.goto(&join_url(&self.base_url, "/")).await?;
        let driver = self.driver;
        let login_url = join_url(&self.base_url, "/login");
        attempt_with_fallback(vec![
            ActionAttempt::perform(driver, Self::login_link(), UiAction::click()),
            ActionAttempt::new(format!("goto {}", login_url), move || async move {
                driver.goto(&login_url).await
            }),
        ])
        .await?;
        wait_until(StateProbe::visible(self.driver, Self::email()), &self.wait).await?;
        Ok(())
    }

    pub async fn login(&self, email: &str, password: &str) -> E2eResult<()> {
        self.driver.perform(&Self::email(), &UiAction::fill(email)).await?;
        self.driver
            .perform(&Self::password(), &UiAction::fill(password))
            .await?;
        self.driver.perform(&Self::submit(), &UiAction::click()).await?;
        Ok(())
    }

    /// Log in and wait to land on the dashboard.
    pub async fn login_to_dashboard(&self, email: &str, password: &str) -> E2eResult<()> {
        self.login(email, password).await?;
        self.driver
            .wait_for_url(&TextMatch::iregex("/dashboard"), self.wait.timeout)
            .await?;
        Ok(())
    }
}
