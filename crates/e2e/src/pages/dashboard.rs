//! Tracker dashboard and its user menu

use pagesync_common::{wait_until, Descriptor, Driver, StateProbe, TextMatch, UiAction, WaitOptions};

use crate::error::E2eResult;

pub struct DashboardPage<'a, D: ?Sized> {
    driver: &'a D,
    wait: WaitOptions,
}

impl<'a, D: Driver + ?Sized> DashboardPage<'a, D> {
    pub fn new(driver: &'a D, wait: WaitOptions) -> Self {
        Self { driver, wait }
    }

    /// The avatar button in the top navigation.
    pub fn user_menu_button() -> Descriptor {
        Descriptor::css("button:has(img[alt])")
            .within(Descriptor::css("nav"))
            .first()
    }

    pub fn profile_link() -> Descriptor {
        Descriptor::role_named("link", TextMatch::iregex("^profile$"))
    }

    pub fn logout_button() -> Descriptor {
        Descriptor::role_named("button", TextMatch::iregex("^log out$"))
            .or(Descriptor::role_named("link", TextMatch::iregex("^log out$")))
            .first()
    }

    pub async fn wait_for_loaded(&self) -> E2eResult<()> {
        self.driver
            .wait_for_url(&TextMatch::regex("/dashboard"), self.wait.timeout)
            .await?;
        Ok(())
    }

    /// Open the user menu and wait for its entries.
    pub async fn open_user_menu(&self) -> E2eResult<()> {
        self.driver
            .perform(&Self::user_menu_button(), &UiAction::click())
            .await?;
        wait_until(StateProbe::visible(self.driver, Self::logout_button()), &self.wait).await?;
        Ok(())
    }

    pub async fn go_to_profile(&self) -> E2eResult<()> {
        self.open_user_menu().await?;
        self.driver
            .perform(&Self::profile_link(), &UiAction::click())
            .await?;
        self.driver
            .wait_for_url(&TextMatch::iregex("/profile"), self.wait.timeout)
            .await?;
        Ok(())
    }

    /// Log out and wait to land on the login or landing route.
    pub async fn logout(&self) -> E2eResult<()> {
        self.open_user_menu().await?;
        self.driver
            .perform(&Self::logout_button(), &UiAction::click())
            .await?;
        let driver = self.driver;
        let signed_out = StateProbe::new("signed out", move || async move {
            let url = driver.current_url().await?;
            Ok(!TextMatch::regex("/dashboard").is_match(&url))
        });
        wait_until(signed_out, &self.wait).await?;
        Ok(())
    }
}
