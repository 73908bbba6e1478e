//! Demo storefront: login, inventory and cart

use pagesync_common::{wait_until, Descriptor, Driver, StateProbe, TextMatch, UiAction, WaitOptions};

use crate::error::{E2eError, E2eResult};
use crate::pages::{join_url, read_all_texts};

/// Product name as used in `data-test` ids: lowercase, whitespace to dashes.
pub fn product_slug(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

/// Price label such as `$29.99`.
pub fn parse_price(label: &str) -> Option<f64> {
    label.trim().trim_start_matches('$').trim().parse().ok()
}

fn data_test(id: &str) -> Descriptor {
    Descriptor::css(format!("[data-test=\"{}\"]", id))
}

pub struct LoginPage<'a, D: ?Sized> {
    driver: &'a D,
    base_url: String,
    wait: WaitOptions,
}

impl<'a, D: Driver + ?Sized> LoginPage<'a, D> {
    pub fn new(driver: &'a D, base_url: impl Into<String>, wait: WaitOptions) -> Self {
        Self {
            driver,
            base_url: base_url.into(),
            wait,
        }
    }

    pub fn username() -> Descriptor {
        Descriptor::css("#user-name")
    }

    pub fn password() -> Descriptor {
        Descriptor::css("#password")
    }

    pub fn submit() -> Descriptor {
        Descriptor::css("#login-button")
    }

    pub fn error_banner() -> Descriptor {
        data_test("error")
    }

    pub async fn open(&self) -> E2eResult<()> {
        self.driver.goto(&join_url(&self.base_url, "/")).await?;
        wait_until(StateProbe::visible(self.driver, Self::username()), &self.wait).await?;
        Ok(())
    }

    pub async fn login(&self, username: &str, password: &str) -> E2eResult<()> {
        self.driver
            .perform(&Self::username(), &UiAction::fill(username))
            .await?;
        self.driver
            .perform(&Self::password(), &UiAction::fill(password))
            .await?;
        self.driver.perform(&Self::submit(), &UiAction::click()).await?;
        Ok(())
    }

    /// The login error banner text, if one is shown.
    pub async fn error_message(&self) -> E2eResult<Option<String>> {
        if !self.driver.is_visible(&Self::error_banner()).await {
            return Ok(None);
        }
        let text = self.driver.read_text(&Self::error_banner()).await?;
        Ok(Some(text.trim().to_string()))
    }

    /// Clear both credential fields.
    pub async fn clear(&self) -> E2eResult<()> {
        self.driver.perform(&Self::username(), &UiAction::fill("")).await?;
        self.driver.perform(&Self::password(), &UiAction::fill("")).await?;
        Ok(())
    }
}

/// Sort options of the inventory dropdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    NameAsc,
    NameDesc,
    PriceLowHigh,
    PriceHighLow,
}

impl SortOrder {
    pub fn value(&self) -> &'static str {
        match self {
            SortOrder::NameAsc => "az",
            SortOrder::NameDesc => "za",
            SortOrder::PriceLowHigh => "lohi",
            SortOrder::PriceHighLow => "hilo",
        }
    }
}

pub struct InventoryPage<'a, D: ?Sized> {
    driver: &'a D,
    wait: WaitOptions,
}

impl<'a, D: Driver + ?Sized> InventoryPage<'a, D> {
    pub fn new(driver: &'a D, wait: WaitOptions) -> Self {
        Self { driver, wait }
    }

    pub fn title() -> Descriptor {
        Descriptor::css(".title")
    }

    pub fn items() -> Descriptor {
        Descriptor::css(".inventory_item")
    }

    pub fn item_names() -> Descriptor {
        Descriptor::css(".inventory_item_name")
    }

    pub fn item_prices() -> Descriptor {
        Descriptor::css(".inventory_item_price")
    }

    pub fn product_link(product: &str) -> Descriptor {
        Descriptor::css(format!(".inventory_item_name:has-text(\"{}\")", product))
    }

    pub fn cart_badge() -> Descriptor {
        Descriptor::css(".shopping_cart_badge")
    }

    pub fn cart_link() -> Descriptor {
        Descriptor::css(".shopping_cart_link")
    }

    pub fn sort_dropdown() -> Descriptor {
        data_test("product-sort-container")
    }

    pub fn add_button(product: &str) -> Descriptor {
        data_test(&format!("add-to-cart-{}", product_slug(product)))
    }

    pub fn remove_button(product: &str) -> Descriptor {
        data_test(&format!("remove-{}", product_slug(product)))
    }

    /// Wait for the inventory route and its "Products" title.
    pub async fn wait_for_loaded(&self) -> E2eResult<()> {
        self.driver
            .wait_for_url(&TextMatch::regex(r"/inventory"), self.wait.timeout)
            .await?;
        wait_until(
            StateProbe::text_matches(self.driver, Self::title(), TextMatch::exact("Products")),
            &self.wait,
        )
        .await?;
        Ok(())
    }

    pub async fn product_count(&self) -> E2eResult<usize> {
        Ok(self.driver.count(&Self::items()).await?)
    }

    /// Product names in display order.
    pub async fn product_names(&self) -> E2eResult<Vec<String>> {
        Ok(read_all_texts(self.driver, &Self::item_names()).await?)
    }

    /// Product prices in display order.
    pub async fn product_prices(&self) -> E2eResult<Vec<f64>> {
        read_all_texts(self.driver, &Self::item_prices())
            .await?
            .into_iter()
            .map(|label| {
                parse_price(&label).ok_or_else(|| {
                    E2eError::AssertionFailed(format!("price label is not a number: '{}'", label))
                })
            })
            .collect()
    }

    /// Open the detail page of `product`.
    pub async fn click_product(&self, product: &str) -> E2eResult<()> {
        self.driver
            .perform(&Self::product_link(product), &UiAction::click())
            .await?;
        self.driver
            .wait_for_url(&TextMatch::regex(r"/inventory-item"), self.wait.timeout)
            .await?;
        Ok(())
    }

    pub async fn add_to_cart(&self, product: &str) -> E2eResult<()> {
        self.driver
            .perform(&Self::add_button(product), &UiAction::click())
            .await?;
        Ok(())
    }

    pub async fn remove_from_cart(&self, product: &str) -> E2eResult<()> {
        self.driver
            .perform(&Self::remove_button(product), &UiAction::click())
            .await?;
        Ok(())
    }

    /// Number shown on the cart badge; an absent badge means an empty cart.
    pub async fn cart_count(&self) -> E2eResult<u32> {
        if !self.driver.is_visible(&Self::cart_badge()).await {
            return Ok(0);
        }
        let text = self.driver.read_text(&Self::cart_badge()).await?;
        text.trim()
            .parse()
            .map_err(|_| E2eError::AssertionFailed(format!("cart badge is not a number: '{}'", text)))
    }

    pub async fn sort(&self, order: SortOrder) -> E2eResult<()> {
        self.driver
            .perform(
                &Self::sort_dropdown(),
                &UiAction::SelectOption {
                    value: order.value().to_string(),
                },
            )
            .await?;
        Ok(())
    }

    pub async fn open_cart(&self) -> E2eResult<()> {
        self.driver.perform(&Self::cart_link(), &UiAction::click()).await?;
        self.driver
            .wait_for_url(&TextMatch::regex(r"/cart"), self.wait.timeout)
            .await?;
        Ok(())
    }
}

pub struct CartPage<'a, D: ?Sized> {
    driver: &'a D,
}

impl<'a, D: Driver + ?Sized> CartPage<'a, D> {
    pub fn new(driver: &'a D) -> Self {
        Self { driver }
    }

    pub fn items() -> Descriptor {
        Descriptor::css(".cart_item")
    }

    pub fn checkout() -> Descriptor {
        data_test("checkout")
    }

    pub fn continue_shopping() -> Descriptor {
        data_test("continue-shopping")
    }

    pub async fn item_count(&self) -> E2eResult<usize> {
        Ok(self.driver.count(&Self::items()).await?)
    }

    /// Names of the products in the cart.
    pub async fn item_names(&self) -> E2eResult<Vec<String>> {
        Ok(read_all_texts(self.driver, &InventoryPage::<D>::item_names()).await?)
    }

    pub async fn is_empty(&self) -> E2eResult<bool> {
        Ok(self.item_count().await? == 0)
    }

    pub async fn remove(&self, product: &str) -> E2eResult<()> {
        self.driver
            .perform(&InventoryPage::<D>::remove_button(product), &UiAction::click())
            .await?;
        Ok(())
    }

    pub async fn proceed_to_checkout(&self) -> E2eResult<()> {
        self.driver.perform(&Self::checkout(), &UiAction::click()).await?;
        Ok(())
    }

    pub async fn continue_shopping_now(&self) -> E2eResult<()> {
        self.driver
            .perform(&Self::continue_shopping(), &UiAction::click())
            .await?;
        Ok(())
    }
}
