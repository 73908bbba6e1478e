//! Page objects against the scripted page

mod support;

use std::time::Duration;

use pagesync_common::config::TokenConfig;
use pagesync_common::{Descriptor, Driver, TextMatch, UiAction, WaitOptions};
use pagesync_e2e::pages::ai_stories::{AVAILABLE, REMAINING, SELECTED_TOKENS};
use pagesync_e2e::pages::{
    AiStoriesPanel, CartPage, DashboardPage, EpicDetailsPage, EpicForm, EpicsPage, InventoryPage,
    LoginPage, ManualStory, ProjectForm, ProjectsPage, TrackerLoginPage, UserStoryCreatePage,
};
use pagesync_e2e::{generate_and_select, E2eError, TokenPolicy};

use support::{Effect, Element, ScriptedDriver};

const TRACKER: &str = "https://demo.slickfox.com";

type Panel<'a> = AiStoriesPanel<'a, ScriptedDriver>;
type Epic<'a> = EpicDetailsPage<'a, ScriptedDriver>;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn wait() -> WaitOptions {
    WaitOptions::new(Duration::from_secs(5), ms(250))
}

/// Union candidates of a descriptor, looking through `.first()`.
fn candidates(descriptor: Descriptor) -> Vec<Descriptor> {
    match descriptor {
        Descriptor::Nth { inner, .. } => inner.candidates().into_iter().cloned().collect(),
        other => other.candidates().into_iter().cloned().collect(),
    }
}

fn summary(selected: u32, remaining: u32) -> String {
    format!(
        "Available Tokens: 300 | Selected: {} ({} tokens) | Remaining: {}",
        selected,
        selected * 5,
        remaining
    )
}

/// Epic page whose generate button opens a preview with three stories.
fn tracker_with_preview(deduction: u32) -> ScriptedDriver {
    let generate = Descriptor::role_named("button", TextMatch::iregex("generate ai user stor(y|ies)"));
    ScriptedDriver::new(&format!("{}/epics/42", TRACKER))
        .with(generate.clone(), Element::visible("Generate AI User Stories"))
        .with(Panel::preview_heading(), Element::hidden())
        .with(Panel::token_summary(), Element::hidden())
        .with(Panel::checkboxes(), Element::hidden().count(3))
        .with(Panel::checkboxes().nth(0), Element::checkbox().rejecting("check(force)").shown_after(Duration::MAX))
        .with(Panel::checkboxes().nth(1), Element::checkbox().rejecting("check(force)").shown_after(Duration::MAX))
        .with(Panel::checkboxes().nth(2), Element::checkbox().shown_after(Duration::MAX))
        .on(
            generate.clone(),
            Effect::Goto(format!("{}/user-stories/ai/preview", TRACKER)),
        )
        .on(generate.clone(), Effect::Reveal(Panel::preview_heading(), ms(800)))
        .on(generate.clone(), Effect::SetText(Panel::token_summary(), "Available Tokens: 300 | Remaining: 300".into()))
        .on(generate.clone(), Effect::Reveal(Panel::token_summary(), ms(800)))
        .on(generate.clone(), Effect::Reveal(Panel::checkboxes(), ms(1000)))
        .on(generate.clone(), Effect::Reveal(Panel::checkboxes().nth(0), ms(1000)))
        .on(generate.clone(), Effect::Reveal(Panel::checkboxes().nth(1), ms(1000)))
        .on(generate, Effect::Reveal(Panel::checkboxes().nth(2), ms(1000)))
        .on(
            Panel::checkboxes().nth(0),
            Effect::SetText(Panel::token_summary(), summary(1, 300 - deduction)),
        )
        .on(
            Panel::checkboxes().nth(1),
            Effect::SetText(Panel::token_summary(), summary(2, 300 - 2 * deduction)),
        )
}

#[tokio::test(start_paused = true)]
async fn epic_loaded_by_url_before_heading_renders() {
    let page = ScriptedDriver::new(&format!("{}/epics/7", TRACKER))
        .with(EpicDetailsPage::<ScriptedDriver>::heading(), Element::visible("Epic Details").shown_after(ms(900)));
    let epic = EpicDetailsPage::new(&page, TRACKER, wait());

    let loaded = epic.wait_for_loaded().await.unwrap();
    assert_eq!(loaded.index, 1);
    assert_eq!(loaded.elapsed, Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn epic_reads_token_balance() {
    let page = ScriptedDriver::new(TRACKER)
        .with(EpicDetailsPage::<ScriptedDriver>::token_balance(), Element::visible("Tokens: 120"));
    let epic = EpicDetailsPage::new(&page, TRACKER, wait());
    assert_eq!(epic.token_balance_number().await.unwrap(), Some(120));

    let empty = ScriptedDriver::new(TRACKER);
    let epic = EpicDetailsPage::new(&empty, TRACKER, wait());
    assert_eq!(epic.token_balance_number().await.unwrap(), None);
}

#[tokio::test(start_paused = true)]
async fn panel_waits_out_loader_before_content() {
    let page = ScriptedDriver::new(TRACKER)
        .with(Panel::review_heading(), Element::visible("Review and select user stories").shown_after(ms(500)))
        .with(Panel::loader(), Element::visible("Generating...").gone_after(ms(1600)))
        .with(Panel::cost_line(), Element::visible("Each user story costs 5 tokens").shown_after(ms(1700)));
    let panel = AiStoriesPanel::new(&page, wait());
    let start = tokio::time::Instant::now();

    let content = panel.wait_for_shown().await.unwrap();
    assert_eq!(content.index, 3, "cost line is the fourth content state");
    // Loader leaves at 1600ms and is seen gone on the 1750ms poll.
    assert_eq!(start.elapsed(), ms(1750));
    assert!(!panel.has_selectable_items().await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn panel_without_content_times_out() {
    let page = ScriptedDriver::new(TRACKER).with(Panel::preview_heading(), Element::visible("AI Generated User Stories"));
    let panel = AiStoriesPanel::new(&page, WaitOptions::new(ms(600), ms(200)));

    let err = panel.wait_for_shown().await.unwrap_err();
    assert!(matches!(err, E2eError::Sync(e) if e.is_timeout()));
}

#[tokio::test(start_paused = true)]
async fn select_falls_back_to_force_click() {
    let page = tracker_with_preview(5);
    let epic = EpicDetailsPage::new(&page, TRACKER, wait());
    let panel = AiStoriesPanel::new(&page, wait());

    epic.open_generate_ai_stories().await.unwrap();
    assert_eq!(panel.select_first_n(2).await.unwrap(), 2);

    assert!(page.checked(&Panel::checkboxes().nth(0)));
    assert!(page.checked(&Panel::checkboxes().nth(1)));
    assert!(!page.checked(&Panel::checkboxes().nth(2)));

    let clicks: Vec<_> = page
        .performed()
        .into_iter()
        .filter(|(_, action)| *action == UiAction::force_click())
        .map(|(target, _)| target)
        .collect();
    assert_eq!(clicks, vec![Panel::checkboxes().nth(0), Panel::checkboxes().nth(1)]);
}

#[tokio::test(start_paused = true)]
async fn generate_and_select_verifies_deduction() {
    let page = tracker_with_preview(5);
    let epic = EpicDetailsPage::new(&page, TRACKER, wait());
    let panel = AiStoriesPanel::new(&page, wait());
    let policy = TokenPolicy::from(&TokenConfig::default());

    let summary = generate_and_select(&epic, &panel, 2, policy).await.unwrap();
    assert_eq!(summary.available, Some(300));
    assert_eq!(summary.selected_stories, Some(2));
    assert_eq!(summary.selected_tokens, Some(10));
    assert_eq!(summary.remaining, Some(290));

    let url = page.current_url().await.unwrap();
    assert!(url.ends_with("/user-stories/ai/preview"));
}

#[tokio::test(start_paused = true)]
async fn generate_and_select_rejects_wrong_deduction() {
    let page = tracker_with_preview(4);
    let epic = EpicDetailsPage::new(&page, TRACKER, wait());
    let panel = AiStoriesPanel::new(&page, wait());

    let err = generate_and_select(&epic, &panel, 2, TokenPolicy { cost_per_story: 5 })
        .await
        .unwrap_err();
    assert!(matches!(err, E2eError::AssertionFailed(_)), "got {}", err);
}

#[tokio::test(start_paused = true)]
async fn token_numbers_before_selection_leave_cost_unknown() {
    let page = tracker_with_preview(5);
    let epic = EpicDetailsPage::new(&page, TRACKER, wait());
    let panel = AiStoriesPanel::new(&page, wait());

    epic.open_generate_ai_stories().await.unwrap();
    let values = panel.read_token_numbers().await.unwrap();
    assert_eq!(values.get(AVAILABLE), Some(300));
    assert_eq!(values.get(REMAINING), Some(300));
    assert!(values.contains(SELECTED_TOKENS));
    assert!(!values.is_known(SELECTED_TOKENS));
}

#[tokio::test(start_paused = true)]
async fn deselect_all_unchecks_each_box_without_bulk_button() {
    let page = tracker_with_preview(5);
    let epic = EpicDetailsPage::new(&page, TRACKER, wait());
    let panel = AiStoriesPanel::new(&page, wait());

    epic.open_generate_ai_stories().await.unwrap();
    panel.select_first_n(3).await.unwrap();
    panel.deselect_all().await.unwrap();

    for i in 0..3 {
        assert!(!page.checked(&Panel::checkboxes().nth(i)), "box {} still checked", i);
    }
    assert!(!panel.click_save_if_present().await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn story_form_uses_first_present_locator() {
    let title_placeholder = Descriptor::placeholder(TextMatch::iregex("title"));
    let want_label = Descriptor::label(TextMatch::iregex("i want"));
    let page = ScriptedDriver::new(&format!("{}/user-stories/create?epic_id=42", TRACKER))
        .with(title_placeholder.clone(), Element::visible(""))
        .with(want_label.clone(), Element::visible(""));
    let form = UserStoryCreatePage::new(&page, wait());

    form.wait_for_loaded().await.unwrap();
    form.fill_manual_form(&ManualStory {
        title: Some("Export CSV".into()),
        i_want: Some("to export my stories".into()),
        ..Default::default()
    })
    .await
    .unwrap();

    assert_eq!(page.text_of(&title_placeholder).as_deref(), Some("Export CSV"));
    assert_eq!(page.text_of(&want_label).as_deref(), Some("to export my stories"));
    assert_eq!(page.performed().len(), 2, "unset fields are not touched");
}

#[tokio::test(start_paused = true)]
async fn tracker_login_falls_back_to_login_route() {
    let page = ScriptedDriver::new(TRACKER)
        .with(TrackerLoginPage::<ScriptedDriver>::email(), Element::visible(""));
    let login = TrackerLoginPage::new(&page, TRACKER, wait());

    login.open().await.unwrap();
    assert_eq!(page.current_url().await.unwrap(), format!("{}/login", TRACKER));
}

#[tokio::test(start_paused = true)]
async fn storefront_cart_badge_counts_added_products() {
    type Inventory<'a> = InventoryPage<'a, ScriptedDriver>;
    let page = ScriptedDriver::new("https://www.saucedemo.com/")
        .with(LoginPage::<ScriptedDriver>::username(), Element::visible(""))
        .with(LoginPage::<ScriptedDriver>::password(), Element::visible(""))
        .with(LoginPage::<ScriptedDriver>::submit(), Element::visible("Login"))
        .with(Inventory::title(), Element::visible("Products"))
        .with(Inventory::add_button("Sauce Labs Backpack"), Element::visible("Add to cart"))
        .with(Inventory::cart_badge(), Element::hidden())
        .on(
            LoginPage::<ScriptedDriver>::submit(),
            Effect::Goto("https://www.saucedemo.com/inventory.html".into()),
        )
        .on(
            Inventory::add_button("Sauce Labs Backpack"),
            Effect::SetText(Inventory::cart_badge(), "1".into()),
        )
        .on(
            Inventory::add_button("Sauce Labs Backpack"),
            Effect::Reveal(Inventory::cart_badge(), Duration::ZERO),
        );

    let login = LoginPage::new(&page, "https://www.saucedemo.com", wait());
    login.open().await.unwrap();
    login.login("standard_user", "secret_sauce").await.unwrap();
    assert_eq!(login.error_message().await.unwrap(), None);

    let inventory = InventoryPage::new(&page, wait());
    inventory.wait_for_loaded().await.unwrap();
    assert_eq!(inventory.cart_count().await.unwrap(), 0);
    inventory.add_to_cart("Sauce Labs Backpack").await.unwrap();
    assert_eq!(inventory.cart_count().await.unwrap(), 1);
}

#[tokio::test(start_paused = true)]
async fn hidden_button_yields_to_visible_link() {
    let name = TextMatch::iregex("generate ai user stor(y|ies)");
    let button = Descriptor::role_named("button", name.clone());
    let link = Descriptor::role_named("link", name);
    let page = ScriptedDriver::new(&format!("{}/epics/42", TRACKER))
        .with(button, Element::hidden())
        .with(link.clone(), Element::visible("Generate AI User Stories"))
        .on(link, Effect::Goto(format!("{}/user-stories/ai/preview", TRACKER)));
    let epic = EpicDetailsPage::new(&page, TRACKER, wait());

    assert!(page.is_visible(&Epic::generate_ai_stories()).await);
    epic.open_generate_ai_stories().await.unwrap();
    assert_eq!(page.performed(), vec![(Epic::generate_ai_stories(), UiAction::click())]);
    assert!(page.current_url().await.unwrap().ends_with("/user-stories/ai/preview"));
}

#[tokio::test(start_paused = true)]
async fn story_edit_uses_row_link_when_button_hidden() {
    let edit = candidates(Epic::edit_story_button("Export CSV"));
    let page = ScriptedDriver::new(&format!("{}/epics/42", TRACKER))
        .with(edit[0].clone(), Element::hidden())
        .with(edit[1].clone(), Element::visible("Edit"))
        .on(edit[1].clone(), Effect::Goto(format!("{}/user-stories/9/edit", TRACKER)));
    let epic = EpicDetailsPage::new(&page, TRACKER, wait());

    epic.open_story_edit("Export CSV").await.unwrap();
    assert_eq!(page.current_url().await.unwrap(), format!("{}/user-stories/9/edit", TRACKER));
}

#[tokio::test(start_paused = true)]
async fn story_view_falls_back_to_icon_control() {
    let view = candidates(Epic::view_story_button("Export CSV"));
    assert_eq!(view.len(), 4);
    let page = ScriptedDriver::new(&format!("{}/epics/42", TRACKER))
        .with(view[3].clone(), Element::visible(""))
        .on(view[3].clone(), Effect::Goto(format!("{}/user-stories/9", TRACKER)));
    let epic = EpicDetailsPage::new(&page, TRACKER, wait());

    epic.open_story_view("Export CSV").await.unwrap();
    assert!(page.current_url().await.unwrap().ends_with("/user-stories/9"));
}

#[tokio::test(start_paused = true)]
async fn delete_story_confirms_dialog_then_waits_for_removal() {
    let delete = candidates(Epic::delete_story_button("Export CSV"));
    let confirm = candidates(Epic::confirm_button());
    let page = ScriptedDriver::new(&format!("{}/epics/42", TRACKER))
        .with(Epic::story_title("Export CSV"), Element::visible("Export CSV"))
        .with(delete[0].clone(), Element::visible("Delete"))
        .with(confirm[0].clone(), Element::hidden())
        .on(delete[0].clone(), Effect::Reveal(confirm[0].clone(), ms(300)))
        .on(confirm[0].clone(), Effect::Hide(Epic::story_title("Export CSV")));
    let epic = EpicDetailsPage::new(&page, TRACKER, wait());

    assert!(epic.delete_story("Export CSV").await.unwrap());
    assert!(!page.is_visible(&Epic::story_title("Export CSV")).await);
    let clicked: Vec<_> = page.performed().into_iter().map(|(target, _)| target).collect();
    assert_eq!(
        clicked,
        vec![Epic::delete_story_button("Export CSV"), Epic::confirm_button()]
    );
}

#[tokio::test(start_paused = true)]
async fn delete_story_without_dialog_skips_confirmation() {
    let delete = candidates(Epic::delete_story_button("Export CSV"));
    let page = ScriptedDriver::new(&format!("{}/epics/42", TRACKER))
        .with(Epic::story_title("Export CSV"), Element::visible("Export CSV"))
        .with(delete[2].clone(), Element::visible(""))
        .on(delete[2].clone(), Effect::Hide(Epic::story_title("Export CSV")));
    let epic = EpicDetailsPage::new(&page, TRACKER, wait());

    assert!(!epic.delete_story("Export CSV").await.unwrap());
    assert_eq!(page.performed().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn story_form_cancel_leaves_create_route() {
    type Form<'a> = UserStoryCreatePage<'a, ScriptedDriver>;
    let cancel = candidates(Form::cancel_button());
    let page = ScriptedDriver::new(&format!("{}/user-stories/create?epic_id=42", TRACKER))
        .with(cancel[1].clone(), Element::visible("Cancel"))
        .on(cancel[1].clone(), Effect::Goto(format!("{}/epics/42", TRACKER)));
    let form = UserStoryCreatePage::new(&page, wait());

    form.cancel().await.unwrap();
    assert_eq!(page.current_url().await.unwrap(), format!("{}/epics/42", TRACKER));
}

#[tokio::test(start_paused = true)]
async fn inventory_and_cart_list_names_and_prices() {
    type Inventory<'a> = InventoryPage<'a, ScriptedDriver>;
    let page = ScriptedDriver::new("https://www.saucedemo.com/inventory.html")
        .with(Inventory::item_names(), Element::visible("").count(2))
        .with(Inventory::item_names().nth(0), Element::visible("Sauce Labs Backpack"))
        .with(Inventory::item_names().nth(1), Element::visible(" Sauce Labs Bike Light "))
        .with(Inventory::item_prices(), Element::visible("").count(2))
        .with(Inventory::item_prices().nth(0), Element::visible("$29.99"))
        .with(Inventory::item_prices().nth(1), Element::visible("$9.99"));
    let inventory = InventoryPage::new(&page, wait());

    let names = inventory.product_names().await.unwrap();
    assert_eq!(names, vec!["Sauce Labs Backpack", "Sauce Labs Bike Light"]);
    assert_eq!(inventory.product_prices().await.unwrap(), vec![29.99, 9.99]);
    assert_eq!(CartPage::new(&page).item_names().await.unwrap(), names);

    let broken = ScriptedDriver::new("https://www.saucedemo.com/inventory.html")
        .with(Inventory::item_prices(), Element::visible("").count(1))
        .with(Inventory::item_prices().nth(0), Element::visible("sold out"));
    let err = InventoryPage::new(&broken, wait()).product_prices().await.unwrap_err();
    assert!(matches!(err, E2eError::AssertionFailed(_)), "{}", err);
}

#[tokio::test(start_paused = true)]
async fn dashboard_logout_goes_through_user_menu() {
    type Dashboard<'a> = DashboardPage<'a, ScriptedDriver>;
    let logout = candidates(Dashboard::logout_button());
    let page = ScriptedDriver::new(&format!("{}/dashboard", TRACKER))
        .with(Dashboard::user_menu_button(), Element::visible(""))
        .with(logout[0].clone(), Element::hidden())
        .on(Dashboard::user_menu_button(), Effect::Reveal(logout[0].clone(), ms(200)))
        .on(logout[0].clone(), Effect::Goto(format!("{}/login", TRACKER)));
    let dashboard = DashboardPage::new(&page, wait());

    dashboard.logout().await.unwrap();
    assert_eq!(page.current_url().await.unwrap(), format!("{}/login", TRACKER));
}

#[tokio::test(start_paused = true)]
async fn project_submit_distinguishes_created_from_invalid() {
    type Projects<'a> = ProjectsPage<'a, ScriptedDriver>;
    let error = candidates(Projects::name_required_error());

    let invalid = ScriptedDriver::new(&format!("{}/projects/create", TRACKER))
        .with(Projects::create_button(), Element::visible("Create Project"))
        .with(error[0].clone(), Element::hidden())
        .on(Projects::create_button(), Effect::Reveal(error[0].clone(), ms(200)));
    let projects = ProjectsPage::new(&invalid, wait());
    assert!(!projects.submit_create_project().await.unwrap());
    projects.expect_name_required_error().await.unwrap();

    let valid = ScriptedDriver::new(&format!("{}/projects/create", TRACKER))
        .with(Projects::name_input(), Element::visible(""))
        .with(Projects::create_button(), Element::visible("Create Project"))
        .with(Projects::project_in_list("Billing"), Element::hidden())
        .on(Projects::create_button(), Effect::Goto(format!("{}/projects", TRACKER)))
        .on(
            Projects::create_button(),
            Effect::Reveal(Projects::project_in_list("Billing"), ms(400)),
        );
    let projects = ProjectsPage::new(&valid, wait());
    projects
        .fill_create_project_form(&ProjectForm {
            name: Some("Billing".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(projects.submit_create_project().await.unwrap());
    projects.expect_project_in_list("Billing").await.unwrap();
    projects.expect_project_not_in_list("Payroll").await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn manual_epic_turns_ai_toggle_off() {
    type Epics<'a> = EpicsPage<'a, ScriptedDriver>;
    let toggle = candidates(Epics::ai_toggle());
    let page = ScriptedDriver::new(&format!("{}/projects/3/epics/create", TRACKER))
        .with(
            toggle[0].clone(),
            Element {
                checked: true,
                ..Element::checkbox()
            },
        )
        .with(Epics::title_input(), Element::visible(""))
        .with(Epics::description_input(), Element::visible(""))
        .with(Epics::create_button(), Element::visible("Create Epic"))
        .with(Epics::edit_epic_link(), Element::hidden())
        .on(Epics::create_button(), Effect::Reveal(Epics::edit_epic_link(), ms(500)));
    let epics = EpicsPage::new(&page, wait());

    epics
        .create_epic_manually(&EpicForm {
            title: "Checkout".into(),
            description: "Faster checkout".into(),
            priority: None,
        })
        .await
        .unwrap();
    assert!(!page.checked(&toggle[0]));
    assert_eq!(page.text_of(&Epics::title_input()).as_deref(), Some("Checkout"));
}
