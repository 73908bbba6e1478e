//! Page objects
//!
//! Each page borrows a [`Driver`](pagesync_common::Driver) and exposes the
//! operations a test needs in domain terms. Pages never sleep for fixed
//! durations; every wait goes through the wait engine with the deadlines from
//! [`TimeoutConfig`](pagesync_common::config::TimeoutConfig).

use pagesync_common::{Descriptor, Driver, DriverError};

pub mod ai_stories;
pub mod dashboard;
pub mod epic_details;
pub mod epics;
pub mod projects;
pub mod storefront;
pub mod tracker_login;
pub mod user_story;

pub use ai_stories::AiStoriesPanel;
pub use dashboard::DashboardPage;
pub use epic_details::EpicDetailsPage;
pub use epics::{EpicForm, EpicsPage};
pub use projects::{ProjectForm, ProjectsPage};
pub use storefront::{CartPage, InventoryPage, LoginPage, SortOrder};
pub use tracker_login::TrackerLoginPage;
pub use user_story::{ManualStory, UserStoryCreatePage};

/// Join a base URL and a path without doubling or dropping the slash.
pub fn join_url(base: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{}{}", base, &path[1..]),
        (false, false) if !path.is_empty() => format!("{}/{}", base, path),
        _ => format!("{}{}", base, path),
    }
}

/// Trimmed text of every element matching `target`, in document order.
pub(crate) async fn read_all_texts<D>(driver: &D, target: &Descriptor) -> Result<Vec<String>, DriverError>
where
    D: Driver + ?Sized,
{
    let count = driver.count(target).await?;
    let mut texts = Vec::with_capacity(count);
    for index in 0..count {
        let text = driver.read_text(&target.clone().nth(index)).await?;
        texts.push(text.trim().to_string());
    }
    Ok(texts)
}
