use crate::config::SearchConfig;

/// A listing as read from its detail pane.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobPosting {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Whether the listing offers the in-site quick-apply form.
    pub quick_apply: bool,
}

/// The job search side of the site.
pub trait JobBoard {
    /// Opens the results for `search`, applying the optional filters.
    fn search(&self, search: &SearchConfig) -> anyhow::Result<()>;
    /// Ids of every card on the current results page, in page order.
    fn job_cards(&self) -> anyhow::Result<Vec<String>>;
    /// Opens a card and reads its details.
    fn open(&self, job_id: &str) -> anyhow::Result<JobPosting>;
    /// Opens the application form of the open listing.
    fn start_application(&self) -> anyhow::Result<bool>;
    /// Moves to the next results page; `false` on the last one.
    fn next_page(&self) -> anyhow::Result<bool>;
}
