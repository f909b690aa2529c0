//! # Quick-apply job application library
//!
//! Signs into the job site through Chrome, walks the search results and
//! fills each multi-step quick-apply form from a user profile, writing a
//! cover letter per job when the profile has none.

pub mod browser;
pub mod config;
pub mod cover_letter;
pub mod cv;
pub mod error;
pub mod form;
pub mod handlers;
pub mod jobs;
pub mod logger;
pub mod profile;
pub mod registry;
pub mod runner;
pub mod session;
pub mod utils;

#[cfg(test)]
mod testing;

// Re-export commonly used items
pub use config::{
    BrowserConfig, Credentials, DriverConfig, EligibilityPolicy, OpenAiConfig, PathsConfig,
    RunConfig, SearchConfig, Selectors,
};
pub use error::{ApplyError, ErrorCategory};
pub use logger::init_logger;
pub use runner::{run, RunSummary};
pub use utils::{get_user_data_dir, CancellationToken};
