//! Run configuration.
//!
//! Everything a run needs is injected through [`RunConfig`]; nothing is read
//! from process-wide state once the CLI has built it.

use crate::error::ApplyError;
use crate::profile::UserProfile;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Account credentials for the job site.
#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Tunables of the step driver.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Consecutive no-progress transitions tolerated before abandoning.
    pub max_stuck: u32,
    /// Hard cap on transitions per application.
    pub max_steps: u32,
    /// Pause after every click so the host form can re-render.
    pub settle_delay: Duration,
    /// How long to wait for the post-submit confirmation control.
    pub confirmation_timeout: Duration,
    /// Probability of ticking a checkbox that carries no semantic signal.
    pub checkbox_probability: f64,
    /// Seeds the sweep's random source; `None` draws from the OS.
    pub sweep_seed: Option<u64>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            max_stuck: 2,
            max_steps: 25,
            settle_delay: Duration::from_millis(400),
            confirmation_timeout: Duration::from_millis(2500),
            checkbox_probability: 0.5,
            sweep_seed: None,
        }
    }
}

/// Which listings are worth opening an application for.
#[derive(Debug, Clone)]
pub struct EligibilityPolicy {
    pub require_quick_apply: bool,
    pub excluded_title_terms: Vec<String>,
}

impl Default for EligibilityPolicy {
    fn default() -> Self {
        Self {
            require_quick_apply: true,
            excluded_title_terms: vec!["intern".to_string(), "internship".to_string()],
        }
    }
}

impl EligibilityPolicy {
    pub fn is_eligible(&self, title: &str, quick_apply: bool) -> bool {
        if self.require_quick_apply && !quick_apply {
            return false;
        }
        let title = title.to_lowercase();
        !self
            .excluded_title_terms
            .iter()
            .any(|term| title.contains(&term.to_lowercase()))
    }
}

#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub keywords: String,
    pub location: Option<String>,
    pub distance: Option<u32>,
    pub max_applications: usize,
    pub eligibility: EligibilityPolicy,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            keywords: "graduate".to_string(),
            location: None,
            distance: None,
            max_applications: 5,
            eligibility: EligibilityPolicy::default(),
        }
    }
}

/// Every CSS selector the browser surface relies on.
///
/// Defaults target LinkedIn's markup; a JSON file can override any subset.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Selectors {
    pub feed_url: String,
    pub login_url: String,
    pub jobs_search_url: String,
    pub logged_in_markers: Vec<String>,
    pub login_form: String,
    pub consent_button: String,
    pub username_input: String,
    pub password_input: String,
    pub login_submit: String,

    pub distance_filter_button: String,
    pub distance_slider: String,
    pub distance_apply_button: String,
    pub quick_apply_filter: String,
    pub results_list: String,
    pub job_card: String,
    pub job_card_id_attribute: String,
    pub job_title: String,
    pub job_description: String,
    pub apply_button: String,
    pub apply_button_label: String,
    pub quick_apply_text: String,
    pub next_page_button: String,

    pub application_container: String,
    pub field_elements: String,
    pub progress_meter: String,
    pub review_button: String,
    pub next_button: String,
    pub submit_button: String,
    pub confirmation_button: String,
    pub confirmation_text: String,
    pub dismiss_button: String,
    pub discard_button: String,
    pub equal_opportunity_header: String,
    pub equal_opportunity_text: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            feed_url: "https://www.linkedin.com/feed/".to_string(),
            login_url: "https://www.linkedin.com/login".to_string(),
            jobs_search_url: "https://www.linkedin.com/jobs/search/".to_string(),
            logged_in_markers: vec![
                r#"div[data-test-id="nav-bar"]"#.to_string(),
                r#"div[data-control-name="nav.settings"]"#.to_string(),
                "div.feed-shared-update-v2".to_string(),
                "#global-nav".to_string(),
            ],
            login_form: "form.login__form".to_string(),
            consent_button: r#"button[action-type="ACCEPT"]"#.to_string(),
            username_input: "#username".to_string(),
            password_input: "#password".to_string(),
            login_submit: r#"button[type="submit"]"#.to_string(),

            distance_filter_button: "button[aria-label^='Distance filter.']".to_string(),
            distance_slider: "input#distance-filter-bar-slider".to_string(),
            distance_apply_button: r#"button[aria-label="Apply current filter to show results"]"#
                .to_string(),
            quick_apply_filter: r#"button[aria-label="Easy Apply filter."][role="radio"]"#
                .to_string(),
            results_list: ".jobs-search-results-list".to_string(),
            job_card: "div.job-card-container".to_string(),
            job_card_id_attribute: "data-job-id".to_string(),
            job_title: ".job-details-jobs-unified-top-card__job-title".to_string(),
            job_description: ".jobs-description-content__text".to_string(),
            apply_button: "button.jobs-apply-button".to_string(),
            apply_button_label: "button.jobs-apply-button span.artdeco-button__text".to_string(),
            quick_apply_text: "Easy Apply".to_string(),
            next_page_button:
                "button.jobs-search-pagination__button--next:not([disabled])".to_string(),

            application_container: "div.jobs-easy-apply-content".to_string(),
            field_elements:
                r#"input:not([type="hidden"]):not([type="submit"]):not([type="button"]), textarea, select"#
                    .to_string(),
            progress_meter: "progress.artdeco-completeness-meter-linear__progress-element"
                .to_string(),
            review_button: r#"button[aria-label="Review your application"]"#.to_string(),
            next_button: r#"button[aria-label="Continue to next step"]"#.to_string(),
            submit_button: r#"button[aria-label="Submit application"]"#.to_string(),
            confirmation_button: "button.artdeco-button--primary".to_string(),
            confirmation_text: "Done".to_string(),
            dismiss_button: "button.artdeco-modal__dismiss".to_string(),
            discard_button: "button[data-test-dialog-secondary-btn]".to_string(),
            equal_opportunity_header: "span.jobs-easy-apply-form-section__label".to_string(),
            equal_opportunity_text: "Equal Opportunities".to_string(),
        }
    }
}

impl Selectors {
    /// Loads overrides from a JSON file; keys not present keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ApplyError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ApplyError::Config {
            missing: vec![format!("readable selector file at {} ({})", path.display(), e)],
        })?;
        serde_json::from_str(&raw).map_err(|e| ApplyError::Config {
            missing: vec![format!("valid selector JSON in {} ({})", path.display(), e)],
        })
    }
}

/// Paths of every file the run reads or writes.
#[derive(Debug, Clone)]
pub struct PathsConfig {
    pub profile: PathBuf,
    pub cv: PathBuf,
    pub cover_letter: PathBuf,
    pub session_state: PathBuf,
    pub failed_applications: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            profile: PathBuf::from("user_data.json"),
            cv: PathBuf::from("cv.pdf"),
            cover_letter: PathBuf::from("cover.pdf"),
            session_state: PathBuf::from("linkedin_state.json"),
            failed_applications: PathBuf::from("failed_applications.json"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl OpenAiConfig {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            timeout: Duration::from_secs(90),
        }
    }
}

/// Browser launch options.
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    pub headless: bool,
    pub user_agent: String,
    pub chrome_path: Option<PathBuf>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: false,
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36".to_string(),
            chrome_path: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub credentials: Option<Credentials>,
    pub openai: Option<OpenAiConfig>,
    pub paths: PathsConfig,
    pub browser: BrowserConfig,
    pub search: SearchConfig,
    pub driver: DriverConfig,
    pub selectors: Selectors,
}

impl RunConfig {
    /// Checks every required input up front and reports all gaps at once.
    pub fn validate(&self) -> Result<&Credentials, ApplyError> {
        let mut missing = Vec::new();

        match &self.credentials {
            Some(c) if c.email.trim().is_empty() => missing.push("LINKEDIN_EMAIL".to_string()),
            Some(c) if c.password.is_empty() => missing.push("LINKEDIN_PASSWORD".to_string()),
            None => missing.push("LINKEDIN_EMAIL / LINKEDIN_PASSWORD".to_string()),
            _ => {}
        }
        if self.needs_cover_letter_generation() {
            match &self.openai {
                Some(o) if o.api_key.trim().is_empty() => {
                    missing.push("OPENAI_API_KEY".to_string())
                }
                None => missing.push("OPENAI_API_KEY".to_string()),
                _ => {}
            }
        }
        if !self.paths.profile.is_file() {
            missing.push(format!("profile file at {}", self.paths.profile.display()));
        }
        if !self.paths.cv.is_file() {
            missing.push(format!("CV file at {}", self.paths.cv.display()));
        }
        if self.search.keywords.trim().is_empty() {
            missing.push("search keywords".to_string());
        }

        if !missing.is_empty() {
            return Err(ApplyError::Config { missing });
        }
        self.credentials
            .as_ref()
            .ok_or_else(|| ApplyError::Config {
                missing: vec!["LINKEDIN_EMAIL / LINKEDIN_PASSWORD".to_string()],
            })
    }

    /// Letters are generated per job only when the profile has none on file.
    /// An unreadable profile counts as needing them.
    pub fn needs_cover_letter_generation(&self) -> bool {
        UserProfile::load(&self.paths.profile)
            .map(|profile| !profile.has_cover_letter())
            .unwrap_or(true)
    }
}
