use super::JobTab;
use crate::config::Credentials;
use crate::error::ApplyError;
use crate::utils::js_escape;
use std::time::Duration;

const MAX_LOGIN_ATTEMPTS: usize = 3;
const LOGIN_FORM_TIMEOUT: Duration = Duration::from_secs(10);
const LOGGED_IN_TIMEOUT: Duration = Duration::from_secs(15);

impl JobTab {
    /// JS expression that holds when any logged-in marker is on the page.
    fn logged_in_condition(&self) -> String {
        let markers: Vec<String> = self
            .selectors
            .logged_in_markers
            .iter()
            .map(|m| format!("'{}'", js_escape(m)))
            .collect();
        format!(
            "[{}].some(function(s) {{ return !!document.querySelector(s); }})",
            markers.join(", ")
        )
    }

    /// Whether the current page shows the signed-in navigation or feed.
    pub fn is_logged_in(&self) -> anyhow::Result<bool> {
        self.eval_bool(&self.logged_in_condition())
    }

    /// Accepts the cookie banner if it is shown.
    pub fn handle_consent(&self) -> anyhow::Result<bool> {
        if !self.is_visible(&self.selectors.consent_button)? {
            return Ok(false);
        }
        log::info!("[*] Accepting the cookie consent banner...");
        let clicked = self.click(&self.selectors.consent_button, None)?;
        self.pause();
        Ok(clicked)
    }

    fn submit_credentials(&self, credentials: &Credentials) -> anyhow::Result<bool> {
        let form_ready = format!(
            "!!document.querySelector('{}')",
            js_escape(&self.selectors.username_input)
        );
        if !self.wait_for(&form_ready, LOGIN_FORM_TIMEOUT)? {
            log::warn!("[!] Login form did not appear");
            return Ok(false);
        }

        log::info!("[*] Filling credentials for {}", credentials.email);
        self.fill_input_value(&self.selectors.username_input, &credentials.email)?;
        self.fill_input_value(&self.selectors.password_input, &credentials.password)?;
        self.pause();
        if !self.click(&self.selectors.login_submit, None)? {
            log::warn!("[!] Login submit button not found");
            return Ok(false);
        }

        self.wait_for(&self.logged_in_condition(), LOGGED_IN_TIMEOUT)
    }

    fn attempt_login(&self, credentials: &Credentials) -> anyhow::Result<bool> {
        self.navigate(&self.selectors.login_url)?;
        self.handle_consent()?;
        if self.is_logged_in()? {
            return Ok(true);
        }
        self.submit_credentials(credentials)
    }

    /// Makes sure the browser profile is signed in.
    ///
    /// A profile that already carries a session is detected on the feed and
    /// left alone. Otherwise the credentials are submitted up to three times.
    pub fn login(&self, credentials: &Credentials) -> Result<(), ApplyError> {
        let browser_error = |e: anyhow::Error| ApplyError::BrowserError {
            message: format!("{:#}", e),
        };

        self.navigate(&self.selectors.feed_url).map_err(browser_error)?;
        self.handle_consent().map_err(browser_error)?;
        if self.is_logged_in().map_err(browser_error)? {
            log::info!("[✓] Already logged in");
            return Ok(());
        }

        let mut reason = String::from("still on the login page after submitting credentials");
        for attempt in 1..=MAX_LOGIN_ATTEMPTS {
            log::info!("[*] Login attempt {}/{}", attempt, MAX_LOGIN_ATTEMPTS);
            match self.attempt_login(credentials) {
                Ok(true) => {
                    log::info!("[✓] Logged in");
                    return Ok(());
                }
                Ok(false) => log::warn!("[!] Login attempt {} did not reach the feed", attempt),
                Err(e) => {
                    log::warn!("[!] Login attempt {} failed: {:#}", attempt, e);
                    reason = format!("{:#}", e);
                }
            }
        }

        Err(ApplyError::LoginFailed {
            attempts: MAX_LOGIN_ATTEMPTS,
            reason,
        })
    }
}
