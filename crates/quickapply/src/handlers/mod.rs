pub mod form_surface;
pub mod listing;
pub mod login;

use crate::config::Selectors;
use crate::utils::js_escape;
use headless_chrome::Tab;
use std::sync::Arc;
use std::thread::sleep;
use std::time::{Duration, Instant};

/// How often bounded waits re-check their condition.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Wrapper around the Chrome tab that hosts the login, listing and form
/// handlers as methods, sharing the selector table and the JS helpers.
pub struct JobTab {
    pub(crate) tab: Arc<Tab>,
    pub(crate) selectors: Selectors,
    pub(crate) settle_delay: Duration,
}

impl JobTab {
    pub fn new(tab: Arc<Tab>, selectors: Selectors, settle_delay: Duration) -> Self {
        Self {
            tab,
            selectors,
            settle_delay,
        }
    }

    // ── Low-level JS evaluation helpers ──────────────────────────────────

    /// Evaluates JS and returns the boolean result.
    /// Returns `false` if the script returns null/undefined.
    pub(crate) fn eval_bool(&self, js: &str) -> anyhow::Result<bool> {
        Ok(self
            .tab
            .evaluate(js, false)?
            .value
            .and_then(|v| v.as_bool())
            .unwrap_or(false))
    }

    /// Evaluates JS and returns the string result, or `None` if null/undefined.
    pub(crate) fn eval_string(&self, js: &str) -> anyhow::Result<Option<String>> {
        Ok(self
            .tab
            .evaluate(js, false)?
            .value
            .and_then(|v| v.as_str().map(|s| s.to_string())))
    }

    /// Evaluates JS and returns the string result, or `fallback` if null/undefined.
    pub(crate) fn eval_string_or(&self, js: &str, fallback: &str) -> anyhow::Result<String> {
        Ok(self
            .eval_string(js)?
            .unwrap_or_else(|| fallback.to_string()))
    }

    /// Evaluates JS for its side effects; propagates errors, discards the return value.
    pub(crate) fn eval(&self, js: &str) -> anyhow::Result<()> {
        self.tab.evaluate(js, false)?;
        Ok(())
    }

    // ── Tab state helpers ─────────────────────────────────────────────────

    pub fn get_url(&self) -> String {
        self.tab.get_url()
    }

    pub(crate) fn navigate(&self, url: &str) -> anyhow::Result<()> {
        log::info!("[*] Navigating to: {}", url);
        self.tab.navigate_to(url)?;
        if let Err(e) = self.tab.wait_until_navigated() {
            log::warn!("[!] Navigation wait timed out: {}, continuing...", e);
        }
        Ok(())
    }

    pub(crate) fn pause(&self) {
        sleep(self.settle_delay);
    }

    /// Polls `condition` (a JS boolean expression) until it holds or
    /// `timeout` passes.
    pub(crate) fn wait_for(&self, condition: &str, timeout: Duration) -> anyhow::Result<bool> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.eval_bool(condition)? {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            sleep(POLL_INTERVAL);
        }
    }

    /// Whether `selector` matches a rendered element.
    pub(crate) fn is_visible(&self, selector: &str) -> anyhow::Result<bool> {
        let sel = js_escape(selector);
        self.eval_bool(&format!(
            "(function(){{ var el = document.querySelector('{sel}'); return !!(el && el.offsetParent !== null); }})()"
        ))
    }

    /// Clicks the first element matching `selector`, optionally requiring its
    /// text to contain `text`. Returns whether anything was clicked.
    pub(crate) fn click(&self, selector: &str, text: Option<&str>) -> anyhow::Result<bool> {
        let sel = js_escape(selector);
        let wanted = js_escape(&text.unwrap_or_default().to_lowercase());
        self.eval_bool(&format!(
            r#"(function() {{
    var wanted = '{wanted}';
    var candidates = Array.from(document.querySelectorAll('{sel}'));
    var el = candidates.find(function(b) {{
        return !b.disabled && (!wanted || (b.innerText || '').toLowerCase().indexOf(wanted) !== -1);
    }});
    if (!el) return false;
    el.scrollIntoView({{block: 'center'}});
    el.click();
    return true;
}})()"#
        ))
    }

    /// Fills a DOM input element with `value` and dispatches input/change events.
    pub(crate) fn fill_input_value(&self, selector: &str, value: &str) -> anyhow::Result<()> {
        let sel = js_escape(selector);
        let val = js_escape(value);
        self.eval(&format!(
            r#"
var el = document.querySelector('{sel}');
if (el) {{
    el.focus();
    el.value = '{val}';
    el.dispatchEvent(new Event('input', {{ bubbles: true }}));
    el.dispatchEvent(new Event('change', {{ bubbles: true }}));
}}"#
        ))
    }
}
