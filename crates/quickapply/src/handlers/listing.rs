//! Job search results as a [`JobBoard`].

use super::JobTab;
use crate::config::SearchConfig;
use crate::jobs::{JobBoard, JobPosting};
use crate::utils::js_escape;
use anyhow::Context;
use reqwest::Url;
use std::time::Duration;

/// Searches without a location fall back to this one.
const DEFAULT_LOCATION: &str = "United Kingdom";
const RESULTS_TIMEOUT: Duration = Duration::from_secs(5);
const DETAILS_TIMEOUT: Duration = Duration::from_secs(3);
const APPLICATION_TIMEOUT: Duration = Duration::from_millis(2500);
/// Upper bound on scroll steps while the result list lazily renders cards.
const MAX_SCROLL_STEPS: usize = 25;

/// The results URL for `search`.
pub fn search_url(base: &str, search: &SearchConfig) -> anyhow::Result<Url> {
    let location = search.location.as_deref().unwrap_or(DEFAULT_LOCATION);
    Url::parse_with_params(
        base,
        &[
            ("keywords", search.keywords.as_str()),
            ("location", location),
        ],
    )
    .with_context(|| format!("Invalid search URL base '{}'", base))
}

impl JobTab {
    fn card_count(&self) -> anyhow::Result<usize> {
        let js = format!(
            "String(document.querySelectorAll('{}').length)",
            js_escape(&self.selectors.job_card)
        );
        Ok(self.eval_string_or(&js, "0")?.parse().unwrap_or(0))
    }

    fn apply_distance_filter(&self, distance: u32) -> anyhow::Result<()> {
        if !self.click(&self.selectors.distance_filter_button, None)? {
            log::warn!("[!] Distance filter not found, searching without it");
            return Ok(());
        }
        let slider = format!(
            "!!document.querySelector('{}')",
            js_escape(&self.selectors.distance_slider)
        );
        if !self.wait_for(&slider, APPLICATION_TIMEOUT)? {
            log::warn!("[!] Distance slider never appeared");
            return Ok(());
        }
        self.fill_input_value(&self.selectors.distance_slider, &distance.to_string())?;
        self.click(&self.selectors.distance_apply_button, None)?;
        log::info!("[*] Distance filter set to {}", distance);
        self.pause();
        Ok(())
    }

    fn apply_quick_apply_filter(&self) -> anyhow::Result<()> {
        if self.click(&self.selectors.quick_apply_filter, None)? {
            log::info!("[*] Showing quick-apply listings only");
            self.pause();
        } else {
            log::debug!("Quick-apply filter not found");
        }
        Ok(())
    }

    /// Scrolls the results list until no new cards render.
    fn load_all_cards(&self) -> anyhow::Result<usize> {
        let scroll = format!(
            r#"(function() {{
var list = document.querySelector('{}');
if (list) {{ list.scrollTop = list.scrollHeight; }} else {{ window.scrollTo(0, document.body.scrollHeight); }}
}})()"#,
            js_escape(&self.selectors.results_list)
        );

        let mut count = self.card_count()?;
        for _ in 0..MAX_SCROLL_STEPS {
            self.eval(&scroll)?;
            self.pause();
            let now = self.card_count()?;
            if now == count {
                break;
            }
            count = now;
        }
        Ok(count)
    }

    fn text_of(&self, selector: &str) -> anyhow::Result<String> {
        let js = format!(
            "(function(){{ var el = document.querySelector('{}'); return el ? el.innerText.trim() : ''; }})()",
            js_escape(selector)
        );
        self.eval_string_or(&js, "")
    }
}

impl JobBoard for JobTab {
    fn search(&self, search: &SearchConfig) -> anyhow::Result<()> {
        let url = search_url(&self.selectors.jobs_search_url, search)?;
        self.navigate(url.as_str())?;

        if let Some(distance) = search.distance.filter(|_| search.location.is_some()) {
            self.apply_distance_filter(distance)?;
        }
        if search.eligibility.require_quick_apply {
            self.apply_quick_apply_filter()?;
        }

        let cards = format!(
            "!!document.querySelector('{}')",
            js_escape(&self.selectors.job_card)
        );
        if !self.wait_for(&cards, RESULTS_TIMEOUT)? {
            log::warn!("[!] No job cards for '{}'", search.keywords);
        }
        Ok(())
    }

    fn job_cards(&self) -> anyhow::Result<Vec<String>> {
        let count = self.load_all_cards()?;
        log::debug!("{} job card(s) rendered", count);

        let js = format!(
            r#"JSON.stringify(Array.from(document.querySelectorAll('{}')).map(function(c) {{
    return c.getAttribute('{}') || '';
}}).filter(function(id) {{ return id.length > 0; }}))"#,
            js_escape(&self.selectors.job_card),
            js_escape(&self.selectors.job_card_id_attribute)
        );
        let raw = self.eval_string_or(&js, "[]")?;
        serde_json::from_str(&raw).context("Malformed job card list")
    }

    fn open(&self, job_id: &str) -> anyhow::Result<JobPosting> {
        let card = format!(
            "{}[{}=\"{}\"]",
            self.selectors.job_card, self.selectors.job_card_id_attribute, job_id
        );
        if !self.click(&card, None)? {
            anyhow::bail!("job card {} is no longer on the page", job_id);
        }
        let title_ready = format!(
            "!!document.querySelector('{}')",
            js_escape(&self.selectors.job_title)
        );
        if !self.wait_for(&title_ready, DETAILS_TIMEOUT)? {
            anyhow::bail!("details of job {} never loaded", job_id);
        }
        self.pause();

        let label = self.text_of(&self.selectors.apply_button_label)?;
        let posting = JobPosting {
            id: job_id.to_string(),
            title: self.text_of(&self.selectors.job_title)?,
            description: self.text_of(&self.selectors.job_description)?,
            quick_apply: label.contains(&self.selectors.quick_apply_text),
        };
        log::info!(
            "[*] Opened '{}' ({}){}",
            posting.title,
            posting.id,
            if posting.quick_apply { "" } else { ", no quick apply" }
        );
        Ok(posting)
    }

    fn start_application(&self) -> anyhow::Result<bool> {
        if !self.click(&self.selectors.apply_button, None)? {
            return Ok(false);
        }
        let form = format!(
            "!!document.querySelector('{}')",
            js_escape(&self.selectors.application_container)
        );
        let opened = self.wait_for(&form, APPLICATION_TIMEOUT)?;
        if opened {
            self.pause();
        }
        Ok(opened)
    }

    fn next_page(&self) -> anyhow::Result<bool> {
        if !self.click(&self.selectors.next_page_button, None)? {
            return Ok(false);
        }
        log::info!("[*] Moving to the next page of results");
        let cards = format!(
            "!!document.querySelector('{}')",
            js_escape(&self.selectors.job_card)
        );
        self.wait_for(&cards, RESULTS_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_url_encodes_keywords_and_location() {
        let search = SearchConfig {
            keywords: "Data architect".to_string(),
            location: Some("Sheffield".to_string()),
            ..Default::default()
        };
        let url = search_url("https://www.linkedin.com/jobs/search/", &search).unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.linkedin.com/jobs/search/?keywords=Data+architect&location=Sheffield"
        );
    }

    #[test]
    fn missing_location_uses_default() {
        let search = SearchConfig::default();
        let url = search_url("https://www.linkedin.com/jobs/search/", &search).unwrap();
        assert!(url.as_str().ends_with("location=United+Kingdom"));
    }

    #[test]
    fn bad_base_is_an_error() {
        assert!(search_url("not a url", &SearchConfig::default()).is_err());
    }
}
