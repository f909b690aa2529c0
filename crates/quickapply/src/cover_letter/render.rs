use crate::browser::create_browser;
use crate::config::BrowserConfig;
use crate::utils::atomic_write;
use anyhow::Context;
use headless_chrome::Browser;
use once_cell::sync::Lazy;
use once_cell::unsync::OnceCell;
use pulldown_cmark::{html, Options, Parser};
use regex::{Captures, Regex};
use std::io::Write;
use std::path::{Path, PathBuf};

// `[Your Address]`, `**[Date]**` and friends. A `[text](url)` link is kept.
static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\*{0,2}\[[^\]\n]*\]\*{0,2}(\()?").expect("placeholder pattern")
});

/// Drops unfilled `[...]` placeholders and the whitespace they leave.
pub fn clean_markdown(markdown: &str) -> String {
    let stripped = PLACEHOLDER.replace_all(markdown, |caps: &Captures| {
        if caps.get(1).is_some() {
            caps[0].to_string()
        } else {
            String::new()
        }
    });

    let mut out = String::with_capacity(stripped.len());
    let mut blank_run = 0;
    for line in stripped.lines() {
        let line = line.trim_end();
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }
    out.trim().to_string()
}

/// Wraps the rendered Markdown in a printable page.
pub fn markdown_to_html(markdown: &str) -> String {
    let parser = Parser::new_ext(markdown, Options::ENABLE_STRIKETHROUGH);
    let mut body = String::new();
    html::push_html(&mut body, parser);
    format!(
        r#"<!DOCTYPE html>
<html><head><meta charset="utf-8"><title>Cover letter</title>
<style>
body {{ font-family: Georgia, serif; font-size: 11pt; line-height: 1.45; margin: 2.2cm; color: #111; }}
h1, h2, h3 {{ font-weight: normal; margin: 0 0 0.6em; }}
p {{ margin: 0 0 0.9em; }}
</style></head>
<body>
{body}</body></html>
"#
    )
}

/// Prints cover letters to PDF with a headless Chrome that is started on
/// first use and kept for the rest of the run.
pub struct PdfRenderer {
    output: PathBuf,
    browser_config: BrowserConfig,
    browser: OnceCell<Browser>,
}

impl PdfRenderer {
    pub fn new(output: &Path, browser_config: &BrowserConfig) -> Self {
        Self {
            output: output.to_path_buf(),
            browser_config: BrowserConfig {
                headless: true,
                ..browser_config.clone()
            },
            browser: OnceCell::new(),
        }
    }

    fn browser(&self) -> anyhow::Result<&Browser> {
        self.browser
            .get_or_try_init(|| create_browser(&self.browser_config, None))
    }

    pub fn render(&self, markdown: &str) -> anyhow::Result<PathBuf> {
        let page = markdown_to_html(&clean_markdown(markdown));

        let mut html_file = tempfile::Builder::new()
            .prefix("cover-letter-")
            .suffix(".html")
            .tempfile()
            .context("Failed to create temporary HTML file")?;
        html_file.write_all(page.as_bytes())?;
        html_file.flush()?;

        let tab = self.browser()?.new_tab()?;
        let url = format!("file://{}", html_file.path().display());
        tab.navigate_to(&url)?.wait_until_navigated()?;
        let pdf = tab.print_to_pdf(None)?;
        if let Err(e) = tab.close(true) {
            log::debug!("Closing the render tab failed: {}", e);
        }

        atomic_write(&self.output, &pdf)?;
        Ok(self.output.clone())
    }
}
