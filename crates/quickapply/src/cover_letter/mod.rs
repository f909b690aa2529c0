//! Cover letters written per job when the profile has none on file.

pub mod openai;
pub mod render;

pub use openai::OpenAiClient;
pub use render::{clean_markdown, markdown_to_html, PdfRenderer};

use std::path::PathBuf;

/// Writes and renders cover letters. The form driver only needs the path of
/// the finished file.
pub trait CoverLetterService {
    /// Returns the letter as Markdown.
    fn generate(
        &self,
        job_title: &str,
        job_description: &str,
        cv_text: &str,
    ) -> anyhow::Result<String>;

    /// Renders Markdown to a document and returns where it was written.
    fn render(&self, markdown: &str) -> anyhow::Result<PathBuf>;
}

/// What the driver needs to produce a letter mid-application.
#[derive(Clone, Copy)]
pub struct CoverLetterSource<'a> {
    pub service: &'a dyn CoverLetterService,
    pub cv_text: &'a str,
}

/// OpenAI drafts the letter, headless Chrome prints it. Without a client
/// every generation fails, which the driver treats like any API error.
pub struct CoverLetterWriter {
    client: Option<OpenAiClient>,
    renderer: PdfRenderer,
}

impl CoverLetterWriter {
    pub fn new(client: Option<OpenAiClient>, renderer: PdfRenderer) -> Self {
        Self { client, renderer }
    }
}

impl CoverLetterService for CoverLetterWriter {
    fn generate(
        &self,
        job_title: &str,
        job_description: &str,
        cv_text: &str,
    ) -> anyhow::Result<String> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("OPENAI_API_KEY is not configured"))?;
        client.write_cover_letter(job_title, job_description, cv_text)
    }

    fn render(&self, markdown: &str) -> anyhow::Result<PathBuf> {
        self.renderer.render(markdown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BrowserConfig;

    #[test]
    fn writer_without_api_key_fails_generation() {
        let dir = tempfile::tempdir().unwrap();
        let writer = CoverLetterWriter::new(
            None,
            PdfRenderer::new(&dir.path().join("cover.pdf"), &BrowserConfig::default()),
        );
        let err = writer.generate("Engineer", "Build things", "CV").unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }
}
