use crate::config::OpenAiConfig;
use anyhow::Context;
use serde::{Deserialize, Serialize};

const SYSTEM_PROMPT: &str = "You write concise, factual cover letters for job applications. \
Use only facts from the candidate's CV. Answer with the letter in Markdown and nothing else. \
Never leave bracketed placeholders for the candidate to fill in.";

const REVIEW_PROMPT: &str = "Review the draft above against the job description and the CV. \
Check that it suits the role, that every claim is backed by the CV and matched to the right \
requirement, that it uses the posting's keywords, that the Markdown is clean and ATS-friendly, \
and that it reads naturally. Then reply with the improved final letter only.";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct ChatMessage {
    role: String,
    content: String,
}

impl ChatMessage {
    fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Blocking client for the chat-completions endpoint.
pub struct OpenAiClient {
    http: reqwest::blocking::Client,
    config: OpenAiConfig,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> anyhow::Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { http, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    fn chat(&self, messages: &[ChatMessage]) -> anyhow::Result<String> {
        let request = ChatRequest {
            model: &self.config.model,
            messages,
            temperature: 0.7,
        };
        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .context("OpenAI request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            anyhow::bail!("OpenAI returned {}: {}", status, body.trim());
        }

        let parsed: ChatResponse = response
            .json()
            .context("OpenAI response was not valid JSON")?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("OpenAI returned no content"))
    }

    /// Drafts a letter, then asks the model to critique and finalise it.
    pub fn write_cover_letter(
        &self,
        job_title: &str,
        job_description: &str,
        cv_text: &str,
    ) -> anyhow::Result<String> {
        let mut messages = draft_messages(job_title, job_description, cv_text);
        let draft = self.chat(&messages)?;
        log::debug!("Cover letter draft: {} characters", draft.len());

        messages.push(ChatMessage::new("assistant", draft));
        messages.push(ChatMessage::new("user", REVIEW_PROMPT));
        let letter = self.chat(&messages)?;
        Ok(strip_code_fence(&letter))
    }
}

fn draft_messages(job_title: &str, job_description: &str, cv_text: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::new("system", SYSTEM_PROMPT),
        ChatMessage::new(
            "user",
            format!(
                "Create a cover letter for this job.\n\nJOB TITLE:\n{}\n\nJOB DESCRIPTION:\n{}\n\nCV:\n{}",
                job_title.trim(),
                job_description.trim(),
                cv_text.trim()
            ),
        ),
    ]
}

/// Models like to wrap Markdown answers in ```markdown fences.
fn strip_code_fence(text: &str) -> String {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
        .to_string()
}
