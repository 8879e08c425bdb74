//! LLM agent module for structured summarisation.
//!
//! Sends fetched article text to a chat completions API with a fixed
//! system prompt and returns the structured summary text verbatim.

use crate::config::{Config, ConfigError};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Timeout for summarisation round trips
const SUMMARIZE_TIMEOUT: Duration = Duration::from_secs(60);

/// System prompt requesting the fixed section structure. Sections that the
/// model leaves out are simply absent from the output; nothing downstream
/// requires all of them.
const SYSTEM_PROMPT: &str = "You are a research assistant. Summarize this academic paper with the following structure:

**Title**
[Paper title]

**Authors**
[Authors if available]

**Abstract Summary**
[Brief summary of the abstract]

**Key Findings**
[Main findings and results]

**Methodology**
[Research methods used]

**Conclusions**
[Main conclusions]

Keep it concise but comprehensive.";

#[derive(Error, Debug)]
pub enum SummarizationError {
    #[error("LLM request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("LLM service error {status}: {body}")]
    Service { status: u16, body: String },
    #[error("LLM returned no choices")]
    EmptyResponse,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    temperature: f32,
    max_tokens: u32,
    messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageContent,
}

#[derive(Deserialize)]
struct ChatMessageContent {
    content: String,
}

/// Client for the language-model summarisation service
pub struct Summarizer {
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    max_input_chars: usize,
}

impl Summarizer {
    /// Build a summariser; fails if the OpenAI credential is absent
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        let api_key = config.openai_key()?.to_string();
        Ok(Self {
            api_key,
            base_url: config.agent.base_url.trim_end_matches('/').to_string(),
            model: config.agent.model.clone(),
            temperature: config.agent.temperature,
            max_tokens: config.agent.max_tokens,
            max_input_chars: config.agent.max_input_chars,
        })
    }

    /// Summarise article text, returning the raw structured summary.
    ///
    /// Input is prefix-truncated to the configured character budget before
    /// it is sent; the cut is not sentence-aware.
    pub async fn summarize(&self, content: &str) -> Result<String, SummarizationError> {
        let truncated = truncate_chars(content, self.max_input_chars);
        debug!(
            sent_chars = truncated.chars().count(),
            total_chars = content.chars().count(),
            model = %self.model,
            "requesting summary"
        );

        let request = ChatRequest {
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: format!("Summarize this paper:\n\n{}", truncated),
                },
            ],
        };

        let client = Client::builder().timeout(SUMMARIZE_TIMEOUT).build()?;
        let response = client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SummarizationError::Service { status, body });
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or(SummarizationError::EmptyResponse)
    }
}

/// Cut `text` down to at most `max_chars` characters (not bytes)
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_never_exceeds_the_budget() {
        let text = "abcdefghij".repeat(1000);
        assert_eq!(truncate_chars(&text, 6000).chars().count(), 6000);
        assert_eq!(truncate_chars(&text, 20_000), text.as_str());
        assert_eq!(truncate_chars("", 6000), "");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        // Multibyte input must be cut between characters, not inside one
        let text = "åäö".repeat(500);
        let cut = truncate_chars(&text, 100);
        assert_eq!(cut.chars().count(), 100);
        assert!(text.is_char_boundary(cut.len()));
    }

    #[test]
    fn system_prompt_names_all_sections() {
        for section in [
            "**Title**",
            "**Authors**",
            "**Abstract Summary**",
            "**Key Findings**",
            "**Methodology**",
            "**Conclusions**",
        ] {
            assert!(SYSTEM_PROMPT.contains(section), "missing {section}");
        }
    }
}
