//! Content retrieval for selected search results.
//!
//! Strategies are tried in order: the Firecrawl scrape service first, then a
//! plain HTTP GET with a browser user-agent. The first success wins; the
//! result is tagged with the strategy that produced it.

use crate::config::Config;
use reqwest::Client;
use scraper::{Html, Selector};
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

const SCRAPE_ENDPOINT: &str = "https://api.firecrawl.dev/v1/scrape";

/// Browser-like User-Agent for the plain-GET fallback
const FALLBACK_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Timeout for the scrape service round trip
const SCRAPE_TIMEOUT: Duration = Duration::from_secs(60);

/// Timeout for the plain-GET fallback
const FALLBACK_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetched text shorter than this (after trimming) is rejected rather than
/// passed on to the summariser.
const MIN_CONTENT_CHARS: usize = 100;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("all fetch strategies failed: {0}")]
    AllStrategiesFailed(String),
    #[error("fetched content too short to summarise ({length} characters)")]
    InsufficientContent { length: usize },
}

/// Failure of a single retrieval strategy; aggregated into
/// [`FetchError::AllStrategiesFailed`] once every strategy has been tried.
#[derive(Error, Debug)]
enum StrategyError {
    #[error("missing API key")]
    MissingKey,
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("service error: {0}")]
    Service(String),
}

/// Extracted content for a selected result
#[derive(Debug, Clone)]
pub struct FetchedContent {
    /// Main text content
    pub text: String,
    /// The link the content was fetched from
    pub source_link: String,
    /// Which retrieval strategy produced the text
    pub strategy: &'static str,
}

/// One way of retrieving page text
#[derive(Debug, Clone, Copy)]
enum Strategy {
    Firecrawl,
    HttpGet,
}

impl Strategy {
    fn name(&self) -> &'static str {
        match self {
            Strategy::Firecrawl => "firecrawl",
            Strategy::HttpGet => "http_get",
        }
    }
}

/// Retrieves the textual content behind a result link
pub struct ContentFetcher {
    firecrawl_key: Option<String>,
}

impl ContentFetcher {
    /// The crawl credential is optional: without it the plain-GET fallback
    /// is still available.
    pub fn new(config: &Config) -> Self {
        Self {
            firecrawl_key: config.api.firecrawl_key.clone(),
        }
    }

    /// Fetch the content behind `link`, trying each strategy in order
    pub async fn fetch(&self, link: &str) -> Result<FetchedContent, FetchError> {
        let mut failures: Vec<String> = Vec::new();

        for strategy in [Strategy::Firecrawl, Strategy::HttpGet] {
            match self.try_strategy(strategy, link).await {
                Ok(text) => {
                    let length = check_length(&text)?;
                    debug!(strategy = strategy.name(), chars = length, "content fetched");
                    return Ok(FetchedContent {
                        text,
                        source_link: link.to_string(),
                        strategy: strategy.name(),
                    });
                }
                Err(error) => {
                    warn!(strategy = strategy.name(), %error, "fetch strategy failed");
                    failures.push(format!("{}: {}", strategy.name(), error));
                }
            }
        }

        Err(FetchError::AllStrategiesFailed(failures.join("; ")))
    }

    async fn try_strategy(&self, strategy: Strategy, link: &str) -> Result<String, StrategyError> {
        match strategy {
            Strategy::Firecrawl => self.scrape(link).await,
            Strategy::HttpGet => plain_get(link).await,
        }
    }

    /// Primary path: the external scrape service
    async fn scrape(&self, link: &str) -> Result<String, StrategyError> {
        let api_key = self.firecrawl_key.as_deref().ok_or(StrategyError::MissingKey)?;

        let client = Client::builder().timeout(SCRAPE_TIMEOUT).build()?;
        let response = client
            .post(SCRAPE_ENDPOINT)
            .bearer_auth(api_key)
            .json(&json!({
                "url": link,
                "formats": ["markdown"],
                "onlyMainContent": true,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StrategyError::Service(format!("{}: {}", status, body)));
        }

        let payload: Value = response.json().await?;
        if payload.get("success").and_then(Value::as_bool) == Some(false) {
            let message = payload
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("scrape rejected")
                .to_string();
            return Err(StrategyError::Service(message));
        }

        Ok(scrape_text(&payload))
    }
}

/// Fallback path: plain GET with a browser user-agent, raw body as content.
/// HTML bodies get readable-text extraction first.
async fn plain_get(link: &str) -> Result<String, StrategyError> {
    let client = Client::builder()
        .user_agent(FALLBACK_USER_AGENT)
        .timeout(FALLBACK_TIMEOUT)
        .build()?;

    let response = client.get(link).send().await?;
    let is_html = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.contains("html"))
        .unwrap_or(false);
    let body = response.text().await?;

    if is_html || body.trim_start().starts_with('<') {
        let text = extract_text(&Html::parse_document(&body));
        if !text.trim().is_empty() {
            return Ok(text);
        }
    }

    Ok(body)
}

/// Reject near-empty content before it reaches the summariser
fn check_length(text: &str) -> Result<usize, FetchError> {
    let length = text.trim().chars().count();
    if length < MIN_CONTENT_CHARS {
        return Err(FetchError::InsufficientContent { length });
    }
    Ok(length)
}

/// Pull the text out of a scrape-service payload.
///
/// Known fields are checked in order under the `data` envelope (or the top
/// level); if none is present the whole payload is stringified as a last
/// resort.
fn scrape_text(payload: &Value) -> String {
    let data = payload.get("data").unwrap_or(payload);

    for key in ["content", "markdown", "text"] {
        if let Some(text) = data.get(key).and_then(Value::as_str) {
            if !text.trim().is_empty() {
                return text.to_string();
            }
        }
    }

    payload.to_string()
}

/// Extract readable text content from the page
fn extract_text(document: &Html) -> String {
    // Try to find main content areas first
    let main_selectors = ["article", "main", "[role='main']", ".content", "#content"];

    for selector_str in main_selectors {
        if let Ok(selector) = Selector::parse(selector_str) {
            if let Some(element) = document.select(&selector).next() {
                let text = extract_text_from_element(&Html::parse_fragment(&element.html()));
                if !text.trim().is_empty() {
                    return text;
                }
            }
        }
    }

    // Fall back to extracting from body, excluding scripts/styles
    extract_text_from_element(document)
}

/// Extract text from paragraphs and headings, excluding scripts and styles
fn extract_text_from_element(document: &Html) -> String {
    let content_selector = Selector::parse("p, h1, h2, h3, h4, h5, h6, li").unwrap();

    let mut paragraphs: Vec<String> = Vec::new();

    for element in document.select(&content_selector) {
        let text: String = element.text().collect::<Vec<_>>().join(" ");
        let cleaned = text.split_whitespace().collect::<Vec<_>>().join(" ");

        if !cleaned.is_empty() && cleaned.len() > 20 {
            paragraphs.push(cleaned);
        }
    }

    paragraphs.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scrape_text_prefers_content_then_markdown_then_text() {
        let payload = json!({"data": {"content": "from content", "markdown": "from markdown"}});
        assert_eq!(scrape_text(&payload), "from content");

        let payload = json!({"data": {"markdown": "from markdown", "text": "from text"}});
        assert_eq!(scrape_text(&payload), "from markdown");

        let payload = json!({"data": {"text": "from text"}});
        assert_eq!(scrape_text(&payload), "from text");
    }

    #[test]
    fn scrape_text_reads_top_level_fields() {
        let payload = json!({"content": "no data envelope"});
        assert_eq!(scrape_text(&payload), "no data envelope");
    }

    #[test]
    fn scrape_text_stringifies_unknown_shapes() {
        let payload = json!({"data": {"html": "<p>only html</p>"}});
        let text = scrape_text(&payload);
        assert!(text.contains("only html"));
    }

    #[test]
    fn extract_text_prefers_article_content() {
        let html = Html::parse_document(
            "<html><body>\
             <nav><li>Navigation item that is long enough</li></nav>\
             <article><p>The actual article body, long enough to keep.</p></article>\
             </body></html>",
        );
        let text = extract_text(&html);
        assert!(text.contains("actual article body"));
        assert!(!text.contains("Navigation item"));
    }

    #[test]
    fn extract_text_skips_short_fragments() {
        let html = Html::parse_document("<html><body><p>tiny</p></body></html>");
        assert!(extract_text(&html).is_empty());
    }

    #[test]
    fn short_content_is_rejected() {
        assert!(matches!(
            check_length("   a handful of words   "),
            Err(FetchError::InsufficientContent { .. })
        ));
        // Whitespace padding does not count towards the threshold
        let padded = format!("{}{}", " ".repeat(200), "x".repeat(99));
        assert!(matches!(
            check_length(&padded),
            Err(FetchError::InsufficientContent { length: 99 })
        ));
        assert_eq!(check_length(&"y".repeat(100)).unwrap(), 100);
    }

    #[test]
    fn strategy_names_are_stable() {
        assert_eq!(Strategy::Firecrawl.name(), "firecrawl");
        assert_eq!(Strategy::HttpGet.name(), "http_get");
    }
}
