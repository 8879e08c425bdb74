//! Literature search via the SerpAPI search service.
//!
//! Maps the loosely-typed service envelope to typed results at the boundary.

use crate::config::{Config, ConfigError};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

const SEARCH_ENDPOINT: &str = "https://serpapi.com/search.json";

/// Timeout for search round trips
const SEARCH_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("search request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("search service error: {0}")]
    Service(String),
    #[error("search service returned an unrecognised response shape")]
    MalformedResponse,
}

/// Literature search backends recognised by forska
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engine {
    GoogleScholar,
    SemanticScholar,
    ArXiv,
}

impl Engine {
    pub const ALL: [Engine; 3] = [Engine::GoogleScholar, Engine::SemanticScholar, Engine::ArXiv];

    /// Human-readable name as shown in the engine picker
    pub fn label(&self) -> &'static str {
        match self {
            Engine::GoogleScholar => "Google Scholar",
            Engine::SemanticScholar => "Semantic Scholar",
            Engine::ArXiv => "arXiv",
        }
    }

    /// Identifier used by the search service (lowercase, spaces to underscores)
    pub fn serp_id(&self) -> &'static str {
        match self {
            Engine::GoogleScholar => "google_scholar",
            Engine::SemanticScholar => "semantic_scholar",
            Engine::ArXiv => "arxiv",
        }
    }

    /// Parse a user-supplied engine name (CLI flag value)
    pub fn parse(name: &str) -> Option<Engine> {
        let normalised = name.trim().to_lowercase().replace([' ', '-'], "_");
        match normalised.as_str() {
            "google_scholar" | "scholar" => Some(Engine::GoogleScholar),
            "semantic_scholar" | "semantic" => Some(Engine::SemanticScholar),
            "arxiv" => Some(Engine::ArXiv),
            _ => None,
        }
    }
}

impl std::fmt::Display for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One search hit, in the order the service returned it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub title: String,
    pub link: String,
    pub snippet: String,
}

#[derive(Debug, Deserialize)]
struct RawResult {
    title: Option<String>,
    link: Option<String>,
    snippet: Option<String>,
}

/// Response envelope from the search service.
///
/// Results usually live under `organic_results`; some engines use a plain
/// `results` key instead, so both locations are checked.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    organic_results: Option<Vec<RawResult>>,
    #[serde(default)]
    results: Option<Vec<RawResult>>,
    #[serde(default)]
    error: Option<String>,
}

impl From<RawResult> for SearchResult {
    fn from(raw: RawResult) -> Self {
        SearchResult {
            title: raw.title.unwrap_or_else(|| "No title".to_string()),
            link: raw.link.unwrap_or_else(|| "No link".to_string()),
            snippet: raw.snippet.unwrap_or_default(),
        }
    }
}

/// Create a configured HTTP client for search calls
fn create_client() -> Result<Client, reqwest::Error> {
    Client::builder().timeout(SEARCH_TIMEOUT).build()
}

/// Client for the external literature search service
pub struct SearchClient {
    api_key: String,
    result_count: u32,
    language: String,
}

impl SearchClient {
    /// Build a search client; fails if the SerpAPI credential is absent
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        let api_key = config.serpapi_key()?.to_string();
        Ok(Self {
            api_key,
            result_count: config.search.result_count,
            language: config.search.language.clone(),
        })
    }

    /// Run a literature search, preserving the service's result order
    pub async fn search(
        &self,
        query: &str,
        engine: Engine,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let client = create_client()?;
        let num = self.result_count.to_string();
        let params = [
            ("api_key", self.api_key.as_str()),
            ("engine", engine.serp_id()),
            ("q", query),
            ("num", num.as_str()),
            ("hl", self.language.as_str()),
        ];
        let response = client.get(SEARCH_ENDPOINT).query(&params).send().await?;

        let body = response.text().await?;
        let preview: String = body.chars().take(200).collect();
        debug!(engine = engine.serp_id(), bytes = body.len(), %preview, "search response received");
        parse_response(&body)
    }
}

/// Map the service envelope to an ordered result list.
///
/// Zero matches yield an empty list. An envelope with neither results key
/// is an error: the service's own message when it has one, otherwise a
/// malformed-response error.
fn parse_response(body: &str) -> Result<Vec<SearchResult>, SearchError> {
    let envelope: SearchResponse =
        serde_json::from_str(body).map_err(|_| SearchError::MalformedResponse)?;

    let raw = envelope.organic_results.or(envelope.results);
    match raw {
        Some(results) => Ok(results.into_iter().map(SearchResult::from).collect()),
        None => match envelope.error {
            // The service reports genuine zero-match queries via its error field
            Some(message) if message.to_lowercase().contains("returned any results") => Ok(vec![]),
            Some(message) => Err(SearchError::Service(message)),
            None => Err(SearchError::MalformedResponse),
        },
    }
}
