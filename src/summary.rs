//! Summary struct - the structured text produced by the LLM agent, together
//! with the provenance needed for display and report export.

use chrono::{DateTime, Utc};

/// A generated summary for one search result.
///
/// `text` is the raw structured blob from the model, organised under
/// `**Heading**` section markers (Title, Authors, Abstract Summary, Key
/// Findings, Methodology, Conclusions). Sections the model omitted are
/// simply absent; nothing here validates their presence.
#[derive(Debug, Clone)]
pub struct Summary {
    /// Title of the summarised paper (from the search result)
    pub title: String,
    /// Link the content was fetched from
    pub source_link: String,
    /// The query that produced the result
    pub query: String,
    /// The structured summary text
    pub text: String,
    /// When the summary was generated
    pub generated_at: DateTime<Utc>,
}

impl Summary {
    pub fn new(title: String, source_link: String, query: String, text: String) -> Self {
        Self {
            title,
            source_link,
            query,
            text,
            generated_at: Utc::now(),
        }
    }
}
