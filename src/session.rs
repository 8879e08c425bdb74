//! Interaction state and pipeline sequencing.
//!
//! The session owns the current result set, the selection, and the
//! in-progress flag, and advances them through discrete user actions. The
//! transition methods are synchronous and side-effect free so the state
//! machine is testable without a terminal or network.

use crate::agent::{SummarizationError, Summarizer};
use crate::fetch::{ContentFetcher, FetchError};
use crate::report::{self, RenderError};
use crate::search::SearchResult;
use crate::summary::Summary;
use thiserror::Error;
use tracing::warn;

/// Where the session currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    ResultsShown,
    SummaryShown,
}

/// Outcome of a pick attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pick {
    /// Selection accepted; the pipeline may start
    Accepted,
    /// A pipeline is already in flight; the pick is ignored
    Busy,
    /// The index does not point into the current result list
    Invalid,
}

/// Failure of the fetch-summarise stages. A render failure is deliberately
/// not part of this: the summary is already available at that point.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Summarize(#[from] SummarizationError),
}

/// Result of a completed pipeline: the summary, plus the rendered PDF when
/// rendering succeeded.
#[derive(Debug)]
pub struct PipelineOutput {
    pub summary: Summary,
    /// Which fetch strategy retrieved the content
    pub fetched_via: &'static str,
    pub pdf: Option<Vec<u8>>,
    pub render_error: Option<RenderError>,
}

/// Per-session interaction state, mutated only through the methods below.
///
/// Invariants: `selected`, when present, indexes into `results`;
/// `in_progress` is true only between an accepted pick and its outcome.
#[derive(Debug, Default)]
pub struct SessionState {
    pub query: String,
    pub results: Vec<SearchResult>,
    pub selected: Option<usize>,
    pub in_progress: bool,
    pub phase: Phase,
}

impl SessionState {
    /// A search completed: store its results (possibly zero), discard any
    /// previous selection.
    pub fn record_results(&mut self, query: &str, results: Vec<SearchResult>) {
        self.query = query.to_string();
        self.results = results;
        self.selected = None;
        self.in_progress = false;
        self.phase = Phase::ResultsShown;
    }

    /// Try to select result `index` for summarisation
    pub fn begin_pick(&mut self, index: usize) -> Pick {
        if self.in_progress {
            return Pick::Busy;
        }
        if index >= self.results.len() {
            return Pick::Invalid;
        }
        self.selected = Some(index);
        self.in_progress = true;
        Pick::Accepted
    }

    /// The pipeline for the current selection finished. The selection is
    /// cleared either way; on failure the result list stays available so
    /// another result can be picked without re-searching.
    pub fn finish_pick(&mut self, success: bool) {
        self.in_progress = false;
        self.selected = None;
        self.phase = if success {
            Phase::SummaryShown
        } else {
            Phase::ResultsShown
        };
    }

    /// The currently selected result, if any
    pub fn selected_result(&self) -> Option<&SearchResult> {
        self.selected.and_then(|index| self.results.get(index))
    }
}

/// Sequences fetch, summarise and render for a picked result
pub struct SessionController {
    fetcher: ContentFetcher,
    summarizer: Summarizer,
}

impl SessionController {
    pub fn new(fetcher: ContentFetcher, summarizer: Summarizer) -> Self {
        Self { fetcher, summarizer }
    }

    /// Run the full pipeline for one result. Fetch or summarise failures
    /// abort; a render failure is downgraded to a warning and the summary
    /// is still returned.
    pub async fn run_pipeline(
        &self,
        result: &SearchResult,
        query: &str,
    ) -> Result<PipelineOutput, PipelineError> {
        let content = self.fetcher.fetch(&result.link).await?;
        let fetched_via = content.strategy;
        let text = self.summarizer.summarize(&content.text).await?;

        let summary = Summary::new(
            result.title.clone(),
            content.source_link,
            query.to_string(),
            text,
        );

        let (pdf, render_error) = match report::render(&summary) {
            Ok(bytes) => (Some(bytes), None),
            Err(error) => {
                warn!(%error, "PDF rendering failed; summary is still available");
                (None, Some(error))
            }
        };

        Ok(PipelineOutput {
            summary,
            fetched_via,
            pdf,
            render_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn results(n: usize) -> Vec<SearchResult> {
        (0..n)
            .map(|i| SearchResult {
                title: format!("Paper {i}"),
                link: format!("https://example.org/{i}"),
                snippet: String::new(),
            })
            .collect()
    }

    #[test]
    fn recording_results_clears_selection() {
        let mut state = SessionState::default();
        state.record_results("quantum", results(3));
        assert_eq!(state.begin_pick(1), Pick::Accepted);

        state.record_results("quantum again", results(2));
        assert_eq!(state.selected, None);
        assert!(!state.in_progress);
        assert_eq!(state.phase, Phase::ResultsShown);
        assert_eq!(state.results.len(), 2);
    }

    #[test]
    fn zero_results_is_a_valid_outcome() {
        let mut state = SessionState::default();
        state.record_results("nothing matches", vec![]);
        assert_eq!(state.phase, Phase::ResultsShown);
        assert!(state.results.is_empty());
        assert_eq!(state.begin_pick(0), Pick::Invalid);
    }

    #[test]
    fn pick_while_in_progress_is_a_no_op() {
        let mut state = SessionState::default();
        state.record_results("quantum", results(3));
        assert_eq!(state.begin_pick(0), Pick::Accepted);
        assert!(state.in_progress);

        // Second pick must not change the selection or restart anything
        assert_eq!(state.begin_pick(2), Pick::Busy);
        assert_eq!(state.selected, Some(0));
        assert!(state.in_progress);
    }

    #[test]
    fn out_of_range_pick_is_rejected() {
        let mut state = SessionState::default();
        state.record_results("quantum", results(2));
        assert_eq!(state.begin_pick(2), Pick::Invalid);
        assert_eq!(state.selected, None);
        assert!(!state.in_progress);
    }

    #[test]
    fn failed_pipeline_returns_to_results_with_list_intact() {
        let mut state = SessionState::default();
        state.record_results("quantum", results(3));
        assert_eq!(state.begin_pick(1), Pick::Accepted);

        state.finish_pick(false);
        assert_eq!(state.phase, Phase::ResultsShown);
        assert_eq!(state.selected, None);
        assert!(!state.in_progress);
        assert_eq!(state.results.len(), 3);
    }

    #[test]
    fn successful_pipeline_clears_selection_for_a_fresh_pick() {
        let mut state = SessionState::default();
        state.record_results("quantum", results(3));
        assert_eq!(state.begin_pick(2), Pick::Accepted);

        state.finish_pick(true);
        assert_eq!(state.phase, Phase::SummaryShown);
        assert_eq!(state.selected, None);
        assert!(!state.in_progress);
        // The result list survives so the user can pick again
        assert_eq!(state.begin_pick(0), Pick::Accepted);
    }

    #[test]
    fn selected_result_follows_the_selection() {
        let mut state = SessionState::default();
        state.record_results("quantum", results(3));
        assert!(state.selected_result().is_none());
        state.begin_pick(1);
        assert_eq!(state.selected_result().unwrap().title, "Paper 1");
    }
}
