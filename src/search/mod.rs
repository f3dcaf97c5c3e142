//! Web-search augmentation
//!
//! The orchestrator asks a [`SearchAugmenter`] for supporting text before it
//! builds a generative prompt. Having no augmenter, or getting `None` back, is
//! normal. Errors are logged by the caller and otherwise ignored.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::utils::Result;

pub const MAX_TITLE_CHARS: usize = 100;
pub const MAX_SNIPPET_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
    /// Search engine that produced the hit
    pub source: String,
}

impl SearchResult {
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        snippet: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            snippet: snippet.into(),
            source: source.into(),
        }
    }
}

#[async_trait]
pub trait SearchAugmenter: Send + Sync {
    /// Supporting text for `query`, or `None` when there is nothing useful.
    async fn augment(&self, query: &str) -> Result<Option<String>>;
}

/// Renders search hits as a numbered plain-text block for a prompt.
///
/// Titles and snippets are whitespace-collapsed and truncated. Returns `None`
/// when there are no hits.
pub fn format_search_results(results: &[SearchResult]) -> Option<String> {
    if results.is_empty() {
        return None;
    }

    let mut out = String::from("Web search results:\n");
    for (i, result) in results.iter().enumerate() {
        let title = truncate_chars(&collapse_whitespace(&result.title), MAX_TITLE_CHARS);
        let snippet = truncate_chars(&collapse_whitespace(&result.snippet), MAX_SNIPPET_CHARS);
        out.push_str(&format!("{}. {title} ({})\n", i + 1, result.source));
        if !result.url.is_empty() {
            out.push_str(&format!("   {}\n", result.url));
        }
        if !snippet.is_empty() && snippet != title {
            out.push_str(&format!("   {snippet}\n"));
        }
    }
    Some(out.trim_end().to_string())
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
