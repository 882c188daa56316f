//! Data model for the recursive research pipeline.
//!
//! These types flow between the planner, the synthesizer, the tree walker
//! and the report compiler. None of them is persisted.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::events::ResearchStage;

/// A search query paired with the reason it was chosen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchQuery {
    pub query: String,
    #[serde(rename = "researchGoal")]
    pub research_goal: String,
}

impl ResearchQuery {
    pub fn new(query: impl Into<String>, research_goal: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            research_goal: research_goal.into(),
        }
    }
}

/// One document returned by the search provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub markdown: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

/// Learnings and follow-up questions extracted from one query's results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesisOutcome {
    pub learnings: Vec<String>,
    #[serde(rename = "followUpQuestions")]
    pub follow_up_questions: Vec<String>,
}

impl SynthesisOutcome {
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Running learnings and visited URLs carried through the walk.
///
/// Entries are append-only: the accumulator never shrinks while it is
/// threaded through the tree, and duplicates are tolerated until
/// [`ResearchAccumulator::deduplicated`] is applied at the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchAccumulator {
    pub learnings: Vec<String>,
    pub visited_urls: Vec<String>,
}

impl ResearchAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(learnings: Vec<String>, visited_urls: Vec<String>) -> Self {
        Self {
            learnings,
            visited_urls,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.learnings.is_empty() && self.visited_urls.is_empty()
    }

    /// Append one query's findings.
    pub fn record(&mut self, urls: impl IntoIterator<Item = String>, learnings: Vec<String>) {
        self.visited_urls.extend(urls);
        self.learnings.extend(learnings);
    }

    /// Append everything from `delta`, keeping its order.
    pub fn absorb(&mut self, delta: ResearchAccumulator) {
        self.learnings.extend(delta.learnings);
        self.visited_urls.extend(delta.visited_urls);
    }

    /// Entries added on top of `base`.
    ///
    /// `self` must have been grown from `base` by appending only.
    pub fn delta_since(mut self, base: &ResearchAccumulator) -> ResearchAccumulator {
        debug_assert!(self.learnings.starts_with(&base.learnings));
        debug_assert!(self.visited_urls.starts_with(&base.visited_urls));
        let learnings = self
            .learnings
            .split_off(base.learnings.len().min(self.learnings.len()));
        let visited_urls = self
            .visited_urls
            .split_off(base.visited_urls.len().min(self.visited_urls.len()));
        ResearchAccumulator {
            learnings,
            visited_urls,
        }
    }

    /// Drop exact duplicates, keeping the first occurrence of each entry.
    pub fn deduplicated(self) -> ResearchAccumulator {
        ResearchAccumulator {
            learnings: dedup_in_order(self.learnings),
            visited_urls: dedup_in_order(self.visited_urls),
        }
    }
}

fn dedup_in_order(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::with_capacity(items.len());
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

/// Final research document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    /// Markdown body, including the trailing Sources section
    pub body: String,
    pub sources: Vec<String>,
}

/// Counters describing how a run went.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchStats {
    pub queries_planned: usize,
    pub searches_issued: usize,
    pub degraded_branches: usize,
    pub budget_exhausted: bool,
    pub elapsed_ms: u64,
}

/// Everything a full run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchOutcome {
    pub topic: String,
    pub report: Report,
    pub learnings: Vec<String>,
    pub visited_urls: Vec<String>,
    pub stats: ResearchStats,
}

/// Failures that degrade a branch of the research tree.
///
/// These never reach the caller of a run: each one is logged, reported as
/// a progress event and replaced by an empty result at the layer where it
/// happened.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResearchError {
    #[error("clarification failed: {0}")]
    Clarification(String),

    #[error("query planning failed: {0}")]
    Planning(String),

    #[error("search failed for \"{query}\": {cause}")]
    Search { query: String, cause: String },

    #[error("synthesis failed for \"{query}\": {cause}")]
    Synthesis { query: String, cause: String },

    #[error("report compilation failed: {0}")]
    Report(String),

    #[error("research budget exhausted: {0}")]
    BudgetExhausted(String),
}

impl ResearchError {
    pub fn stage(&self) -> ResearchStage {
        match self {
            ResearchError::Clarification(_) => ResearchStage::Clarify,
            ResearchError::Planning(_) => ResearchStage::Plan,
            ResearchError::Search { .. } => ResearchStage::Search,
            ResearchError::Synthesis { .. } => ResearchStage::Synthesize,
            ResearchError::Report(_) => ResearchStage::Report,
            ResearchError::BudgetExhausted(_) => ResearchStage::Budget,
        }
    }
}
