//! Progress events emitted while a research run is in flight.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::research::{ResearchError, ResearchQuery};

/// Pipeline stage an event or failure belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResearchStage {
    Clarify,
    Plan,
    Search,
    Synthesize,
    Report,
    Budget,
}

impl ResearchStage {
    pub fn display_name(&self) -> &'static str {
        match self {
            ResearchStage::Clarify => "Clarify",
            ResearchStage::Plan => "Plan",
            ResearchStage::Search => "Search",
            ResearchStage::Synthesize => "Synthesize",
            ResearchStage::Report => "Report",
            ResearchStage::Budget => "Budget",
        }
    }
}

/// Progress update for whoever is watching a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ResearchEvent {
    /// Run accepted
    Started {
        run_id: Uuid,
        at: DateTime<Utc>,
        breadth: usize,
        depth: usize,
    },
    /// Clarifier produced questions for the user
    ClarifyingQuestions { questions: Vec<String> },
    /// Root topic assembled from the request and the answers
    TopicComposed { topic: String },
    /// Planner returned queries for one tree node
    QueriesPlanned {
        depth: usize,
        queries: Vec<ResearchQuery>,
    },
    SearchCompleted { query: String, urls: Vec<String> },
    LearningsExtracted {
        query: String,
        learnings: usize,
        follow_ups: usize,
    },
    /// A branch fell back to an empty result
    BranchDegraded {
        stage: ResearchStage,
        message: String,
    },
    BudgetExhausted { reason: String },
    /// Walk finished; counts are after deduplication
    WalkFinished { learnings: usize, urls: usize },
    NoFindings,
    ReportReady { chars: usize, sources: usize },
}

impl ResearchEvent {
    pub fn degraded(error: &ResearchError) -> Self {
        ResearchEvent::BranchDegraded {
            stage: error.stage(),
            message: error.to_string(),
        }
    }

    /// One-line summary for terminal output.
    pub fn summary(&self) -> String {
        match self {
            ResearchEvent::Started { breadth, depth, .. } => {
                format!("Starting research (breadth {}, depth {})", breadth, depth)
            }
            ResearchEvent::ClarifyingQuestions { questions } => {
                format!("{} clarifying question(s) generated", questions.len())
            }
            ResearchEvent::TopicComposed { .. } => "Research topic composed".to_string(),
            ResearchEvent::QueriesPlanned { depth, queries } => {
                format!("Planned {} quer(ies) at depth {}", queries.len(), depth)
            }
            ResearchEvent::SearchCompleted { query, urls } => {
                format!("Searched \"{}\" ({} source(s))", query, urls.len())
            }
            ResearchEvent::LearningsExtracted {
                query, learnings, ..
            } => format!("Extracted {} learning(s) from \"{}\"", learnings, query),
            ResearchEvent::BranchDegraded { stage, message } => {
                format!("[{}] {}", stage.display_name(), message)
            }
            ResearchEvent::BudgetExhausted { reason } => format!("Budget exhausted: {}", reason),
            ResearchEvent::WalkFinished { learnings, urls } => {
                format!("Research complete: {} learning(s), {} source(s)", learnings, urls)
            }
            ResearchEvent::NoFindings => "No findings; the report will be thin".to_string(),
            ResearchEvent::ReportReady { chars, sources } => {
                format!("Report ready ({} chars, {} source(s))", chars, sources)
            }
        }
    }
}
