//! Research - recursive deep research over a language model and a web search provider
//!
//! A run goes through five stages:
//! - clarify: optional follow-up questions for the user
//! - plan: SERP queries for a topic
//! - search + synthesize: learnings and follow-up questions per query
//! - walk: breadth/depth recursion over follow-up topics
//! - report: a long markdown document with a Sources section
//!
//! Every stage degrades to an empty result on failure, so a run always
//! returns a [`Report`].

pub mod budget;
pub mod clarifier;
pub mod planner;
pub mod prompts;
pub mod report;
pub mod synthesizer;
pub mod walker;

#[cfg(test)]
mod testing;

pub use budget::ResearchBudget;
pub use report::REPORT_FAILURE_SENTINEL;
pub use walker::{child_breadth, ResearchWalker, WalkOptions};

use providers::{LanguageModel, SearchProvider};
use shared::events::ResearchEvent;
use shared::research::{Report, ResearchAccumulator, ResearchOutcome, ResearchStats};
use shared::settings::ResearchSettings;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc::UnboundedSender;
use tracing::Instrument;
use uuid::Uuid;

/// Entry point wiring the pipeline to its collaborators.
pub struct DeepResearchAgent {
    settings: ResearchSettings,
    model: Arc<dyn LanguageModel>,
    search: Arc<dyn SearchProvider>,
}

impl DeepResearchAgent {
    pub fn new(
        settings: ResearchSettings,
        model: Arc<dyn LanguageModel>,
        search: Arc<dyn SearchProvider>,
    ) -> Self {
        Self {
            settings,
            model,
            search,
        }
    }

    pub fn settings(&self) -> &ResearchSettings {
        &self.settings
    }

    /// Clarifying questions for `topic`; empty when the model fails.
    pub async fn clarify(
        &self,
        topic: &str,
        events: Option<&UnboundedSender<ResearchEvent>>,
    ) -> Vec<String> {
        let questions = clarifier::clarify(
            &*self.model,
            topic,
            self.settings.max_clarifying_questions,
            &self.settings.language,
        )
        .await;
        if let Some(tx) = events {
            let _ = tx.send(ResearchEvent::ClarifyingQuestions {
                questions: questions.clone(),
            });
        }
        questions
    }

    /// Full run: compose the topic from the request and the answered
    /// clarifying questions, walk, deduplicate and write the report.
    pub async fn research(
        &self,
        request: &str,
        clarifications: &[(String, String)],
        events: Option<UnboundedSender<ResearchEvent>>,
    ) -> ResearchOutcome {
        let topic = prompts::compose_root_topic(request, clarifications);
        if let Some(tx) = &events {
            let _ = tx.send(ResearchEvent::TopicComposed {
                topic: topic.clone(),
            });
        }
        self.run(
            topic,
            self.settings.breadth,
            self.settings.depth,
            events,
        )
        .await
    }

    /// Research `topic` directly, without clarification or progress events.
    pub async fn run_deep_research(&self, topic: &str, breadth: usize, depth: usize) -> Report {
        self.run(topic.to_string(), breadth, depth, None)
            .await
            .report
    }

    async fn run(
        &self,
        topic: String,
        breadth: usize,
        depth: usize,
        events: Option<UnboundedSender<ResearchEvent>>,
    ) -> ResearchOutcome {
        let run_id = Uuid::new_v4();
        let breadth = breadth.max(1);
        let depth = depth.max(1);
        let span = tracing::info_span!("research", %run_id, breadth, depth);

        async move {
            let started = Instant::now();
            let emit = |event: ResearchEvent| {
                if let Some(tx) = &events {
                    let _ = tx.send(event);
                }
            };
            emit(ResearchEvent::Started {
                run_id,
                at: chrono::Utc::now(),
                breadth,
                depth,
            });
            tracing::info!(model = self.model.model_name(), "research run started");

            let budget = Arc::new(ResearchBudget::from_settings(&self.settings));
            let walker = ResearchWalker::new(
                self.model.clone(),
                self.search.clone(),
                WalkOptions::from_settings(&self.settings),
            )
            .with_budget(budget.clone())
            .with_events(events.clone());

            let found = walker
                .walk(topic.clone(), breadth, depth, ResearchAccumulator::new())
                .await
                .deduplicated();
            tracing::info!(
                learnings = found.learnings.len(),
                urls = found.visited_urls.len(),
                "research walk finished"
            );
            emit(ResearchEvent::WalkFinished {
                learnings: found.learnings.len(),
                urls: found.visited_urls.len(),
            });
            if found.learnings.is_empty() {
                tracing::warn!("no learnings gathered");
                emit(ResearchEvent::NoFindings);
            }

            let report = report::compile(
                &*self.model,
                self.settings.temperature,
                &topic,
                &found.learnings,
                &found.visited_urls,
            )
            .await;
            emit(ResearchEvent::ReportReady {
                chars: report.body.chars().count(),
                sources: report.sources.len(),
            });

            let stats = ResearchStats {
                queries_planned: walker.queries_planned(),
                searches_issued: budget.searches_issued(),
                degraded_branches: walker.degraded_branches(),
                budget_exhausted: budget.was_exhausted(),
                elapsed_ms: started.elapsed().as_millis() as u64,
            };
            tracing::info!(
                searches = stats.searches_issued,
                degraded = stats.degraded_branches,
                elapsed_ms = stats.elapsed_ms,
                "research run complete"
            );

            ResearchOutcome {
                topic,
                report,
                learnings: found.learnings,
                visited_urls: found.visited_urls,
                stats,
            }
        }
        .instrument(span)
        .await
    }
}
