//! Recursive breadth/depth expansion of a research topic.
//!
//! Each node plans up to `breadth` queries, searches and synthesizes each
//! one, and recurses on a child topic built from the query's research goal
//! and follow-up questions. Siblings start from the same snapshot of the
//! accumulator and hand back only what they added; the node merges those
//! deltas in query order. Sibling queries are processed through an ordered
//! bounded fan-out, so the result does not depend on the concurrency level.

use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt};
use providers::{LanguageModel, SearchProvider};
use shared::events::ResearchEvent;
use shared::research::{ResearchAccumulator, ResearchError, ResearchQuery, SynthesisOutcome};
use shared::settings::ResearchSettings;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

use crate::budget::ResearchBudget;
use crate::{planner, prompts, synthesizer};

#[derive(Debug, Clone)]
pub struct WalkOptions {
    pub learnings_cap: usize,
    pub search_limit: usize,
    pub search_timeout_ms: u64,
    pub concurrency: usize,
}

impl WalkOptions {
    pub fn from_settings(settings: &ResearchSettings) -> Self {
        Self {
            learnings_cap: settings.learnings_cap,
            search_limit: settings.search_limit,
            search_timeout_ms: settings.search_timeout_ms,
            concurrency: settings.concurrency,
        }
    }
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self::from_settings(&ResearchSettings::default())
    }
}

/// Breadth used by the children of a node with `breadth`.
pub fn child_breadth(breadth: usize) -> usize {
    (breadth / 2).max(1)
}

pub struct ResearchWalker {
    model: Arc<dyn LanguageModel>,
    search: Arc<dyn SearchProvider>,
    options: WalkOptions,
    budget: Arc<ResearchBudget>,
    events: Option<UnboundedSender<ResearchEvent>>,
    queries_planned: AtomicUsize,
    degraded: AtomicUsize,
}

impl ResearchWalker {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        search: Arc<dyn SearchProvider>,
        options: WalkOptions,
    ) -> Self {
        Self {
            model,
            search,
            options,
            budget: Arc::new(ResearchBudget::unlimited()),
            events: None,
            queries_planned: AtomicUsize::new(0),
            degraded: AtomicUsize::new(0),
        }
    }

    pub fn with_budget(mut self, budget: Arc<ResearchBudget>) -> Self {
        self.budget = budget;
        self
    }

    pub fn with_events(mut self, events: Option<UnboundedSender<ResearchEvent>>) -> Self {
        self.events = events;
        self
    }

    pub fn queries_planned(&self) -> usize {
        self.queries_planned.load(Ordering::SeqCst)
    }

    /// Branches that fell back to an empty result.
    pub fn degraded_branches(&self) -> usize {
        self.degraded.load(Ordering::SeqCst)
    }

    /// Expand `topic` and return `acc` extended with everything found below it.
    ///
    /// `depth` must be at least 1; the node always plans one level of
    /// queries and only recurses while the child depth stays positive.
    pub fn walk(
        &self,
        topic: String,
        breadth: usize,
        depth: usize,
        acc: ResearchAccumulator,
    ) -> BoxFuture<'_, ResearchAccumulator> {
        async move {
            if let Err(e) = self.budget.check() {
                self.budget_exhausted(&e);
                return acc;
            }

            let queries =
                match planner::try_plan_queries(&*self.model, &topic, &acc.learnings, breadth)
                    .await
                {
                    Ok(queries) => queries,
                    Err(e) => {
                        self.degrade(&e);
                        Vec::new()
                    }
                };
            tracing::info!(depth, breadth, queries = queries.len(), "planned queries");
            self.queries_planned
                .fetch_add(queries.len(), Ordering::SeqCst);
            self.emit(ResearchEvent::QueriesPlanned {
                depth,
                queries: queries.clone(),
            });
            if queries.is_empty() {
                return acc;
            }

            let base = &acc;
            let branches: Vec<_> = queries
                .into_iter()
                .map(|query| self.explore(query, breadth, depth, base))
                .collect();
            let deltas: Vec<ResearchAccumulator> = futures::stream::iter(branches)
                .buffered(self.options.concurrency.max(1))
                .collect()
                .await;

            let mut acc = acc;
            for delta in deltas {
                acc.absorb(delta);
            }
            acc
        }
        .boxed()
    }

    /// Search, synthesize and recurse for one query; returns what it added on top of `base`.
    async fn explore(
        &self,
        query: ResearchQuery,
        breadth: usize,
        depth: usize,
        base: &ResearchAccumulator,
    ) -> ResearchAccumulator {
        if let Err(e) = self.budget.try_acquire_search() {
            self.budget_exhausted(&e);
            return ResearchAccumulator::new();
        }

        let results = match self
            .search
            .search(
                &query.query,
                self.options.search_limit,
                self.options.search_timeout_ms,
            )
            .await
        {
            Ok(results) => results,
            Err(e) => {
                self.degrade(&ResearchError::Search {
                    query: query.query.clone(),
                    cause: format!("{:#}", e),
                });
                Vec::new()
            }
        };
        let urls: Vec<String> = results
            .iter()
            .map(|r| r.url.clone())
            .filter(|u| !u.is_empty())
            .collect();
        tracing::debug!(query = %query.query, urls = urls.len(), "search completed");
        self.emit(ResearchEvent::SearchCompleted {
            query: query.query.clone(),
            urls: urls.clone(),
        });

        let outcome = match synthesizer::try_synthesize(
            &*self.model,
            &query.query,
            &results,
            self.options.learnings_cap,
            breadth,
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                self.degrade(&e);
                SynthesisOutcome::empty()
            }
        };
        tracing::debug!(
            query = %query.query,
            learnings = outcome.learnings.len(),
            follow_ups = outcome.follow_up_questions.len(),
            "learnings extracted"
        );
        self.emit(ResearchEvent::LearningsExtracted {
            query: query.query.clone(),
            learnings: outcome.learnings.len(),
            follow_ups: outcome.follow_up_questions.len(),
        });

        let mut branch = base.clone();
        branch.record(urls, outcome.learnings);

        let child_depth = depth.saturating_sub(1);
        if child_depth > 0 {
            let topic =
                prompts::compose_child_topic(&query.research_goal, &outcome.follow_up_questions);
            branch = self
                .walk(topic, child_breadth(breadth), child_depth, branch)
                .await;
        }

        branch.delta_since(base)
    }

    fn degrade(&self, error: &ResearchError) {
        tracing::warn!(stage = error.stage().display_name(), error = %error, "branch degraded");
        self.degraded.fetch_add(1, Ordering::SeqCst);
        self.emit(ResearchEvent::degraded(error));
    }

    fn budget_exhausted(&self, error: &ResearchError) {
        if self.budget.mark_exhausted() {
            tracing::warn!(error = %error, "stopping expansion");
            self.emit(ResearchEvent::BudgetExhausted {
                reason: error.to_string(),
            });
        }
    }

    fn emit(&self, event: ResearchEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }
}
