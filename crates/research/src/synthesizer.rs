//! Extract learnings and follow-up questions from one query's documents.

use providers::{complete_as, LanguageModel};
use schemars::JsonSchema;
use serde::Deserialize;
use shared::agent_api::ChatMessage;
use shared::research::{ResearchError, SearchResult, SynthesisOutcome};

use crate::prompts;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SerpResultResponse {
    pub learnings: Vec<String>,
    #[serde(rename = "followUpQuestions")]
    pub follow_up_questions: Vec<String>,
}

pub async fn try_synthesize(
    model: &dyn LanguageModel,
    query: &str,
    results: &[SearchResult],
    learnings_cap: usize,
    follow_up_cap: usize,
) -> Result<SynthesisOutcome, ResearchError> {
    let messages = vec![
        ChatMessage::system(prompts::system_prompt()),
        ChatMessage::user(prompts::synthesis_prompt(
            query,
            results,
            learnings_cap,
            follow_up_cap,
        )),
    ];
    let response: SerpResultResponse =
        complete_as(model, messages)
            .await
            .map_err(|e| ResearchError::Synthesis {
                query: query.to_string(),
                cause: format!("{:#}", e),
            })?;

    Ok(SynthesisOutcome {
        learnings: non_blank(response.learnings, learnings_cap),
        follow_up_questions: non_blank(response.follow_up_questions, follow_up_cap),
    })
}

/// Like [`try_synthesize`], but a failure yields an empty outcome.
pub async fn synthesize(
    model: &dyn LanguageModel,
    query: &str,
    results: &[SearchResult],
    learnings_cap: usize,
    follow_up_cap: usize,
) -> SynthesisOutcome {
    match try_synthesize(model, query, results, learnings_cap, follow_up_cap).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::warn!(error = %e, "synthesis failed");
            SynthesisOutcome::empty()
        }
    }
}

fn non_blank(items: Vec<String>, cap: usize) -> Vec<String> {
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .take(cap)
        .collect()
}
