//! Query planning: turn a topic into distinct search queries.

use providers::{complete_as, LanguageModel};
use schemars::JsonSchema;
use serde::Deserialize;
use shared::agent_api::ChatMessage;
use shared::research::{ResearchError, ResearchQuery};

use crate::prompts;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct PlannedQuery {
    /// The SERP query
    pub query: String,
    /// What this query should uncover and how to go deeper once results are in
    #[serde(rename = "researchGoal")]
    pub research_goal: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SerpQueryResponse {
    pub queries: Vec<PlannedQuery>,
}

/// Plan at most `count` queries for `topic`, steered by prior `learnings`.
pub async fn try_plan_queries(
    model: &dyn LanguageModel,
    topic: &str,
    learnings: &[String],
    count: usize,
) -> Result<Vec<ResearchQuery>, ResearchError> {
    if count == 0 {
        return Ok(Vec::new());
    }
    let messages = vec![
        ChatMessage::system(prompts::system_prompt()),
        ChatMessage::user(prompts::plan_prompt(topic, learnings, count)),
    ];
    let response: SerpQueryResponse = complete_as(model, messages)
        .await
        .map_err(|e| ResearchError::Planning(format!("{:#}", e)))?;

    Ok(response
        .queries
        .into_iter()
        .filter(|q| !q.query.trim().is_empty() && !q.research_goal.trim().is_empty())
        .take(count)
        .map(|q| ResearchQuery::new(q.query.trim(), q.research_goal.trim()))
        .collect())
}

/// Like [`try_plan_queries`], but a failure yields no queries.
pub async fn plan_queries(
    model: &dyn LanguageModel,
    topic: &str,
    learnings: &[String],
    count: usize,
) -> Vec<ResearchQuery> {
    match try_plan_queries(model, topic, learnings, count).await {
        Ok(queries) => queries,
        Err(e) => {
            tracing::warn!(error = %e, "query planning failed");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{queries_json, ScriptedModel};
    use serde_json::json;

    #[tokio::test]
    async fn test_plan_respects_count() {
        let model = ScriptedModel::new().plan(|_| Some(queries_json("q", 6)));
        let queries = plan_queries(&model, "topic", &[], 4).await;
        assert_eq!(queries.len(), 4);
        assert_eq!(queries[0], ResearchQuery::new("q-0", "goal for q-0"));
        assert_eq!(queries[3].query, "q-3");
    }

    #[tokio::test]
    async fn test_incomplete_entries_dropped() {
        let model = ScriptedModel::new().plan(|_| {
            Some(json!({ "queries": [
                { "query": "", "researchGoal": "goal" },
                { "query": "solid state", "researchGoal": " " },
                { "query": "sodium ion", "researchGoal": "compare costs" }
            ]}))
        });
        let queries = plan_queries(&model, "topic", &[], 3).await;
        assert_eq!(queries, vec![ResearchQuery::new("sodium ion", "compare costs")]);
    }

    #[tokio::test]
    async fn test_prior_learnings_reach_the_prompt() {
        let model = ScriptedModel::new().plan(|_| Some(queries_json("q", 1)));
        plan_queries(&model, "topic", &["Cobalt is scarce".to_string()], 1).await;
        assert!(model.calls_for("SerpQueryResponse")[0].contains("Cobalt is scarce"));
    }

    #[tokio::test]
    async fn test_failure_yields_no_queries() {
        let model = ScriptedModel::new();
        assert!(plan_queries(&model, "topic", &[], 3).await.is_empty());
        assert!(matches!(
            try_plan_queries(&model, "topic", &[], 3).await,
            Err(ResearchError::Planning(_))
        ));
    }

    #[tokio::test]
    async fn test_zero_count_skips_the_model() {
        let model = ScriptedModel::new().plan(|_| Some(queries_json("q", 3)));
        assert!(plan_queries(&model, "topic", &[], 0).await.is_empty());
        assert!(model.calls.lock().is_empty());
    }
}
