//! Follow-up questions that sharpen a research request before the walk.

use providers::{complete_as, LanguageModel};
use schemars::JsonSchema;
use serde::Deserialize;
use shared::agent_api::ChatMessage;
use shared::research::ResearchError;

use crate::prompts;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct FeedbackResponse {
    /// Follow up questions to clarify the research direction
    pub questions: Vec<String>,
}

/// Ask the model for at most `max_questions` clarifying questions.
pub async fn try_clarify(
    model: &dyn LanguageModel,
    topic: &str,
    max_questions: usize,
    language: &str,
) -> Result<Vec<String>, ResearchError> {
    if max_questions == 0 {
        return Ok(Vec::new());
    }
    let messages = vec![
        ChatMessage::system(prompts::system_prompt()),
        ChatMessage::user(prompts::clarify_prompt(topic, max_questions, language)),
    ];
    let response: FeedbackResponse = complete_as(model, messages)
        .await
        .map_err(|e| ResearchError::Clarification(format!("{:#}", e)))?;

    Ok(response
        .questions
        .into_iter()
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty())
        .take(max_questions)
        .collect())
}

/// Like [`try_clarify`], but a failure yields no questions.
pub async fn clarify(
    model: &dyn LanguageModel,
    topic: &str,
    max_questions: usize,
    language: &str,
) -> Vec<String> {
    match try_clarify(model, topic, max_questions, language).await {
        Ok(questions) => questions,
        Err(e) => {
            tracing::warn!(error = %e, "clarifier failed, continuing without questions");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedModel;
    use serde_json::json;

    #[tokio::test]
    async fn test_questions_capped_and_blank_dropped() {
        let model = ScriptedModel::new().feedback(|_| {
            Some(json!({ "questions": ["Which region?", "  ", "Timeframe?", "Budget?", "Scale?"] }))
        });
        let questions = clarify(&model, "EV battery recycling", 3, "English").await;
        assert_eq!(questions, vec!["Which region?", "Timeframe?", "Budget?"]);

        let prompt = &model.calls_for("FeedbackResponse")[0];
        assert!(prompt.contains("<query>EV battery recycling</query>"));
        assert!(prompt.contains("maximum of 3 questions"));
    }

    #[tokio::test]
    async fn test_failure_yields_no_questions() {
        let model = ScriptedModel::new();
        assert!(clarify(&model, "topic", 3, "English").await.is_empty());

        let err = try_clarify(&model, "topic", 3, "English").await.unwrap_err();
        assert!(matches!(err, ResearchError::Clarification(_)));
    }

    #[tokio::test]
    async fn test_malformed_payload_is_a_failure() {
        let model = ScriptedModel::new().feedback(|_| Some(json!({ "questions": "not a list" })));
        assert!(try_clarify(&model, "topic", 3, "English").await.is_err());
    }

    #[tokio::test]
    async fn test_zero_cap_skips_the_model() {
        let model = ScriptedModel::new();
        assert!(clarify(&model, "topic", 0, "English").await.is_empty());
        assert!(model.calls.lock().is_empty());
    }
}
