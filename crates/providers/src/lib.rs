//! Providers - the outbound collaborators of a research run
//!
//! - `LanguageModel`: free-text and schema-constrained completions
//! - `SearchProvider`: web search returning scraped markdown
//!
//! Concrete clients live in [`openai`] and [`firecrawl`]; tests and
//! embedders can plug in their own implementations.

pub mod firecrawl;
pub mod openai;
pub mod schema;

pub use firecrawl::FirecrawlClient;
pub use openai::OpenAIClient;
pub use schema::{strip_code_blocks, JsonSchemaSpec, StructuredOutput};

use anyhow::{Context, Result};
use async_trait::async_trait;
use shared::agent_api::ChatMessage;
use shared::research::SearchResult;

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Model identifier, used for logging.
    fn model_name(&self) -> &str;

    /// Plain text completion.
    async fn complete(&self, messages: Vec<ChatMessage>, temperature: Option<f32>)
        -> Result<String>;

    /// Completion constrained to `schema`. Returns the raw JSON text.
    async fn complete_structured(
        &self,
        messages: Vec<ChatMessage>,
        schema: &JsonSchemaSpec,
    ) -> Result<String>;
}

#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str, limit: usize, timeout_ms: u64)
        -> Result<Vec<SearchResult>>;
}

/// Request structured output shaped like `T` and decode it.
///
/// Decoding is the validation boundary: anything that does not match `T`
/// comes back as an error.
pub async fn complete_as<T: StructuredOutput>(
    model: &dyn LanguageModel,
    messages: Vec<ChatMessage>,
) -> Result<T> {
    let spec = JsonSchemaSpec::of::<T>();
    let raw = model.complete_structured(messages, &spec).await?;
    let cleaned = strip_code_blocks(&raw);
    serde_json::from_str::<T>(cleaned)
        .with_context(|| format!("response did not match {} schema", spec.name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemars::JsonSchema;
    use serde::Deserialize;

    struct CannedModel(&'static str);

    #[async_trait]
    impl LanguageModel for CannedModel {
        fn model_name(&self) -> &str {
            "canned"
        }

        async fn complete(&self, _messages: Vec<ChatMessage>, _t: Option<f32>) -> Result<String> {
            Ok(self.0.to_string())
        }

        async fn complete_structured(
            &self,
            _messages: Vec<ChatMessage>,
            _schema: &JsonSchemaSpec,
        ) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    #[derive(Debug, Deserialize, JsonSchema)]
    struct Questions {
        questions: Vec<String>,
    }

    #[tokio::test]
    async fn test_complete_as_decodes_fenced_json() {
        let model = CannedModel("```json\n{\"questions\": [\"Which region?\"]}\n```");
        let parsed: Questions = complete_as(&model, vec![ChatMessage::user("hi")])
            .await
            .unwrap();
        assert_eq!(parsed.questions, vec!["Which region?".to_string()]);
    }

    #[tokio::test]
    async fn test_complete_as_rejects_wrong_shape() {
        let model = CannedModel("{\"queries\": []}");
        let result: Result<Questions> = complete_as(&model, vec![ChatMessage::user("hi")]).await;
        let err = result.unwrap_err();
        assert!(err.to_string().contains("Questions"));
    }
}
