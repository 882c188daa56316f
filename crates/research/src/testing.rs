//! In-memory collaborators for unit tests.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use providers::{JsonSchemaSpec, LanguageModel, SearchProvider};
use shared::agent_api::ChatMessage;
use shared::research::SearchResult;

type Responder = Box<dyn Fn(&str) -> Option<serde_json::Value> + Send + Sync>;

/// Model that answers structured requests by schema name.
///
/// A responder returning `None` makes the call fail.
pub struct ScriptedModel {
    feedback: Responder,
    plan: Responder,
    synthesis: Responder,
    report: Option<String>,
    /// (schema name or "text", last user message)
    pub calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self {
            feedback: Box::new(|_| None),
            plan: Box::new(|_| None),
            synthesis: Box::new(|_| None),
            report: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn feedback(
        mut self,
        f: impl Fn(&str) -> Option<serde_json::Value> + Send + Sync + 'static,
    ) -> Self {
        self.feedback = Box::new(f);
        self
    }

    pub fn plan(
        mut self,
        f: impl Fn(&str) -> Option<serde_json::Value> + Send + Sync + 'static,
    ) -> Self {
        self.plan = Box::new(f);
        self
    }

    pub fn synthesis(
        mut self,
        f: impl Fn(&str) -> Option<serde_json::Value> + Send + Sync + 'static,
    ) -> Self {
        self.synthesis = Box::new(f);
        self
    }

    pub fn report(mut self, body: impl Into<String>) -> Self {
        self.report = Some(body.into());
        self
    }

    pub fn calls_for(&self, kind: &str) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter(|(k, _)| k == kind)
            .map(|(_, prompt)| prompt.clone())
            .collect()
    }

    fn record(&self, kind: &str, messages: &[ChatMessage]) -> String {
        let prompt = messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map(|m| m.content.clone())
            .unwrap_or_default();
        self.calls.lock().push((kind.to_string(), prompt.clone()));
        prompt
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, messages: Vec<ChatMessage>, _t: Option<f32>) -> Result<String> {
        self.record("text", &messages);
        self.report
            .clone()
            .ok_or_else(|| anyhow!("scripted model has no report"))
    }

    async fn complete_structured(
        &self,
        messages: Vec<ChatMessage>,
        schema: &JsonSchemaSpec,
    ) -> Result<String> {
        let prompt = self.record(&schema.name, &messages);
        let responder = match schema.name.as_str() {
            "FeedbackResponse" => &self.feedback,
            "SerpQueryResponse" => &self.plan,
            "SerpResultResponse" => &self.synthesis,
            other => return Err(anyhow!("unexpected schema {}", other)),
        };
        responder(&prompt)
            .map(|v| v.to_string())
            .ok_or_else(|| anyhow!("scripted {} failure", schema.name))
    }
}

/// Search provider returning canned documents per query.
pub struct StaticSearch {
    responder: Box<dyn Fn(&str) -> Result<Vec<SearchResult>> + Send + Sync>,
    pub queries: Mutex<Vec<String>>,
}

impl StaticSearch {
    pub fn new(
        f: impl Fn(&str) -> Result<Vec<SearchResult>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            responder: Box::new(f),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Two documents per query, URLs derived from the query text.
    pub fn per_query_urls() -> Self {
        Self::new(|q| {
            Ok(vec![
                doc(&format!("https://{}.example/1", slug(q))),
                doc(&format!("https://{}.example/2", slug(q))),
            ])
        })
    }

    pub fn failing() -> Self {
        Self::new(|_| Err(anyhow!("search provider unavailable")))
    }

    pub fn query_count(&self) -> usize {
        self.queries.lock().len()
    }
}

#[async_trait]
impl SearchProvider for StaticSearch {
    async fn search(&self, query: &str, _limit: usize, _timeout_ms: u64) -> Result<Vec<SearchResult>> {
        self.queries.lock().push(query.to_string());
        (self.responder)(query)
    }
}

pub fn doc(url: &str) -> SearchResult {
    SearchResult {
        url: url.to_string(),
        markdown: format!("Content scraped from {}", url),
        title: "Title".to_string(),
        description: "Description".to_string(),
    }
}

pub fn slug(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect()
}

/// `n` planned queries named `{prefix}-{i}`.
pub fn queries_json(prefix: &str, n: usize) -> serde_json::Value {
    let queries: Vec<serde_json::Value> = (0..n)
        .map(|i| {
            serde_json::json!({
                "query": format!("{}-{}", prefix, i),
                "researchGoal": format!("goal for {}-{}", prefix, i),
            })
        })
        .collect();
    serde_json::json!({ "queries": queries })
}

/// Synthesis payload with `n` learnings tagged by the query in the prompt.
pub fn synthesis_json(prompt: &str, n: usize, follow_ups: usize) -> serde_json::Value {
    let query = prompt
        .split("<query>")
        .nth(1)
        .and_then(|rest| rest.split("</query>").next())
        .unwrap_or("unknown");
    let learnings: Vec<String> = (0..n).map(|i| format!("{} learning {}", query, i)).collect();
    let questions: Vec<String> = (0..follow_ups)
        .map(|i| format!("{} follow-up {}", query, i))
        .collect();
    serde_json::json!({ "learnings": learnings, "followUpQuestions": questions })
}
