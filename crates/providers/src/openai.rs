use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::agent_api::ChatMessage;
use shared::settings::ProviderAuth;
use std::env;
use std::sync::LazyLock;
use std::time::Duration;

use crate::schema::JsonSchemaSpec;
use crate::LanguageModel;

static SHARED_HTTP: LazyLock<Client> = LazyLock::new(|| {
    Client::builder()
        .timeout(Duration::from_secs(120))
        .pool_max_idle_per_host(2)
        .build()
        .unwrap_or_else(|_| Client::new())
});

// ── Request types ────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat<'a>>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    format_type: &'static str,
    json_schema: JsonSchemaFormat<'a>,
}

#[derive(Debug, Serialize)]
struct JsonSchemaFormat<'a> {
    name: &'a str,
    schema: &'a serde_json::Value,
    strict: bool,
}

// ── Response types ───────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    #[serde(default)]
    content: Option<String>,
    /// Set instead of `content` when the model declines a structured request.
    #[serde(default)]
    refusal: Option<String>,
}

fn build_request<'a>(
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: Option<f32>,
    schema: Option<&'a JsonSchemaSpec>,
) -> OpenAIRequest<'a> {
    OpenAIRequest {
        model,
        messages,
        temperature,
        response_format: schema.map(|spec| ResponseFormat {
            format_type: "json_schema",
            json_schema: JsonSchemaFormat {
                name: &spec.name,
                schema: &spec.schema,
                strict: true,
            },
        }),
    }
}

/// Pull the first choice's text out of a chat-completions body.
fn first_content(body: OpenAIResponse) -> Result<String> {
    let message = body
        .choices
        .into_iter()
        .next()
        .map(|c| c.message)
        .ok_or_else(|| anyhow!("openai returned no choices"))?;
    if let Some(refusal) = message.refusal {
        return Err(anyhow!("openai refused the request: {}", refusal));
    }
    message
        .content
        .ok_or_else(|| anyhow!("openai returned an empty message"))
}

// ── Client ───────────────────────────────────────────────────────────

pub struct OpenAIClient {
    http: Client,
    auth_token: String,
    model: String,
    base_url: String,
}

const DEFAULT_BASE_URL: &str = "https://api.openai.com";

impl OpenAIClient {
    pub fn from_auth(model: &str, auth: &ProviderAuth, base_url: Option<&str>) -> Result<Self> {
        let auth_token = if let Some(api_key) = auth.api_key.as_ref().filter(|k| !k.is_empty()) {
            api_key.clone()
        } else {
            env::var("OPENAI_API_KEY")
                .map_err(|_| anyhow!("No OpenAI authentication configured"))?
        };

        Ok(Self {
            http: SHARED_HTTP.clone(),
            auth_token,
            model: model.to_string(),
            base_url: base_url
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
        })
    }

    async fn post(&self, request: &OpenAIRequest<'_>) -> Result<String> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        tracing::debug!(
            model = %self.model,
            structured = request.response_format.is_some(),
            "openai chat request"
        );
        let resp = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.auth_token))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            let detail: String = body.chars().take(800).collect();
            if detail.trim().is_empty() {
                return Err(anyhow!("openai error: {}", status));
            }
            return Err(anyhow!("openai error: {}\n{}", status, detail));
        }
        let body: OpenAIResponse = resp.json().await?;
        first_content(body)
    }
}

#[async_trait]
impl LanguageModel for OpenAIClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        temperature: Option<f32>,
    ) -> Result<String> {
        let req = build_request(&self.model, &messages, temperature, None);
        self.post(&req).await
    }

    async fn complete_structured(
        &self,
        messages: Vec<ChatMessage>,
        schema: &JsonSchemaSpec,
    ) -> Result<String> {
        let req = build_request(&self.model, &messages, None, Some(schema));
        self.post(&req).await
    }
}
