//! Firecrawl search client.
//!
//! Runs a web search and scrapes every hit to markdown in one call.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::research::SearchResult;
use shared::settings::ProviderAuth;
use std::env;
use std::time::Duration;

use crate::SearchProvider;

const DEFAULT_BASE_URL: &str = "https://api.firecrawl.dev";

/// Slack on top of the server-side timeout before the HTTP call gives up.
const CLIENT_TIMEOUT_SLACK_MS: u64 = 5_000;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    query: &'a str,
    limit: usize,
    timeout: u64,
    scrape_options: ScrapeOptions,
}

#[derive(Debug, Serialize)]
struct ScrapeOptions {
    formats: Vec<&'static str>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Vec<SearchHit>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    markdown: Option<String>,
}

fn client_timeout(timeout_ms: u64) -> Duration {
    Duration::from_millis(timeout_ms.saturating_add(CLIENT_TIMEOUT_SLACK_MS))
}

fn into_results(response: SearchResponse) -> Result<Vec<SearchResult>> {
    if !response.success {
        return Err(anyhow!(
            "firecrawl search unsuccessful: {}",
            response.error.unwrap_or_else(|| "no error message".into())
        ));
    }
    Ok(response
        .data
        .into_iter()
        .filter_map(|hit| {
            let url = hit.url.filter(|u| !u.trim().is_empty())?;
            Some(SearchResult {
                url,
                markdown: hit.markdown.unwrap_or_default(),
                title: hit.title.unwrap_or_default(),
                description: hit.description.unwrap_or_default(),
            })
        })
        .collect())
}

pub struct FirecrawlClient {
    http: Client,
    api_key: String,
    base_url: String,
}

impl FirecrawlClient {
    pub fn from_auth(auth: &ProviderAuth, base_url: Option<&str>) -> Result<Self> {
        let api_key = if let Some(api_key) = auth.api_key.as_ref().filter(|k| !k.is_empty()) {
            api_key.clone()
        } else {
            env::var("FIRECRAWL_API_KEY")
                .map_err(|_| anyhow!("No Firecrawl authentication configured"))?
        };
        Ok(Self {
            http: Client::new(),
            api_key,
            base_url: base_url
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
        })
    }
}

#[async_trait]
impl SearchProvider for FirecrawlClient {
    async fn search(
        &self,
        query: &str,
        limit: usize,
        timeout_ms: u64,
    ) -> Result<Vec<SearchResult>> {
        let url = format!("{}/v1/search", self.base_url);
        let req = SearchRequest {
            query,
            limit,
            timeout: timeout_ms,
            scrape_options: ScrapeOptions {
                formats: vec!["markdown"],
            },
        };
        tracing::debug!(query, limit, timeout_ms, "firecrawl search");

        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .timeout(client_timeout(timeout_ms))
            .json(&req)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let detail: String = body.chars().take(800).collect();
            return Err(anyhow!("firecrawl error: {}\n{}", status, detail));
        }

        let body: SearchResponse = resp.json().await?;
        into_results(body)
    }
}
