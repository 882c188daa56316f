//! Final report compilation.

use providers::LanguageModel;
use shared::agent_api::ChatMessage;
use shared::research::{Report, ResearchError};

use crate::prompts;

/// Body used when the model cannot produce a report.
pub const REPORT_FAILURE_SENTINEL: &str = "Error generating report";

/// Write the report and append the Sources section.
pub async fn try_compile(
    model: &dyn LanguageModel,
    temperature: f32,
    original_prompt: &str,
    learnings: &[String],
    visited_urls: &[String],
) -> Result<Report, ResearchError> {
    let messages = vec![ChatMessage::user(prompts::report_prompt(
        original_prompt,
        learnings,
    ))];
    let text = model
        .complete(messages, Some(temperature))
        .await
        .map_err(|e| ResearchError::Report(format!("{:#}", e)))?;

    let mut body = text.trim().to_string();
    body.push_str(&prompts::sources_section(visited_urls));
    Ok(Report {
        body,
        sources: visited_urls.to_vec(),
    })
}

/// Like [`try_compile`], but a failure yields the sentinel body.
pub async fn compile(
    model: &dyn LanguageModel,
    temperature: f32,
    original_prompt: &str,
    learnings: &[String],
    visited_urls: &[String],
) -> Report {
    match try_compile(model, temperature, original_prompt, learnings, visited_urls).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!(error = %e, "report compilation failed");
            failed_report(visited_urls)
        }
    }
}

pub(crate) fn failed_report(visited_urls: &[String]) -> Report {
    Report {
        body: REPORT_FAILURE_SENTINEL.to_string(),
        sources: visited_urls.to_vec(),
    }
}
