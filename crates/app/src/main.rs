mod config;

use anyhow::{Context, Result};
use clap::Parser;
use providers::{FirecrawlClient, LanguageModel, OpenAIClient, SearchProvider};
use research::DeepResearchAgent;
use shared::events::ResearchEvent;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::mpsc;

use config::Overrides;

/// Recursive web research that ends in a long markdown report.
#[derive(Parser, Debug)]
#[command(name = "deep-research", version, about, long_about = None)]
struct Args {
    /// What to research; read from stdin when omitted
    topic: Option<String>,

    /// Queries generated at the first level
    #[arg(short, long)]
    breadth: Option<usize>,

    /// Recursive expansion levels
    #[arg(short, long)]
    depth: Option<usize>,

    /// Chat model used for every stage
    #[arg(short, long, env = "DEEP_RESEARCH_MODEL")]
    model: Option<String>,

    /// Sibling queries processed at once (1 is sequential)
    #[arg(long)]
    concurrency: Option<usize>,

    /// Language of the clarifying questions
    #[arg(long)]
    language: Option<String>,

    /// Skip the clarifying questions
    #[arg(long)]
    no_clarify: bool,

    /// Write the report here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Settings file (defaults to the platform config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Save the effective settings to the settings file and exit
    #[arg(long)]
    write_config: bool,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            breadth: self.breadth,
            depth: self.depth,
            model: self.model.clone(),
            concurrency: self.concurrency,
            language: self.language.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let settings = config::resolve(args.config.as_deref(), &args.overrides())?;

    if args.write_config {
        let path = args
            .config
            .clone()
            .or_else(config::config_path)
            .context("no settings location available on this platform")?;
        config::save_settings(&path, &settings)?;
        eprintln!("Settings written to {}", path.display());
        return Ok(());
    }

    let providers = &settings.providers;
    let model: Arc<dyn LanguageModel> = Arc::new(OpenAIClient::from_auth(
        &settings.research.model,
        &providers.openai_auth,
        providers.openai_base_url.as_deref(),
    )?);
    let search: Arc<dyn SearchProvider> = Arc::new(FirecrawlClient::from_auth(
        &providers.firecrawl_auth,
        providers.firecrawl_base_url.as_deref(),
    )?);
    let agent = DeepResearchAgent::new(settings.research.clone(), model, search);

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let topic = match args.topic.clone() {
        Some(topic) if !topic.trim().is_empty() => topic,
        _ => prompt_line(&mut stdin, "What would you like to research?")
            .await?
            .filter(|t| !t.trim().is_empty())
            .context("no research topic given")?,
    };

    let (tx, mut rx) = mpsc::unbounded_channel::<ResearchEvent>();
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            eprintln!("  {}", event.summary());
        }
    });

    let mut clarifications = Vec::new();
    if !args.no_clarify {
        let questions = agent.clarify(&topic, Some(&tx)).await;
        if !questions.is_empty() {
            eprintln!("\nTo better understand your research needs, please answer these follow-up questions:");
        }
        for question in questions {
            let answer = prompt_line(&mut stdin, &question).await?.unwrap_or_default();
            clarifications.push((question, answer));
        }
    }

    let outcome = agent.research(&topic, &clarifications, Some(tx)).await;
    let _ = printer.await;

    tracing::info!(
        learnings = outcome.learnings.len(),
        sources = outcome.visited_urls.len(),
        searches = outcome.stats.searches_issued,
        budget_exhausted = outcome.stats.budget_exhausted,
        "done"
    );

    match &args.output {
        Some(path) => {
            std::fs::write(path, &outcome.report.body)
                .with_context(|| format!("writing report to {}", path.display()))?;
            eprintln!("Report written to {}", path.display());
        }
        None => {
            let mut out = std::io::stdout().lock();
            writeln!(out, "{}", outcome.report.body)?;
        }
    }
    Ok(())
}

/// Print `prompt` to stderr and read one line; `None` at end of input.
async fn prompt_line(
    lines: &mut Lines<BufReader<Stdin>>,
    prompt: &str,
) -> Result<Option<String>> {
    eprint!("{}\n> ", prompt);
    std::io::stderr().flush()?;
    Ok(lines.next_line().await?.map(|l| l.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parse_flags() {
        let args = Args::parse_from([
            "deep-research",
            "solid state batteries",
            "--breadth",
            "4",
            "-d",
            "3",
            "--concurrency",
            "1",
            "--no-clarify",
            "--output",
            "report.md",
        ]);
        assert_eq!(args.topic.as_deref(), Some("solid state batteries"));
        assert!(args.no_clarify);
        let overrides = args.overrides();
        assert_eq!(overrides.breadth, Some(4));
        assert_eq!(overrides.depth, Some(3));
        assert_eq!(overrides.concurrency, Some(1));
        assert_eq!(args.output, Some(PathBuf::from("report.md")));
    }

    #[test]
    fn test_topic_is_optional() {
        let args = Args::parse_from(["deep-research", "--language", "German"]);
        assert!(args.topic.is_none());
        assert_eq!(args.overrides().language.as_deref(), Some("German"));
    }
}
