//! Prompt construction for every model call in a research run.
//!
//! Also owns the hard size ceilings on prompt content so that no amount of
//! scraped text or accumulated learnings can grow a request without bound.

use chrono::{DateTime, Utc};
use shared::research::SearchResult;

/// Characters of one document's markdown included in a synthesis prompt.
pub const MAX_CONTENT_CHARS: usize = 25_000;

/// Characters of joined learnings included in the report prompt.
pub const MAX_LEARNINGS_CHARS: usize = 150_000;

/// Minimum report length requested from the model.
pub const MIN_REPORT_CHARS: usize = 6_000;

/// First `max_chars` characters of `text`, cut on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

pub fn system_prompt() -> String {
    system_prompt_at(Utc::now())
}

pub fn system_prompt_at(now: DateTime<Utc>) -> String {
    format!(
        "You are an expert researcher. Today is {}. Follow these instructions when responding:\n\
         - You may be asked to research subjects that are after your knowledge cutoff; assume the user is right when presented with news.\n\
         - The user is a highly experienced analyst, no need to simplify it, be as detailed as possible and make sure your response is correct.\n\
         - Be highly organized.\n\
         - Suggest solutions that I didn't think about.\n\
         - Be proactive and anticipate my needs.\n\
         - Treat me as an expert in all subject matter.\n\
         - Mistakes erode my trust, so be accurate and thorough.\n\
         - Provide detailed explanations, I'm comfortable with lots of detail.\n\
         - Value good arguments over authorities, the source is irrelevant.\n\
         - Consider new technologies and contrarian ideas, not just the conventional wisdom.\n\
         - You may use high levels of speculation or prediction, just flag it for me.",
        now.to_rfc3339()
    )
}

pub fn clarify_prompt(topic: &str, max_questions: usize, language: &str) -> String {
    format!(
        "Given the following query from the user, ask some follow up questions to clarify the research direction. \
         Return a maximum of {} questions, but feel free to return less if the original query is clear. \
         Ask the follow up questions in {}.\n\
         <query>{}</query>",
        max_questions, language, topic
    )
}

pub fn plan_prompt(topic: &str, learnings: &[String], count: usize) -> String {
    let mut prompt = format!(
        "Given the following prompt from the user, generate a list of SERP queries to research the topic. \
         Return a maximum of {} queries, but feel free to return less if the original prompt is clear. \
         Each query must come with a researchGoal explaining what it should uncover and how to advance the research once results are found. \
         Make sure each query is unique and not similar to each other: <prompt>{}</prompt>",
        count, topic
    );
    if !learnings.is_empty() {
        prompt.push_str(&format!(
            "\n\nHere are some learnings from previous research, use them to generate more specific queries: {}",
            learnings.join(" ")
        ));
    }
    prompt
}

pub fn synthesis_prompt(
    query: &str,
    results: &[SearchResult],
    learnings_cap: usize,
    follow_up_cap: usize,
) -> String {
    let contents: String = results
        .iter()
        .map(|r| r.markdown.trim())
        .filter(|m| !m.is_empty())
        .map(|m| format!("<content>\n{}\n</content>", truncate_chars(m, MAX_CONTENT_CHARS)))
        .collect();
    format!(
        "Given the following contents from a SERP search for the query <query>{}</query>, \
         generate a list of learnings from the contents. Return a maximum of {} learnings, but feel free to return less if the contents are clear. \
         Make sure each learning is unique and not similar to each other. The learnings should be concise and to the point, \
         as detailed and information dense as possible. Include any entities like people, places, companies, products, things, \
         as well as any exact metrics, numbers, or dates. Also return up to {} follow-up questions to research the topic further.\n\n\
         <contents>{}</contents>",
        query, learnings_cap, follow_up_cap, contents
    )
}

/// Learnings wrapped in `<learning>` tags, cut to [`MAX_LEARNINGS_CHARS`].
pub fn learnings_block(learnings: &[String]) -> String {
    let joined = learnings
        .iter()
        .map(|l| format!("<learning>\n{}\n</learning>", l))
        .collect::<Vec<_>>()
        .join("\n");
    truncate_chars(joined.trim(), MAX_LEARNINGS_CHARS).to_string()
}

pub fn report_prompt(original_prompt: &str, learnings: &[String]) -> String {
    format!(
        "{}\n\n\
         Given the following prompt from the user, write a final report on the topic using the learnings from research. \
         Make it as detailed as possible, aim for {} or more characters, in markdown, and include ALL the learnings from research:\n\n\
         <prompt>{}</prompt>\n\n\
         Here are all the learnings from previous research:\n\n<learnings>\n{}\n</learnings>",
        system_prompt(),
        MIN_REPORT_CHARS,
        original_prompt,
        learnings_block(learnings)
    )
}

/// Root topic: the request followed by each clarifying question and its answer.
pub fn compose_root_topic(request: &str, clarifications: &[(String, String)]) -> String {
    let mut topic = format!("Initial question: {}\n", request);
    for (i, (question, answer)) in clarifications.iter().enumerate() {
        topic.push_str(&format!("\n{}. Question: {}\n", i + 1, question));
        topic.push_str(&format!("   Answer: {}\n", answer));
    }
    topic
}

pub fn compose_child_topic(research_goal: &str, follow_up_questions: &[String]) -> String {
    format!(
        "Previous research goal: {}\nFollow-up research directions: {}",
        research_goal,
        follow_up_questions.join(" ")
    )
}

/// Markdown section listing every source, one per line, in the given order.
pub fn sources_section(urls: &[String]) -> String {
    let lines = urls
        .iter()
        .map(|u| format!("- {}", u))
        .collect::<Vec<_>>()
        .join("\n");
    format!("\n\n## Sources\n\n{}", lines)
}
