use tracing::debug;

use crate::core::llm::{ChatMessage, CompletionOptions, LlmError, LlmProvider};

pub const FORMATTING_REQUIREMENTS: &str = "IMPORTANT FORMATTING REQUIREMENTS:
- Write clear, human-readable prose, not JSON or raw data dumps
- Use markdown headings (##, ###), bullet points, and numbered lists
- Organize the analysis into sections with descriptive headings
- Use bold text for the key points
- Keep paragraphs short
- Include specific examples and data points where relevant
- Finish with clear, actionable recommendations";

pub const EMPTY_RESPONSE: &str = "No response generated";

pub fn analysis_messages(system_prompt: &str, context: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(format!("{}\n\n{}", system_prompt, FORMATTING_REQUIREMENTS)),
        ChatMessage::user(context),
    ]
}

/// One analysis call. Errors are returned, never swallowed: the caller
/// decides how to record them.
pub async fn run_agent(
    llm: &dyn LlmProvider,
    system_prompt: &str,
    context: &str,
    options: &CompletionOptions,
) -> Result<String, LlmError> {
    let messages = analysis_messages(system_prompt, context);
    let text = llm.complete(&messages, options).await?;
    debug!("{} returned {} chars", llm.name(), text.len());
    if text.trim().is_empty() {
        return Ok(EMPTY_RESPONSE.to_string());
    }
    Ok(text)
}
