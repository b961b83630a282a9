use crate::errors::AppError;
use crate::llm_client::{GenerationGate, GenerationMode, GenerationRequest};
use crate::models::job::JobPosting;
use crate::models::outreach::{MessageType, Recipient};
use crate::outreach::prompts::system_prompt;

const OUTREACH_MAX_TOKENS: u32 = 700;

pub struct ComposeInput<'a> {
    pub job: Option<&'a JobPosting>,
    pub recipient: &'a Recipient,
    pub message_type: MessageType,
    pub highlights: &'a [String],
    pub additional_context: Option<&'a str>,
}

pub fn build_prompt(input: &ComposeInput<'_>) -> String {
    let mut parts = Vec::new();
    if let Some(job) = input.job {
        parts.push(format!("Role: {} at {}", job.title, job.company));
    }
    parts.push(format!(
        "Recipient: {}, {} ({})",
        input.recipient.name,
        input.recipient.title,
        input.recipient.category.as_str()
    ));
    parts.push(format!("Max length: {} characters", input.message_type.ceiling()));
    if let Some(context) = input.additional_context.filter(|c| !c.trim().is_empty()) {
        parts.push(format!("Additional context: {}", context.trim()));
    }
    if !input.highlights.is_empty() {
        parts.push(format!("Candidate highlights:\n- {}", input.highlights.join("\n- ")));
    }
    parts.join("\n")
}

/// Free-text generation. The result is returned as-is (trimmed); length is
/// judged by the draft gate, not here.
pub async fn compose(gate: &GenerationGate, input: ComposeInput<'_>) -> Result<String, AppError> {
    let request = GenerationRequest {
        mode: GenerationMode::Outreach,
        system: system_prompt(input.message_type),
        prompt: build_prompt(&input),
        max_tokens: OUTREACH_MAX_TOKENS,
    };
    let text = gate.text(&request).await?;
    Ok(text.trim().trim_matches('"').trim().to_string())
}
