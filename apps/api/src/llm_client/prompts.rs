// Shared prompt fragments. Each area that calls the model keeps its own
// prompts.rs alongside it; this file holds the cross-cutting pieces.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Truthfulness rule appended to every tailoring prompt.
pub const GROUNDING_INSTRUCTION: &str = "\
    CRITICAL: Only use employers, titles, dates, and achievements that appear in the \
    candidate profile. Every experience entry you return MUST carry the `id` of the \
    profile entry it rewrites. Never add an entry, never change an employer, title, or \
    date range. If the profile does not support a claim, omit it.";
