// Prompt constants for scoring-mode generation.

/// System prompt for scoring mode. Paired with `JSON_ONLY_SYSTEM`.
pub const SCORING_SYSTEM: &str = "You are a job matching expert. \
    Given a candidate's preferences and a job listing, rate how well the job matches \
    on each requested criterion using a 0-1 scale.";

/// Scoring prompt template.
/// Replace: {criteria_json}, {preferences_json}, {title}, {company}, {location}, {description}
pub const SCORING_PROMPT_TEMPLATE: &str = r#"Rate this job on each of these criteria: {criteria_json}

Return a JSON object with this EXACT schema:
{
  "signals": {
    "<criterion name>": 0.0
  }
}

Use 1.0 for a perfect match and 0.0 for a clear mismatch. Omit a criterion entirely if
the listing gives no information about it. Do not compute an overall score.

CANDIDATE PREFERENCES:
{preferences_json}

JOB LISTING:
Title: {title}
Company: {company}
Location: {location}
Description: {description}"#;
