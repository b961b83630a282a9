//! Scoring gate. Turns a posting plus a weighted preference profile into a
//! normalized breakdown and a threshold decision.
//!
//! The criterion set comes from the profile. Each criterion names an evaluator;
//! evaluators return `None` when the posting carries no usable signal, which
//! scores the criterion 0. Model signals, when present, override the rule
//! evaluator for the criteria they name.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::Utc;
use serde_json::Value;
use tracing::warn;

use crate::discovery::prompts::{SCORING_PROMPT_TEMPLATE, SCORING_SYSTEM};
use crate::errors::AppError;
use crate::llm_client::prompts::JSON_ONLY_SYSTEM;
use crate::llm_client::{GenerationGate, GenerationMode, GenerationRequest};
use crate::models::job::{CandidatePosting, CriterionScore, ScoreBreakdown, SignalSource};
use crate::models::profile::PreferenceProfile;

const SCORING_MAX_TOKENS: u32 = 400;
/// Description characters sent to the model in scoring mode.
const SCORING_DESCRIPTION_CHARS: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evaluator {
    Title,
    Remote,
    Salary,
    Company,
    Seniority,
    Industry,
}

impl FromStr for Evaluator {
    type Err = String;

    /// Accepts bare names and the `_fit` / `_match` suffixed forms.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        let base = name
            .strip_suffix("_fit")
            .or_else(|| name.strip_suffix("_match"))
            .unwrap_or(&name);
        match base {
            "title" => Ok(Evaluator::Title),
            "remote" | "location" => Ok(Evaluator::Remote),
            "salary" | "compensation" => Ok(Evaluator::Salary),
            "company" => Ok(Evaluator::Company),
            "seniority" => Ok(Evaluator::Seniority),
            "industry" => Ok(Evaluator::Industry),
            _ => Err(format!("no evaluator named '{s}'")),
        }
    }
}

fn words(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// True if any needle appears in the haystack as a whole-word phrase, so "ai"
/// does not match "retail".
fn contains_any(haystack: &str, needles: &[String]) -> bool {
    let hay = words(haystack);
    needles.iter().any(|needle| {
        let needle = words(needle);
        !needle.is_empty() && hay.windows(needle.len()).any(|w| w == needle.as_slice())
    })
}

impl Evaluator {
    pub fn evaluate(&self, posting: &CandidatePosting, profile: &PreferenceProfile) -> Option<f64> {
        match self {
            Evaluator::Title => title_fit(posting, profile),
            Evaluator::Remote => remote_fit(posting, profile),
            Evaluator::Salary => salary_fit(posting, profile),
            Evaluator::Company => company_fit(posting, profile),
            Evaluator::Seniority => seniority_fit(posting, profile),
            Evaluator::Industry => industry_fit(posting, profile),
        }
    }
}

/// Best token overlap between the posting title and any target title.
fn title_fit(posting: &CandidatePosting, profile: &PreferenceProfile) -> Option<f64> {
    if profile.target_titles.is_empty() || posting.title.trim().is_empty() {
        return None;
    }
    let title = posting.title.to_lowercase();
    let title_tokens: Vec<&str> = title.split_whitespace().collect();
    profile
        .target_titles
        .iter()
        .map(|target| {
            let target = target.to_lowercase();
            if title.contains(&target) {
                return 1.0;
            }
            let target_tokens: Vec<&str> = target.split_whitespace().collect();
            if target_tokens.is_empty() {
                return 0.0;
            }
            let hits = target_tokens
                .iter()
                .filter(|t| title_tokens.contains(t))
                .count();
            hits as f64 / target_tokens.len() as f64
        })
        .fold(None, |best: Option<f64>, s| Some(best.map_or(s, |b| b.max(s))))
}

/// Remote = 1.0, accepted location = 1.0, hybrid = 0.5, anything else known = 0.0.
fn remote_fit(posting: &CandidatePosting, profile: &PreferenceProfile) -> Option<f64> {
    let location = posting
        .location
        .as_deref()
        .map(str::to_lowercase)
        .unwrap_or_default();
    let description = posting.description.to_lowercase();

    if location.contains("remote") || description.contains("fully remote") {
        return Some(1.0);
    }
    if !location.is_empty() && contains_any(&location, &profile.location.accepted) {
        return Some(1.0);
    }
    if location.contains("hybrid") || description.contains("hybrid") {
        return Some(0.5);
    }
    if location.trim().is_empty() {
        return None;
    }
    Some(0.0)
}

/// 1.0 at or above the minimum, scaled down linearly below it.
fn salary_fit(posting: &CandidatePosting, profile: &PreferenceProfile) -> Option<f64> {
    let minimum = profile.compensation.minimum_base_salary.filter(|m| *m > 0)?;
    let offered = posting.salary_max.or(posting.salary_min)?;
    Some((offered as f64 / minimum as f64).clamp(0.0, 1.0))
}

/// Excluded = 0.0, preferred = 1.0, any other named company = 0.5.
fn company_fit(posting: &CandidatePosting, profile: &PreferenceProfile) -> Option<f64> {
    let company = posting.company.trim().to_lowercase();
    if company.is_empty() {
        return None;
    }
    if contains_any(&company, &profile.company.excluded) {
        return Some(0.0);
    }
    if contains_any(&company, &profile.company.preferred) {
        return Some(1.0);
    }
    Some(0.5)
}

/// Keyword in the title = 1.0, only in the description = 0.5.
fn seniority_fit(posting: &CandidatePosting, profile: &PreferenceProfile) -> Option<f64> {
    if profile.seniority_keywords.is_empty() || posting.title.trim().is_empty() {
        return None;
    }
    if contains_any(&posting.title.to_lowercase(), &profile.seniority_keywords) {
        return Some(1.0);
    }
    if contains_any(&posting.description.to_lowercase(), &profile.seniority_keywords) {
        return Some(0.5);
    }
    Some(0.0)
}

fn industry_fit(posting: &CandidatePosting, profile: &PreferenceProfile) -> Option<f64> {
    let industries = &profile.company.industries_preferred;
    if industries.is_empty() || posting.description.trim().is_empty() {
        return None;
    }
    let text = format!("{} {}", posting.company, posting.description).to_lowercase();
    Some(if contains_any(&text, industries) { 1.0 } else { 0.0 })
}

/// Rule-based breakdown with no model signals.
pub fn score(posting: &CandidatePosting, profile: &PreferenceProfile) -> ScoreBreakdown {
    score_with_signals(posting, profile, &BTreeMap::new())
}

/// overall = Σ(weight·sub_score) / Σ(weight) over the recognized criteria.
pub fn score_with_signals(
    posting: &CandidatePosting,
    profile: &PreferenceProfile,
    model_signals: &BTreeMap<String, f64>,
) -> ScoreBreakdown {
    let mut criteria = BTreeMap::new();
    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;

    for (name, config) in &profile.scoring.criteria {
        let evaluator_name = config.evaluator.as_deref().unwrap_or(name);
        let evaluator = match evaluator_name.parse::<Evaluator>() {
            Ok(e) => e,
            Err(reason) => {
                warn!("Ignoring scoring criterion '{name}': {reason}");
                continue;
            }
        };

        let (sub_score, source) = match model_signals.get(name) {
            Some(signal) => (*signal, SignalSource::Model),
            None => match evaluator.evaluate(posting, profile) {
                Some(s) => (s, SignalSource::Rule),
                None => (0.0, SignalSource::Absent),
            },
        };
        let sub_score = sub_score.clamp(0.0, 1.0);

        weighted_sum += config.weight * sub_score;
        weight_total += config.weight;
        criteria.insert(
            name.clone(),
            CriterionScore {
                weight: config.weight,
                sub_score,
                source,
            },
        );
    }

    let overall = if weight_total > 0.0 {
        (weighted_sum / weight_total).clamp(0.0, 1.0)
    } else {
        0.0
    };

    ScoreBreakdown {
        overall,
        criteria,
        scored_at: Utc::now(),
    }
}

pub fn passes_threshold(breakdown: &ScoreBreakdown, minimum_score: f64) -> bool {
    breakdown.overall >= minimum_score
}

/// Asks the generation capability for per-criterion signals (scoring mode).
/// Only recognized criteria are kept; any non-numeric or out-of-range value
/// makes the whole response malformed.
pub async fn request_model_signals(
    gate: &GenerationGate,
    posting: &CandidatePosting,
    profile: &PreferenceProfile,
) -> Result<BTreeMap<String, f64>, AppError> {
    let request = GenerationRequest {
        mode: GenerationMode::Scoring,
        system: format!("{SCORING_SYSTEM} {JSON_ONLY_SYSTEM}"),
        prompt: build_scoring_prompt(posting, profile)?,
        max_tokens: SCORING_MAX_TOKENS,
    };
    let value = gate.structured(&request).await?;
    parse_model_signals(&value, profile)
}

fn build_scoring_prompt(
    posting: &CandidatePosting,
    profile: &PreferenceProfile,
) -> Result<String, AppError> {
    let criteria_json = serde_json::to_string(
        &profile
            .scoring
            .criteria
            .iter()
            .filter(|(name, config)| {
                config
                    .evaluator
                    .as_deref()
                    .unwrap_or(name.as_str())
                    .parse::<Evaluator>()
                    .is_ok()
            })
            .map(|(name, _)| name)
            .collect::<Vec<_>>(),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize criteria: {e}")))?;

    let preferences_json = serde_json::to_string(&serde_json::json!({
        "target_titles": profile.target_titles,
        "accepted_locations": profile.location.accepted,
        "minimum_base_salary": profile.compensation.minimum_base_salary,
        "preferred_companies": profile.company.preferred,
        "preferred_industries": profile.company.industries_preferred,
        "seniority_keywords": profile.seniority_keywords,
    }))
    .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize preferences: {e}")))?;

    let description: String = posting
        .description
        .chars()
        .take(SCORING_DESCRIPTION_CHARS)
        .collect();

    Ok(SCORING_PROMPT_TEMPLATE
        .replace("{criteria_json}", &criteria_json)
        .replace("{preferences_json}", &preferences_json)
        .replace("{title}", &posting.title)
        .replace("{company}", &posting.company)
        .replace("{location}", posting.location.as_deref().unwrap_or("Unknown"))
        .replace("{description}", &description))
}

fn parse_model_signals(
    value: &Value,
    profile: &PreferenceProfile,
) -> Result<BTreeMap<String, f64>, AppError> {
    let signals = value
        .get("signals")
        .and_then(Value::as_object)
        .ok_or_else(|| {
            AppError::MalformedGenerationOutput("scoring output lacks a 'signals' object".into())
        })?;

    let mut parsed = BTreeMap::new();
    for (name, raw) in signals {
        if !profile.scoring.criteria.contains_key(name) {
            continue;
        }
        let signal = raw.as_f64().ok_or_else(|| {
            AppError::MalformedGenerationOutput(format!("signal '{name}' is not a number"))
        })?;
        if !(0.0..=1.0).contains(&signal) {
            return Err(AppError::MalformedGenerationOutput(format!(
                "signal '{name}' = {signal} is outside [0, 1]"
            )));
        }
        parsed.insert(name.clone(), signal);
    }
    Ok(parsed)
}
