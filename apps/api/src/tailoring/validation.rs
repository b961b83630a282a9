//! Schema and grounding checks for tailoring-mode output.
//!
//! Model output is untrusted. It is deserialized into a loose shape, checked,
//! and only then converted into domain types. Contact details and the
//! title/company/dates of every entry always come from the base profile.

use std::collections::HashSet;

use serde::Deserialize;
use serde_json::Value;

use crate::errors::AppError;
use crate::models::package::{TailoredExperience, TailoredResume};
use crate::models::profile::BaseProfile;

#[derive(Debug, Deserialize)]
pub struct RawTailoringOutput {
    pub tailored_resume: RawResume,
    #[serde(default)]
    pub ats_analysis: Option<RawAtsAnalysis>,
    #[serde(default)]
    pub tailoring_notes: Option<String>,
    pub cover_letter: String,
}

#[derive(Debug, Deserialize)]
pub struct RawResume {
    pub summary: String,
    pub experience: Vec<RawExperience>,
    #[serde(default)]
    pub skills: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawExperience {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub dates: Option<String>,
    pub bullets: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawAtsAnalysis {
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

/// Missing fields or wrong types → `MalformedGenerationOutput`.
pub fn parse_output(value: Value) -> Result<RawTailoringOutput, AppError> {
    let output: RawTailoringOutput = serde_json::from_value(value).map_err(|e| {
        AppError::MalformedGenerationOutput(format!("tailoring output does not match schema: {e}"))
    })?;

    if output.cover_letter.trim().is_empty() {
        return Err(AppError::MalformedGenerationOutput(
            "cover_letter is empty".to_string(),
        ));
    }
    if output.tailored_resume.summary.trim().is_empty() {
        return Err(AppError::MalformedGenerationOutput(
            "tailored_resume.summary is empty".to_string(),
        ));
    }
    if output.tailored_resume.experience.is_empty() {
        return Err(AppError::MalformedGenerationOutput(
            "tailored_resume.experience is empty".to_string(),
        ));
    }
    if let Some(score) = output.ats_analysis.as_ref().and_then(|a| a.score) {
        if !score.is_finite() {
            return Err(AppError::MalformedGenerationOutput(
                "ats_analysis.score is not a number".to_string(),
            ));
        }
    }
    Ok(output)
}

fn same(claimed: Option<&str>, base: &str) -> bool {
    claimed.map_or(true, |c| c.trim().eq_ignore_ascii_case(base.trim()))
}

/// Every entry must reference a distinct base entry and must not restate its
/// employer, title or dates differently.
pub fn ground_resume(raw: RawResume, base: &BaseProfile) -> Result<TailoredResume, AppError> {
    let mut seen = HashSet::new();
    let mut experience = Vec::with_capacity(raw.experience.len());

    for entry in raw.experience {
        let Some(source) = base.experience_by_id(&entry.id) else {
            return Err(AppError::FabricationDetected(format!(
                "experience id '{}' does not exist in the base profile",
                entry.id
            )));
        };
        if !seen.insert(entry.id.clone()) {
            return Err(AppError::FabricationDetected(format!(
                "experience id '{}' appears more than once",
                entry.id
            )));
        }
        if !same(entry.company.as_deref(), &source.company)
            || !same(entry.title.as_deref(), &source.title)
            || !same(entry.dates.as_deref(), &source.dates)
        {
            return Err(AppError::FabricationDetected(format!(
                "experience '{}' restates employer, title or dates",
                entry.id
            )));
        }

        experience.push(TailoredExperience {
            id: source.id.clone(),
            title: source.title.clone(),
            company: source.company.clone(),
            dates: source.dates.clone(),
            location: source.location.clone(),
            bullets: entry
                .bullets
                .into_iter()
                .map(|b| b.trim().to_string())
                .filter(|b| !b.is_empty())
                .collect(),
        });
    }

    Ok(TailoredResume {
        contact: base.contact.clone(),
        summary: raw.summary.trim().to_string(),
        experience,
        skills: raw.skills,
    })
}
