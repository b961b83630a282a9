use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::job::Fingerprint;
use crate::models::profile::ContactInfo;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TailoredExperience {
    /// Must name an entry of the base profile.
    pub id: String,
    pub title: String,
    pub company: String,
    pub dates: String,
    pub location: Option<String>,
    pub bullets: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TailoredResume {
    pub contact: ContactInfo,
    pub summary: String,
    pub experience: Vec<TailoredExperience>,
    pub skills: Vec<String>,
}

impl TailoredResume {
    /// Flattened resume text, the haystack for ATS keyword matching.
    pub fn plain_text(&self) -> String {
        let mut parts: Vec<&str> = vec![self.summary.as_str()];
        for entry in &self.experience {
            parts.push(&entry.title);
            parts.push(&entry.company);
            parts.extend(entry.bullets.iter().map(String::as_str));
        }
        parts.extend(self.skills.iter().map(String::as_str));
        parts.join("\n")
    }
}

/// Keyword-match analysis computed from the job text and the tailored resume,
/// never from the model's own claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtsReport {
    pub score: f64,
    pub matched: BTreeSet<String>,
    pub missing: BTreeSet<String>,
    pub suggestions: Vec<String>,
    /// What the model said about itself. Informational only.
    pub model_reported_score: Option<f64>,
}

/// A stored package version, keyed by `(job, version)`. At most one version
/// per job has `superseded == false`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationPackage {
    pub job: Fingerprint,
    pub version: u64,
    pub superseded: bool,
    pub resume: TailoredResume,
    pub cover_letter: String,
    pub ats: AtsReport,
    pub tailoring_notes: Option<String>,
    pub generated_at: DateTime<Utc>,
    pub source_model: String,
}
