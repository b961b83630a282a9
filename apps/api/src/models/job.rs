use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identity of a job posting. Derived from the normalized URL plus the
/// normalized title/company pair; see `discovery::fingerprint`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(Uuid);

impl Fingerprint {
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for Fingerprint {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    New,
    Favorited,
    Applied,
    Rejected,
    Archived,
}

impl JobStatus {
    pub const ALL: [JobStatus; 5] = [
        JobStatus::New,
        JobStatus::Favorited,
        JobStatus::Applied,
        JobStatus::Rejected,
        JobStatus::Archived,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::New => "new",
            JobStatus::Favorited => "favorited",
            JobStatus::Applied => "applied",
            JobStatus::Rejected => "rejected",
            JobStatus::Archived => "archived",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown job status '{s}'"))
    }
}

/// Where a criterion's sub-score came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalSource {
    /// Deterministic evaluator over the posting fields.
    Rule,
    /// Structured signal returned by the generation capability in scoring mode.
    Model,
    /// Nothing extractable; the criterion contributes 0.
    Absent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionScore {
    pub weight: f64,
    pub sub_score: f64,
    pub source: SignalSource,
}

/// Per-criterion sub-scores and their weighted mean. Replaced wholesale on re-score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub overall: f64,
    pub criteria: BTreeMap<String, CriterionScore>,
    pub scored_at: DateTime<Utc>,
}

impl ScoreBreakdown {
    /// Model-sourced signals recorded in this breakdown, reused when re-scoring.
    pub fn model_signals(&self) -> BTreeMap<String, f64> {
        self.criteria
            .iter()
            .filter(|(_, c)| c.source == SignalSource::Model)
            .map(|(name, c)| (name.clone(), c.sub_score))
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPosting {
    pub fingerprint: Fingerprint,
    pub url: String,
    pub title: String,
    pub company: String,
    pub location: Option<String>,
    pub salary_min: Option<i64>,
    pub salary_max: Option<i64>,
    pub description: String,
    pub source: String,
    pub posted_date: Option<NaiveDate>,
    pub discovered_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub status: JobStatus,
    pub score_breakdown: ScoreBreakdown,
    /// Feed membership. Jobs below the threshold are kept for re-scoring.
    pub passes_threshold: bool,
}

impl JobPosting {
    pub fn score(&self) -> f64 {
        self.score_breakdown.overall
    }
}

/// A posting before it has been fingerprinted, scored, or stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidatePosting {
    pub url: String,
    pub title: String,
    pub company: String,
    pub location: Option<String>,
    pub salary_min: Option<i64>,
    pub salary_max: Option<i64>,
    pub description: String,
    pub source: String,
    pub posted_date: Option<NaiveDate>,
}
