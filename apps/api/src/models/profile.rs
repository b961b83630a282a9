use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub links: Vec<String>,
}

/// One employment entry in the base profile. `id` is the anchor the tailored
/// resume must reference; tailoring may reorder or rewrite, never invent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseExperience {
    pub id: String,
    pub title: String,
    pub company: String,
    pub dates: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub bullets: Vec<String>,
}

/// The immutable source of truth for every tailored package.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseProfile {
    pub contact: ContactInfo,
    #[serde(default)]
    pub summary: String,
    pub experience: Vec<BaseExperience>,
    #[serde(default)]
    pub skills: Vec<String>,
    /// Short achievements used to personalise outreach messages.
    #[serde(default)]
    pub highlights: Vec<String>,
}

impl BaseProfile {
    pub fn validate(&self) -> Result<(), String> {
        if self.experience.is_empty() {
            return Err("base profile must contain at least one experience entry".to_string());
        }
        let mut seen = HashSet::new();
        for entry in &self.experience {
            if entry.id.trim().is_empty() {
                return Err("experience entry id cannot be blank".to_string());
            }
            if !seen.insert(entry.id.as_str()) {
                return Err(format!("duplicate experience id '{}'", entry.id));
            }
        }
        Ok(())
    }

    pub fn experience_by_id(&self, id: &str) -> Option<&BaseExperience> {
        self.experience.iter().find(|e| e.id == id)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocationPreferences {
    /// Locations accepted as-is (e.g. "Remote", "New York").
    #[serde(default)]
    pub accepted: Vec<String>,
    /// Location fragments that drop a posting before scoring unless its
    /// description mentions remote work.
    #[serde(default)]
    pub dealbreakers: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompensationPreferences {
    #[serde(default)]
    pub minimum_base_salary: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompanyPreferences {
    #[serde(default)]
    pub preferred: Vec<String>,
    #[serde(default)]
    pub excluded: Vec<String>,
    #[serde(default)]
    pub industries_preferred: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscoveryPreferences {
    #[serde(default)]
    pub exclude_keywords: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriterionConfig {
    pub weight: f64,
    /// Evaluator to run for this criterion. Defaults to the criterion name.
    #[serde(default)]
    pub evaluator: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringPreferences {
    pub criteria: BTreeMap<String, CriterionConfig>,
    pub minimum_score: f64,
    /// Ask the generation capability for per-criterion signals during discovery.
    #[serde(default)]
    pub use_model_signals: bool,
}

/// Weighted preference profile driving discovery and scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferenceProfile {
    #[serde(default)]
    pub search_queries: Vec<String>,
    #[serde(default)]
    pub target_titles: Vec<String>,
    #[serde(default)]
    pub location: LocationPreferences,
    #[serde(default)]
    pub compensation: CompensationPreferences,
    #[serde(default)]
    pub company: CompanyPreferences,
    #[serde(default)]
    pub seniority_keywords: Vec<String>,
    #[serde(default)]
    pub discovery: DiscoveryPreferences,
    pub scoring: ScoringPreferences,
}

impl PreferenceProfile {
    pub fn validate(&self) -> Result<(), String> {
        let min = self.scoring.minimum_score;
        if !(0.0..=1.0).contains(&min) {
            return Err(format!("scoring.minimum_score must be within [0, 1], got {min}"));
        }
        for (name, criterion) in &self.scoring.criteria {
            if !criterion.weight.is_finite() || criterion.weight < 0.0 {
                return Err(format!(
                    "criterion '{name}' has invalid weight {}; weights must be non-negative",
                    criterion.weight
                ));
            }
        }
        Ok(())
    }
}
