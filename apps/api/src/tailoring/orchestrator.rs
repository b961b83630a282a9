//! Tailoring: base profile + job text → validated, grounded, versioned package.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::errors::AppError;
use crate::lifecycle::accepts_tailoring;
use crate::llm_client::prompts::{GROUNDING_INSTRUCTION, JSON_ONLY_SYSTEM};
use crate::llm_client::{GenerationGate, GenerationMode, GenerationRequest};
use crate::models::job::{Fingerprint, JobPosting};
use crate::models::package::{ApplicationPackage, AtsReport, TailoredResume};
use crate::models::profile::BaseProfile;
use crate::store::Store;
use crate::tailoring::ats;
use crate::tailoring::prompts::{TAILORING_PROMPT_TEMPLATE, TAILORING_SYSTEM};
use crate::tailoring::validation::{ground_resume, parse_output};

const TAILORING_MAX_TOKENS: u32 = 4096;

/// A validated package that has not been assigned a version yet.
#[derive(Debug, Clone)]
pub struct GeneratedPackage {
    pub resume: TailoredResume,
    pub cover_letter: String,
    pub ats: AtsReport,
    pub tailoring_notes: Option<String>,
}

/// One tailoring call. Nothing is persisted here; on any error the caller has
/// nothing partial to clean up.
pub async fn tailor(
    gate: &GenerationGate,
    base_profile: &BaseProfile,
    job_text: &str,
    company_context: Option<&str>,
) -> Result<GeneratedPackage, AppError> {
    if job_text.trim().is_empty() {
        return Err(AppError::Validation("job text cannot be empty".to_string()));
    }
    base_profile
        .validate()
        .map_err(|e| AppError::Validation(format!("invalid base profile: {e}")))?;

    let profile_json = serde_json::to_string_pretty(base_profile)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize profile: {e}")))?;
    let company_section = company_context
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(|c| format!("\n\nCOMPANY INFO:\n{c}"))
        .unwrap_or_default();

    let request = GenerationRequest {
        mode: GenerationMode::Tailoring,
        system: format!("{TAILORING_SYSTEM}\n\n{GROUNDING_INSTRUCTION}\n\n{JSON_ONLY_SYSTEM}"),
        prompt: TAILORING_PROMPT_TEMPLATE
            .replace("{profile_json}", &profile_json)
            .replace("{job_text}", job_text.trim())
            .replace("{company_section}", &company_section),
        max_tokens: TAILORING_MAX_TOKENS,
    };

    let raw = parse_output(gate.structured(&request).await?)?;
    let resume = ground_resume(raw.tailored_resume, base_profile)?;

    let model_ats = raw.ats_analysis.unwrap_or_default();
    let ats = ats::analyze(
        job_text,
        &resume.plain_text(),
        model_ats.suggestions,
        model_ats.score,
    );

    Ok(GeneratedPackage {
        resume,
        cover_letter: raw.cover_letter.trim().to_string(),
        ats,
        tailoring_notes: raw
            .tailoring_notes
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty()),
    })
}

/// The text a tailoring call sees for a stored job. It also feeds the ATS
/// keyword set, so it carries no synthetic labels.
pub fn job_text(job: &JobPosting) -> String {
    let mut text = format!("{} at {}", job.title, job.company);
    if !job.description.trim().is_empty() {
        text.push_str("\n\n");
        text.push_str(job.description.trim());
    }
    text
}

/// Tailoring bound to the store: ticketing, generation, and commit.
#[derive(Clone)]
pub struct Tailor {
    store: Arc<dyn Store>,
    gate: Arc<GenerationGate>,
    base_profile: Arc<BaseProfile>,
}

impl Tailor {
    pub fn new(
        store: Arc<dyn Store>,
        gate: Arc<GenerationGate>,
        base_profile: Arc<BaseProfile>,
    ) -> Self {
        Self {
            store,
            gate,
            base_profile,
        }
    }

    /// Generates a new package version for the job. Status is not changed.
    ///
    /// The generation ticket is taken before the model call. If a later ticket
    /// has committed by the time this one finishes, this package is stored as
    /// superseded and returned with `superseded == true`.
    pub async fn tailor_job(
        &self,
        fingerprint: &Fingerprint,
        company_context: Option<&str>,
    ) -> Result<ApplicationPackage, AppError> {
        let job = self
            .store
            .get_job(fingerprint)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("job {fingerprint}")))?;
        if !accepts_tailoring(job.status) {
            return Err(AppError::Conflict(format!(
                "job {fingerprint} is {}; tailoring is unavailable",
                job.status
            )));
        }

        let ticket = self
            .store
            .begin_generation(fingerprint)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("job {fingerprint}")))?;

        let generated = tailor(
            &self.gate,
            &self.base_profile,
            &job_text(&job),
            company_context,
        )
        .await?;

        let mut package = ApplicationPackage {
            job: *fingerprint,
            version: ticket,
            superseded: false,
            resume: generated.resume,
            cover_letter: generated.cover_letter,
            ats: generated.ats,
            tailoring_notes: generated.tailoring_notes,
            generated_at: Utc::now(),
            source_model: self.gate.model_id(),
        };

        let commit = self.store.commit_package(package.clone()).await?;
        package.superseded = !commit.current;
        if commit.current {
            info!(
                "Package v{} is current for job {fingerprint} (ATS {:.2})",
                commit.version, package.ats.score
            );
        } else {
            info!(
                "Package v{} for job {fingerprint} was overtaken and stored as superseded",
                commit.version
            );
        }
        Ok(package)
    }

    pub async fn current(&self, fingerprint: &Fingerprint) -> Result<ApplicationPackage, AppError> {
        self.store
            .current_package(fingerprint)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("package for job {fingerprint}")))
    }

    pub async fn history(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Vec<ApplicationPackage>, AppError> {
        if !self.store.job_exists(fingerprint).await? {
            return Err(AppError::NotFound(format!("job {fingerprint}")));
        }
        Ok(self.store.package_history(fingerprint).await?)
    }
}
