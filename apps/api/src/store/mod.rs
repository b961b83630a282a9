//! Persistence seam. Every operation that must be atomic per record is a single
//! trait method so each driver can implement it as one critical section.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::job::{Fingerprint, JobPosting, JobStatus, ScoreBreakdown};
use crate::models::outreach::{DraftStatus, OutreachDraft};
use crate::models::package::ApplicationPackage;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    pub status: Option<JobStatus>,
    /// Include jobs that failed the score threshold. Off for the default feed.
    pub include_below_threshold: bool,
    pub limit: Option<usize>,
}

impl JobFilter {
    pub fn everything() -> Self {
        Self {
            status: None,
            include_below_threshold: true,
            limit: None,
        }
    }

    pub fn matches(&self, job: &JobPosting) -> bool {
        self.status.map_or(true, |s| job.status == s)
            && (self.include_below_threshold || job.passes_threshold)
    }
}

#[derive(Debug, Clone, Default)]
pub struct DraftFilter {
    pub status: Option<DraftStatus>,
    pub job: Option<Fingerprint>,
    pub presentable_only: bool,
}

impl DraftFilter {
    pub fn matches(&self, draft: &OutreachDraft) -> bool {
        self.status.map_or(true, |s| draft.status == s)
            && self.job.map_or(true, |fp| draft.job == Some(fp))
            && (!self.presentable_only || draft.presentable())
    }
}

#[derive(Debug)]
pub enum RegisterOutcome {
    Registered(JobPosting),
    Duplicate(Fingerprint),
}

#[derive(Debug)]
pub enum StatusUpdate {
    Applied(JobPosting),
    /// Current status was not one of the allowed sources; nothing was written.
    Refused { current: JobStatus },
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackageCommit {
    pub version: u64,
    /// False when a newer generation was already current; the package was
    /// stored as superseded.
    pub current: bool,
}

#[derive(Debug)]
pub enum SendOutcome {
    Sent(OutreachDraft),
    AlreadySent(OutreachDraft),
    NotPresentable(OutreachDraft),
    NotFound,
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Compare-and-register: inserts the job only if no job with the same
    /// fingerprint exists, atomically with the check.
    async fn insert_job_if_absent(&self, job: JobPosting) -> Result<RegisterOutcome, StoreError>;

    async fn job_exists(&self, fingerprint: &Fingerprint) -> Result<bool, StoreError>;

    async fn get_job(&self, fingerprint: &Fingerprint) -> Result<Option<JobPosting>, StoreError>;

    /// Ordered by score descending, then discovery time descending.
    async fn list_jobs(&self, filter: &JobFilter) -> Result<Vec<JobPosting>, StoreError>;

    /// Moves the job to `to` only if its current status is in `allowed_from`.
    async fn compare_and_set_status(
        &self,
        fingerprint: &Fingerprint,
        allowed_from: &[JobStatus],
        to: JobStatus,
        at: DateTime<Utc>,
    ) -> Result<StatusUpdate, StoreError>;

    /// Replaces the breakdown wholesale.
    async fn replace_score(
        &self,
        fingerprint: &Fingerprint,
        breakdown: ScoreBreakdown,
        passes_threshold: bool,
    ) -> Result<Option<JobPosting>, StoreError>;

    /// Bumps and returns the job's generation counter. `None` if the job is unknown.
    async fn begin_generation(&self, fingerprint: &Fingerprint) -> Result<Option<u64>, StoreError>;

    /// Stores the package under `(job, version)`. It becomes current only if its
    /// version is newer than the current one; otherwise it is kept as superseded.
    async fn commit_package(&self, package: ApplicationPackage)
        -> Result<PackageCommit, StoreError>;

    async fn current_package(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Option<ApplicationPackage>, StoreError>;

    /// Every stored version, newest first.
    async fn package_history(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Vec<ApplicationPackage>, StoreError>;

    async fn insert_draft(&self, draft: OutreachDraft) -> Result<OutreachDraft, StoreError>;

    async fn get_draft(&self, id: Uuid) -> Result<Option<OutreachDraft>, StoreError>;

    /// Newest first.
    async fn list_drafts(&self, filter: &DraftFilter) -> Result<Vec<OutreachDraft>, StoreError>;

    /// One-way `draft → sent`, only for presentable drafts.
    async fn mark_draft_sent(&self, id: Uuid, at: DateTime<Utc>)
        -> Result<SendOutcome, StoreError>;
}
