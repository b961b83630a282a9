//! In-process store. One mutex guards the whole arena, so every trait method is
//! a single critical section. Nothing awaits while the lock is held.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{
    DraftFilter, JobFilter, PackageCommit, RegisterOutcome, SendOutcome, StatusUpdate, Store,
    StoreError,
};
use crate::models::job::{Fingerprint, JobPosting, JobStatus, ScoreBreakdown};
use crate::models::outreach::{DraftStatus, OutreachDraft};
use crate::models::package::ApplicationPackage;

#[derive(Default)]
struct Arena {
    jobs: HashMap<Fingerprint, JobPosting>,
    generations: HashMap<Fingerprint, u64>,
    packages: HashMap<Fingerprint, Vec<ApplicationPackage>>,
    drafts: HashMap<Uuid, OutreachDraft>,
}

#[derive(Default)]
pub struct MemoryStore {
    arena: Mutex<Arena>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Arena>, StoreError> {
        self.arena
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }
}

fn feed_order(a: &JobPosting, b: &JobPosting) -> Ordering {
    b.score()
        .partial_cmp(&a.score())
        .unwrap_or(Ordering::Equal)
        .then_with(|| b.discovered_at.cmp(&a.discovered_at))
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_job_if_absent(&self, job: JobPosting) -> Result<RegisterOutcome, StoreError> {
        let mut arena = self.lock()?;
        if arena.jobs.contains_key(&job.fingerprint) {
            return Ok(RegisterOutcome::Duplicate(job.fingerprint));
        }
        arena.jobs.insert(job.fingerprint, job.clone());
        Ok(RegisterOutcome::Registered(job))
    }

    async fn job_exists(&self, fingerprint: &Fingerprint) -> Result<bool, StoreError> {
        Ok(self.lock()?.jobs.contains_key(fingerprint))
    }

    async fn get_job(&self, fingerprint: &Fingerprint) -> Result<Option<JobPosting>, StoreError> {
        Ok(self.lock()?.jobs.get(fingerprint).cloned())
    }

    async fn list_jobs(&self, filter: &JobFilter) -> Result<Vec<JobPosting>, StoreError> {
        let arena = self.lock()?;
        let mut jobs: Vec<JobPosting> = arena
            .jobs
            .values()
            .filter(|job| filter.matches(job))
            .cloned()
            .collect();
        jobs.sort_by(feed_order);
        if let Some(limit) = filter.limit {
            jobs.truncate(limit);
        }
        Ok(jobs)
    }

    async fn compare_and_set_status(
        &self,
        fingerprint: &Fingerprint,
        allowed_from: &[JobStatus],
        to: JobStatus,
        at: DateTime<Utc>,
    ) -> Result<StatusUpdate, StoreError> {
        let mut arena = self.lock()?;
        let Some(job) = arena.jobs.get_mut(fingerprint) else {
            return Ok(StatusUpdate::NotFound);
        };
        if !allowed_from.contains(&job.status) {
            return Ok(StatusUpdate::Refused {
                current: job.status,
            });
        }
        job.status = to;
        job.updated_at = at;
        Ok(StatusUpdate::Applied(job.clone()))
    }

    async fn replace_score(
        &self,
        fingerprint: &Fingerprint,
        breakdown: ScoreBreakdown,
        passes_threshold: bool,
    ) -> Result<Option<JobPosting>, StoreError> {
        let mut arena = self.lock()?;
        Ok(arena.jobs.get_mut(fingerprint).map(|job| {
            job.updated_at = breakdown.scored_at;
            job.score_breakdown = breakdown;
            job.passes_threshold = passes_threshold;
            job.clone()
        }))
    }

    async fn begin_generation(&self, fingerprint: &Fingerprint) -> Result<Option<u64>, StoreError> {
        let mut arena = self.lock()?;
        if !arena.jobs.contains_key(fingerprint) {
            return Ok(None);
        }
        let counter = arena.generations.entry(*fingerprint).or_insert(0);
        *counter += 1;
        Ok(Some(*counter))
    }

    async fn commit_package(
        &self,
        mut package: ApplicationPackage,
    ) -> Result<PackageCommit, StoreError> {
        let mut arena = self.lock()?;
        let versions = arena.packages.entry(package.job).or_default();
        if versions.iter().any(|p| p.version == package.version) {
            return Err(StoreError::Corrupt(format!(
                "package version {} already stored for job {}",
                package.version, package.job
            )));
        }

        let current_version = versions
            .iter()
            .filter(|p| !p.superseded)
            .map(|p| p.version)
            .max();
        let becomes_current = current_version.map_or(true, |v| package.version > v);

        if becomes_current {
            for prior in versions.iter_mut() {
                prior.superseded = true;
            }
        }
        package.superseded = !becomes_current;
        let commit = PackageCommit {
            version: package.version,
            current: becomes_current,
        };
        versions.push(package);
        Ok(commit)
    }

    async fn current_package(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Option<ApplicationPackage>, StoreError> {
        let arena = self.lock()?;
        Ok(arena.packages.get(fingerprint).and_then(|versions| {
            versions
                .iter()
                .filter(|p| !p.superseded)
                .max_by_key(|p| p.version)
                .cloned()
        }))
    }

    async fn package_history(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Vec<ApplicationPackage>, StoreError> {
        let arena = self.lock()?;
        let mut history = arena.packages.get(fingerprint).cloned().unwrap_or_default();
        history.sort_by(|a, b| b.version.cmp(&a.version));
        Ok(history)
    }

    async fn insert_draft(&self, draft: OutreachDraft) -> Result<OutreachDraft, StoreError> {
        let mut arena = self.lock()?;
        arena.drafts.insert(draft.id, draft.clone());
        Ok(draft)
    }

    async fn get_draft(&self, id: Uuid) -> Result<Option<OutreachDraft>, StoreError> {
        Ok(self.lock()?.drafts.get(&id).cloned())
    }

    async fn list_drafts(&self, filter: &DraftFilter) -> Result<Vec<OutreachDraft>, StoreError> {
        let arena = self.lock()?;
        let mut drafts: Vec<OutreachDraft> = arena
            .drafts
            .values()
            .filter(|d| filter.matches(d))
            .cloned()
            .collect();
        drafts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(drafts)
    }

    async fn mark_draft_sent(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<SendOutcome, StoreError> {
        let mut arena = self.lock()?;
        let Some(draft) = arena.drafts.get_mut(&id) else {
            return Ok(SendOutcome::NotFound);
        };
        if draft.status == DraftStatus::Sent {
            return Ok(SendOutcome::AlreadySent(draft.clone()));
        }
        if !draft.presentable() {
            return Ok(SendOutcome::NotPresentable(draft.clone()));
        }
        draft.status = DraftStatus::Sent;
        draft.sent_at = Some(at);
        Ok(SendOutcome::Sent(draft.clone()))
    }
}
