//! Job lifecycle state machine.
//!
//! The transition table lives here and nowhere else. Applying a transition is a
//! single compare-and-set in the store, so two racing requests cannot both
//! succeed from the same source state.

use chrono::Utc;
use tracing::info;

use crate::errors::AppError;
use crate::models::job::{Fingerprint, JobPosting, JobStatus};
use crate::store::{StatusUpdate, Store};

pub mod handlers;

/// Legal targets from each state. `archived` is terminal.
pub fn allowed_targets(from: JobStatus) -> &'static [JobStatus] {
    use JobStatus::*;
    match from {
        New => &[Favorited, Applied, Archived, Rejected],
        Favorited => &[Applied, Archived, Rejected],
        Applied => &[Archived, Rejected],
        Rejected => &[Archived],
        Archived => &[],
    }
}

pub fn is_allowed(from: JobStatus, to: JobStatus) -> bool {
    allowed_targets(from).contains(&to)
}

/// Every state that may move to `to`; the allowed-source set for the store's
/// compare-and-set.
pub fn allowed_sources(to: JobStatus) -> Vec<JobStatus> {
    JobStatus::ALL
        .into_iter()
        .filter(|from| is_allowed(*from, to))
        .collect()
}

/// Tailoring never changes status and is refused only for archived jobs.
pub fn accepts_tailoring(status: JobStatus) -> bool {
    status != JobStatus::Archived
}

/// Applies `to` if the job's current status allows it. On refusal the status
/// is left untouched and the error names the state actually observed.
pub async fn transition(
    store: &dyn Store,
    fingerprint: &Fingerprint,
    to: JobStatus,
) -> Result<JobPosting, AppError> {
    let sources = allowed_sources(to);
    match store
        .compare_and_set_status(fingerprint, &sources, to, Utc::now())
        .await?
    {
        StatusUpdate::Applied(job) => {
            info!("Job {fingerprint} moved to {to}");
            Ok(job)
        }
        StatusUpdate::Refused { current } => Err(AppError::InvalidTransition { from: current, to }),
        StatusUpdate::NotFound => Err(AppError::NotFound(format!("job {fingerprint}"))),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::store::MemoryStore;
    use crate::testkit;

    async fn store_with_job_in(status: JobStatus) -> (Arc<MemoryStore>, Fingerprint) {
        let store = Arc::new(MemoryStore::new());
        let mut job = testkit::job("https://a.co/1", "Senior PM", "Acme", 0.8);
        job.status = status;
        let fp = job.fingerprint;
        store.insert_job_if_absent(job).await.unwrap();
        (store, fp)
    }

    #[tokio::test]
    async fn test_rejected_to_applied_is_refused_and_status_kept() {
        let (store, fp) = store_with_job_in(JobStatus::Rejected).await;

        let err = transition(store.as_ref(), &fp, JobStatus::Applied)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AppError::InvalidTransition {
                from: JobStatus::Rejected,
                to: JobStatus::Applied
            }
        ));
        let job = store.get_job(&fp).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Rejected);
    }

    #[tokio::test]
    async fn test_every_pair_follows_the_table() {
        for from in JobStatus::ALL {
            for to in JobStatus::ALL {
                let (store, fp) = store_with_job_in(from).await;
                let result = transition(store.as_ref(), &fp, to).await;
                let status = store.get_job(&fp).await.unwrap().unwrap().status;

                if is_allowed(from, to) {
                    assert!(result.is_ok(), "{from} -> {to} should succeed");
                    assert_eq!(status, to);
                } else {
                    assert!(
                        matches!(result, Err(AppError::InvalidTransition { .. })),
                        "{from} -> {to} should be refused"
                    );
                    assert_eq!(status, from);
                }
            }
        }
    }

    #[test]
    fn test_archived_is_terminal() {
        assert!(allowed_targets(JobStatus::Archived).is_empty());
        assert!(allowed_sources(JobStatus::New).is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_duplicate_requests_apply_once() {
        let (store, fp) = store_with_job_in(JobStatus::New).await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                transition(store.as_ref(), &fp, JobStatus::Favorited).await
            }));
        }
        let mut applied = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                applied += 1;
            }
        }

        assert_eq!(applied, 1);
    }

    #[test]
    fn test_tailoring_allowed_except_archived() {
        for status in JobStatus::ALL {
            assert_eq!(accepts_tailoring(status), status != JobStatus::Archived);
        }
    }

    #[tokio::test]
    async fn test_unknown_job_is_not_found() {
        let store = MemoryStore::new();
        let fp = testkit::job("https://a.co/9", "PM", "Acme", 0.5).fingerprint;
        assert!(matches!(
            transition(&store, &fp, JobStatus::Favorited).await,
            Err(AppError::NotFound(_))
        ));
    }
}
