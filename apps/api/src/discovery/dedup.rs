//! Dedup index: a batch-local claim set in front of the store's
//! compare-and-register.
//!
//! The claim set only saves work (no scoring of a posting another query in the
//! same batch already surfaced). Correctness across concurrent batches comes
//! from `Store::insert_job_if_absent`.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use crate::models::job::{Fingerprint, JobPosting};
use crate::store::{RegisterOutcome, Store, StoreError};

pub struct DedupIndex {
    store: Arc<dyn Store>,
    claimed: Mutex<HashSet<Fingerprint>>,
}

impl DedupIndex {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            claimed: Mutex::new(HashSet::new()),
        }
    }

    /// True if the key is already stored or claimed earlier in this batch.
    pub async fn is_duplicate(&self, key: &Fingerprint) -> Result<bool, StoreError> {
        if self
            .claimed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(key)
        {
            return Ok(true);
        }
        self.store.job_exists(key).await
    }

    /// Claims the key for this batch. False if it was already claimed.
    pub fn claim(&self, key: Fingerprint) -> bool {
        self.claimed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key)
    }

    /// Atomic with the existence check; a concurrent batch that registered the
    /// same fingerprint first yields `Duplicate`.
    pub async fn register(&self, job: JobPosting) -> Result<RegisterOutcome, StoreError> {
        self.store.insert_job_if_absent(job).await
    }
}
