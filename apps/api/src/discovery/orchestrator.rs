//! Discovery batch: search fan-out → fingerprint → dedup → pre-filter → score →
//! register. Plus manual entry and wholesale re-scoring.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::discovery::dedup::DedupIndex;
use crate::discovery::fingerprint::fingerprint;
use crate::discovery::prefilter;
use crate::discovery::scoring::{passes_threshold, request_model_signals, score, score_with_signals};
use crate::discovery::search::JobSearch;
use crate::errors::AppError;
use crate::llm_client::GenerationGate;
use crate::models::job::{CandidatePosting, Fingerprint, JobPosting, JobStatus, ScoreBreakdown};
use crate::models::profile::PreferenceProfile;
use crate::store::{JobFilter, RegisterOutcome, Store};

/// Jobs returned in the report's `top` list.
const REPORT_TOP_N: usize = 5;

#[derive(Debug, Default, Serialize)]
pub struct DiscoveryReport {
    pub queries_run: usize,
    pub queries_failed: usize,
    pub fetched: usize,
    pub duplicates: usize,
    pub prefiltered: usize,
    pub scored: usize,
    pub saved: usize,
    pub below_threshold: usize,
    /// Candidates dropped because a dedup lookup or register call failed.
    pub store_errors: usize,
    pub top: Vec<JobPosting>,
}

#[derive(Debug, Default, Serialize)]
pub struct RescoreReport {
    pub rescored: usize,
    pub passing: usize,
    /// Jobs whose feed membership flipped.
    pub changed_threshold: usize,
}

#[derive(Clone)]
pub struct Discovery {
    store: Arc<dyn Store>,
    gate: Arc<GenerationGate>,
    profile: Arc<PreferenceProfile>,
}

impl Discovery {
    pub fn new(
        store: Arc<dyn Store>,
        gate: Arc<GenerationGate>,
        profile: Arc<PreferenceProfile>,
    ) -> Self {
        Self {
            store,
            gate,
            profile,
        }
    }

    /// Runs one discovery batch over every configured query.
    ///
    /// A failed query is counted and skipped. Duplicates, pre-filtered and
    /// below-threshold postings are absorbed into the report, as are store
    /// failures for a single candidate.
    pub async fn run(&self, search: Arc<dyn JobSearch>) -> Result<DiscoveryReport, AppError> {
        let mut report = DiscoveryReport::default();
        let started = Utc::now();
        let today = started.date_naive();

        let mut searches = JoinSet::new();
        for query in self.profile.search_queries.iter().cloned() {
            let search = search.clone();
            searches.spawn(async move {
                let result = search.search(&query).await;
                (query, result)
            });
        }

        let mut raw = Vec::new();
        while let Some(joined) = searches.join_next().await {
            report.queries_run += 1;
            match joined {
                Ok((_, Ok(results))) => raw.extend(results),
                Ok((query, Err(e))) => {
                    report.queries_failed += 1;
                    warn!("Search query '{query}' failed: {e}");
                }
                Err(e) => {
                    report.queries_failed += 1;
                    warn!("Search task aborted: {e}");
                }
            }
        }
        report.fetched = raw.len();

        let index = DedupIndex::new(self.store.clone());
        let mut candidates = Vec::new();
        for posting in raw {
            let Some(candidate) = posting.into_candidate(today) else {
                debug!("Dropping search result without a URL");
                report.prefiltered += 1;
                continue;
            };
            let key = fingerprint(&candidate.url, &candidate.title, &candidate.company);
            let duplicate = match index.is_duplicate(&key).await {
                Ok(duplicate) => duplicate,
                Err(e) => {
                    warn!("Dedup lookup failed for job {key}, skipping: {e}");
                    report.store_errors += 1;
                    continue;
                }
            };
            if duplicate || !index.claim(key) {
                report.duplicates += 1;
                continue;
            }
            if let Some(reason) = prefilter::check(&candidate, &self.profile) {
                debug!("Pre-filtered '{}' at {}: {reason}", candidate.title, candidate.company);
                report.prefiltered += 1;
                continue;
            }
            candidates.push((key, candidate));
        }

        // Scoring fans out; the gate bounds how many model calls run at once.
        let mut scoring = JoinSet::new();
        for (key, candidate) in candidates {
            let gate = self.gate.clone();
            let profile = self.profile.clone();
            scoring.spawn(async move {
                let breakdown = evaluate(&gate, &profile, &candidate).await;
                (key, candidate, breakdown)
            });
        }

        let mut saved = Vec::new();
        while let Some(joined) = scoring.join_next().await {
            let (key, candidate, breakdown) = match joined {
                Ok(scored) => scored,
                Err(e) => {
                    warn!("Scoring task aborted: {e}");
                    continue;
                }
            };
            report.scored += 1;

            let passes = passes_threshold(&breakdown, self.profile.scoring.minimum_score);
            let job = build_job(key, candidate, breakdown, passes, started);
            match index.register(job).await {
                Ok(RegisterOutcome::Registered(job)) => {
                    report.saved += 1;
                    if job.passes_threshold {
                        saved.push(job);
                    } else {
                        report.below_threshold += 1;
                    }
                }
                Ok(RegisterOutcome::Duplicate(fp)) => {
                    debug!("Job {fp} registered concurrently by another batch");
                    report.duplicates += 1;
                }
                Err(e) => {
                    warn!("Failed to register job {key}: {e}");
                    report.store_errors += 1;
                }
            }
        }

        saved.sort_by(|a, b| b.score().total_cmp(&a.score()));
        saved.truncate(REPORT_TOP_N);
        report.top = saved;

        info!(
            "Discovery finished: {} queries ({} failed), {} fetched, {} duplicates, \
             {} pre-filtered, {} saved ({} below threshold), {} store errors",
            report.queries_run,
            report.queries_failed,
            report.fetched,
            report.duplicates,
            report.prefiltered,
            report.saved,
            report.below_threshold,
            report.store_errors
        );
        Ok(report)
    }

    /// Registers a manually entered posting through the same dedup and scoring path.
    pub async fn ingest_manual(&self, candidate: CandidatePosting) -> Result<JobPosting, AppError> {
        for (field, value) in [
            ("url", &candidate.url),
            ("title", &candidate.title),
            ("company", &candidate.company),
        ] {
            if value.trim().is_empty() {
                return Err(AppError::Validation(format!("{field} cannot be empty")));
            }
        }

        let key = fingerprint(&candidate.url, &candidate.title, &candidate.company);
        if self.store.job_exists(&key).await? {
            return Err(AppError::DuplicatePosting(key));
        }

        let breakdown = evaluate(&self.gate, &self.profile, &candidate).await;
        let passes = passes_threshold(&breakdown, self.profile.scoring.minimum_score);
        let job = build_job(key, candidate, breakdown, passes, Utc::now());

        match self.store.insert_job_if_absent(job).await? {
            RegisterOutcome::Registered(job) => {
                info!("Manually added job {} ({:.2})", job.fingerprint, job.score());
                Ok(job)
            }
            RegisterOutcome::Duplicate(fp) => Err(AppError::DuplicatePosting(fp)),
        }
    }

    /// Recomputes every stored breakdown against the current profile. Model
    /// signals recorded earlier are reused; no new model calls are made.
    pub async fn rescore_all(&self) -> Result<RescoreReport, AppError> {
        let mut report = RescoreReport::default();
        let minimum = self.profile.scoring.minimum_score;

        for job in self.store.list_jobs(&JobFilter::everything()).await? {
            let signals = job.score_breakdown.model_signals();
            let breakdown = score_with_signals(&candidate_of(&job), &self.profile, &signals);
            let passes = passes_threshold(&breakdown, minimum);

            if self
                .store
                .replace_score(&job.fingerprint, breakdown, passes)
                .await?
                .is_some()
            {
                report.rescored += 1;
                if passes {
                    report.passing += 1;
                }
                if passes != job.passes_threshold {
                    report.changed_threshold += 1;
                }
            }
        }

        info!(
            "Re-scored {} jobs: {} passing, {} changed feed membership",
            report.rescored, report.passing, report.changed_threshold
        );
        Ok(report)
    }
}

/// Model signals when enabled, falling back to rules on any generation failure.
async fn evaluate(
    gate: &GenerationGate,
    profile: &PreferenceProfile,
    candidate: &CandidatePosting,
) -> ScoreBreakdown {
    if profile.scoring.use_model_signals {
        match request_model_signals(gate, candidate, profile).await {
            Ok(signals) => return score_with_signals(candidate, profile, &signals),
            Err(e) => warn!(
                "Model scoring failed for '{}' at {}, using rules only: {e}",
                candidate.title, candidate.company
            ),
        }
    }
    score(candidate, profile)
}

fn build_job(
    fingerprint: Fingerprint,
    candidate: CandidatePosting,
    breakdown: ScoreBreakdown,
    passes_threshold: bool,
    at: DateTime<Utc>,
) -> JobPosting {
    JobPosting {
        fingerprint,
        url: candidate.url,
        title: candidate.title,
        company: candidate.company,
        location: candidate.location,
        salary_min: candidate.salary_min,
        salary_max: candidate.salary_max,
        description: candidate.description,
        source: candidate.source,
        posted_date: candidate.posted_date,
        discovered_at: at,
        updated_at: at,
        status: JobStatus::New,
        score_breakdown: breakdown,
        passes_threshold,
    }
}

fn candidate_of(job: &JobPosting) -> CandidatePosting {
    CandidatePosting {
        url: job.url.clone(),
        title: job.title.clone(),
        company: job.company.clone(),
        location: job.location.clone(),
        salary_min: job.salary_min,
        salary_max: job.salary_max,
        description: job.description.clone(),
        source: job.source.clone(),
        posted_date: job.posted_date,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::testkit::{self, FlakyStore, ScriptedGenerator, ScriptedSearch};

    const QUERY: &str = "Senior Product Manager AI remote";

    fn discovery(store: Arc<dyn Store>, profile: PreferenceProfile) -> Discovery {
        let gate = testkit::gate(ScriptedGenerator::repeating("{}".to_string()));
        Discovery::new(store, Arc::new(gate), Arc::new(profile))
    }

    fn single_query_profile() -> PreferenceProfile {
        let mut profile = testkit::preferences();
        profile.search_queries = vec![QUERY.to_string()];
        profile
    }

    #[tokio::test]
    async fn test_tracking_params_do_not_create_second_record() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let search: Arc<dyn JobSearch> = Arc::new(ScriptedSearch::new().with_results(
            QUERY,
            vec![
                testkit::raw("https://boards.co/job?id=5&utm_src=x", "Senior Product Manager", "Northwind"),
                testkit::raw("https://boards.co/job?id=5", "Senior Product Manager", "Northwind"),
            ],
        ));
        let discovery = discovery(store.clone(), single_query_profile());

        let first = discovery.run(search.clone()).await.unwrap();
        assert_eq!(first.saved, 1);
        assert_eq!(first.duplicates, 1);

        let second = discovery.run(search).await.unwrap();
        assert_eq!(second.saved, 0);
        assert_eq!(second.duplicates, 2);

        let jobs = store.list_jobs(&JobFilter::everything()).await.unwrap();
        assert_eq!(jobs.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_query_does_not_abort_batch() {
        let mut profile = testkit::preferences();
        profile.search_queries = vec!["broken".to_string(), QUERY.to_string()];
        let search: Arc<dyn JobSearch> = Arc::new(
            ScriptedSearch::new()
                .with_failure("broken")
                .with_results(
                    QUERY,
                    vec![testkit::raw("https://a.co/1", "Senior Product Manager", "Northwind")],
                ),
        );
        let discovery = discovery(Arc::new(MemoryStore::new()), profile);

        let report = discovery.run(search).await.unwrap();

        assert_eq!(report.queries_run, 2);
        assert_eq!(report.queries_failed, 1);
        assert_eq!(report.saved, 1);
    }

    #[tokio::test]
    async fn test_concurrent_batches_register_posting_once() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let search: Arc<dyn JobSearch> = Arc::new(ScriptedSearch::new().with_results(
            QUERY,
            vec![testkit::raw("https://a.co/1", "Senior Product Manager", "Northwind")],
        ));
        let a = discovery(store.clone(), single_query_profile());
        let b = a.clone();

        let (ra, rb) = tokio::join!(a.run(search.clone()), b.run(search));
        let (ra, rb) = (ra.unwrap(), rb.unwrap());

        assert_eq!(ra.saved + rb.saved, 1);
        assert_eq!(store.list_jobs(&JobFilter::everything()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_below_threshold_job_is_kept_but_hidden_from_feed() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let mut weak = testkit::raw("https://a.co/2", "Product Manager", "Globex");
        weak.location = Some("Denver, CO".to_string());
        weak.description = Some("Consumer retail app.".to_string());
        weak.detected_extensions.salary = Some("$110K a year".to_string());
        let search: Arc<dyn JobSearch> = Arc::new(ScriptedSearch::new().with_results(
            QUERY,
            vec![
                testkit::raw("https://a.co/1", "Senior Product Manager", "Northwind"),
                weak,
            ],
        ));
        let discovery = discovery(store.clone(), single_query_profile());

        let report = discovery.run(search).await.unwrap();

        assert_eq!(report.saved, 2);
        assert_eq!(report.below_threshold, 1);
        assert_eq!(report.top.len(), 1);
        let feed = store.list_jobs(&JobFilter::default()).await.unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].company, "Northwind");
    }

    #[tokio::test]
    async fn test_prefiltered_postings_are_not_stored() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let search: Arc<dyn JobSearch> = Arc::new(ScriptedSearch::new().with_results(
            QUERY,
            vec![testkit::raw("https://a.co/1", "Product Intern", "Northwind")],
        ));
        let discovery = discovery(store.clone(), single_query_profile());

        let report = discovery.run(search).await.unwrap();

        assert_eq!(report.prefiltered, 1);
        assert_eq!(report.saved, 0);
        assert!(store.list_jobs(&JobFilter::everything()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_model_signals_fall_back_to_rules() {
        let mut profile = single_query_profile();
        profile.scoring.use_model_signals = true;
        let gate = testkit::gate(ScriptedGenerator::repeating("I think it's a 9/10".to_string()));
        let discovery = Discovery::new(
            Arc::new(MemoryStore::new()),
            Arc::new(gate),
            Arc::new(profile),
        );
        let search: Arc<dyn JobSearch> = Arc::new(ScriptedSearch::new().with_results(
            QUERY,
            vec![testkit::raw("https://a.co/1", "Senior Product Manager", "Northwind")],
        ));

        let report = discovery.run(search).await.unwrap();

        assert_eq!(report.saved, 1);
        let job = &report.top[0];
        assert!(job
            .score_breakdown
            .criteria
            .values()
            .all(|c| c.source != crate::models::job::SignalSource::Model));
    }

    #[tokio::test]
    async fn test_manual_entry_rejects_duplicate() {
        let discovery = discovery(Arc::new(MemoryStore::new()), testkit::preferences());
        let candidate = testkit::candidate("https://a.co/1", "Senior Product Manager", "Northwind");

        discovery.ingest_manual(candidate.clone()).await.unwrap();
        let err = discovery.ingest_manual(candidate).await.unwrap_err();

        assert!(matches!(err, AppError::DuplicatePosting(_)));
    }

    #[tokio::test]
    async fn test_manual_entry_requires_url() {
        let discovery = discovery(Arc::new(MemoryStore::new()), testkit::preferences());
        let candidate = testkit::candidate("  ", "Senior Product Manager", "Northwind");

        assert!(matches!(
            discovery.ingest_manual(candidate).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_rescore_applies_new_threshold() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let job = discovery(store.clone(), testkit::preferences())
            .ingest_manual(testkit::candidate("https://a.co/1", "Senior Product Manager", "Northwind"))
            .await
            .unwrap();

        let mut stricter = testkit::preferences();
        stricter.scoring.minimum_score = 1.0;
        stricter.compensation.minimum_base_salary = Some(10_000_000);
        let report = discovery(store.clone(), stricter).rescore_all().await.unwrap();

        assert_eq!(report.rescored, 1);
        assert_eq!(report.changed_threshold, 1);
        let stored = store.get_job(&job.fingerprint).await.unwrap().unwrap();
        assert!(!stored.passes_threshold);
        assert!(stored.score() < 1.0);
    }

    #[tokio::test]
    async fn test_failed_dedup_lookup_skips_only_that_candidate() {
        let store = Arc::new(FlakyStore::new().failing_exists_call(2));
        let search: Arc<dyn JobSearch> = Arc::new(ScriptedSearch::new().with_results(
            QUERY,
            vec![
                testkit::raw("https://a.co/1", "Senior Product Manager", "Northwind"),
                testkit::raw("https://a.co/2", "Senior Product Manager", "Contoso"),
                testkit::raw("https://a.co/3", "Principal Product Manager", "Fabrikam"),
            ],
        ));
        let discovery = discovery(store.clone(), single_query_profile());

        let report = discovery.run(search).await.unwrap();

        assert_eq!(report.store_errors, 1);
        assert_eq!(report.saved, 2);
        assert_eq!(store.list_jobs(&JobFilter::everything()).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_register_is_counted_not_raised() {
        let store = Arc::new(FlakyStore::new().failing_inserts());
        let search: Arc<dyn JobSearch> = Arc::new(ScriptedSearch::new().with_results(
            QUERY,
            vec![
                testkit::raw("https://a.co/1", "Senior Product Manager", "Northwind"),
                testkit::raw("https://a.co/2", "Senior Product Manager", "Contoso"),
            ],
        ));
        let discovery = discovery(store, single_query_profile());

        let report = discovery.run(search).await.unwrap();

        assert_eq!(report.scored, 2);
        assert_eq!(report.store_errors, 2);
        assert_eq!(report.saved, 0);
        assert!(report.top.is_empty());
    }
}
