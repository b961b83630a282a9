//! Test fixtures and scripted stand-ins for the external capabilities.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::discovery::fingerprint::fingerprint;
use crate::discovery::search::{DetectedExtensions, JobSearch, RawPosting, SearchError};
use crate::llm_client::{GenerationGate, GenerationRequest, Generator, LlmError};
use crate::models::job::{
    CandidatePosting, CriterionScore, Fingerprint, JobPosting, JobStatus, ScoreBreakdown,
    SignalSource,
};
use crate::models::outreach::OutreachDraft;
use crate::models::package::{ApplicationPackage, AtsReport, TailoredExperience, TailoredResume};
use crate::models::profile::{BaseProfile, PreferenceProfile};
use crate::store::{
    DraftFilter, JobFilter, MemoryStore, PackageCommit, RegisterOutcome, SendOutcome,
    StatusUpdate, Store, StoreError,
};

pub const SCRIPTED_MODEL: &str = "scripted-model";

pub fn base_profile() -> BaseProfile {
    serde_json::from_str(include_str!("../data/base_profile.json"))
        .expect("fixture base profile parses")
}

pub fn preferences() -> PreferenceProfile {
    serde_json::from_str(include_str!("../data/preferences.json"))
        .expect("fixture preferences parse")
}

/// A candidate that clears every default criterion.
pub fn candidate(url: &str, title: &str, company: &str) -> CandidatePosting {
    CandidatePosting {
        url: url.to_string(),
        title: title.to_string(),
        company: company.to_string(),
        location: Some("Remote".to_string()),
        salary_min: Some(200_000),
        salary_max: Some(240_000),
        description: "Lead the AI platform roadmap.".to_string(),
        source: "test".to_string(),
        posted_date: None,
    }
}

/// A search result shaped like a Google Jobs hit.
pub fn raw(url: &str, title: &str, company: &str) -> RawPosting {
    RawPosting {
        title: Some(title.to_string()),
        company_name: Some(company.to_string()),
        location: Some("Remote".to_string()),
        description: Some("Lead the AI platform roadmap.".to_string()),
        link: Some(url.to_string()),
        share_link: None,
        apply_options: vec![],
        detected_extensions: DetectedExtensions {
            posted_at: Some("2 days ago".to_string()),
            salary: Some("$200K - $240K a year".to_string()),
        },
    }
}

/// A stored job whose breakdown has a single rule criterion worth `score`.
pub fn job(url: &str, title: &str, company: &str, score: f64) -> JobPosting {
    let now = Utc::now();
    JobPosting {
        fingerprint: fingerprint(url, title, company),
        url: url.to_string(),
        title: title.to_string(),
        company: company.to_string(),
        location: Some("Remote".to_string()),
        salary_min: None,
        salary_max: None,
        description: format!("{title} at {company}."),
        source: "test".to_string(),
        posted_date: None,
        discovered_at: now,
        updated_at: now,
        status: JobStatus::New,
        score_breakdown: ScoreBreakdown {
            overall: score,
            criteria: BTreeMap::from([(
                "title_fit".to_string(),
                CriterionScore {
                    weight: 1.0,
                    sub_score: score,
                    source: SignalSource::Rule,
                },
            )]),
            scored_at: now,
        },
        passes_threshold: score >= preferences().scoring.minimum_score,
    }
}

pub fn package(job: Fingerprint, version: u64) -> ApplicationPackage {
    let base = base_profile();
    ApplicationPackage {
        job,
        version,
        superseded: false,
        resume: TailoredResume {
            contact: base.contact.clone(),
            summary: base.summary.clone(),
            experience: base
                .experience
                .iter()
                .map(|e| TailoredExperience {
                    id: e.id.clone(),
                    title: e.title.clone(),
                    company: e.company.clone(),
                    dates: e.dates.clone(),
                    location: e.location.clone(),
                    bullets: e.bullets.clone(),
                })
                .collect(),
            skills: base.skills.clone(),
        },
        cover_letter: "Dear hiring team, ...".to_string(),
        ats: AtsReport {
            score: 0.5,
            matched: Default::default(),
            missing: Default::default(),
            suggestions: vec![],
            model_reported_score: None,
        },
        tailoring_notes: None,
        generated_at: Utc::now(),
        source_model: SCRIPTED_MODEL.to_string(),
    }
}

/// Tailoring-mode output referencing the given experience ids. Known ids carry
/// their base title/company/dates; unknown ids get invented ones.
pub fn tailoring_output_with_ids(ids: &[&str]) -> Value {
    let base = base_profile();
    let experience: Vec<Value> = ids
        .iter()
        .map(|id| match base.experience_by_id(id) {
            Some(entry) => json!({
                "id": entry.id,
                "title": entry.title,
                "company": entry.company,
                "dates": entry.dates,
                "bullets": entry.bullets,
            }),
            None => json!({
                "id": id,
                "title": "Chief Product Officer",
                "company": "Initech",
                "dates": "2019 - 2020",
                "bullets": ["Tripled revenue in one quarter"],
            }),
        })
        .collect();

    json!({
        "tailored_resume": {
            "contact": {"name": "Someone Else"},
            "summary": "Product leader shipping data and AI platforms for developers.",
            "experience": experience,
            "skills": ["Roadmapping", "SQL"],
        },
        "ats_analysis": {"score": 0.93, "suggestions": []},
        "tailoring_notes": "Led with platform work.",
        "cover_letter": "Dear hiring team,\n\nI would love to help build your platform.",
    })
}

pub fn gate(generator: ScriptedGenerator) -> GenerationGate {
    GenerationGate::new(Arc::new(generator), 4, Duration::from_secs(5))
}

/// Replays scripted responses in order, then the fallback (if any).
pub struct ScriptedGenerator {
    script: Mutex<VecDeque<Result<String, LlmError>>>,
    fallback: Option<String>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new(script: Vec<Result<String, LlmError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: None,
            delay: None,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn repeating(response: String) -> Self {
        Self {
            fallback: Some(response),
            ..Self::new(vec![])
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    fn model_id(&self) -> &str {
        SCRIPTED_MODEL
    }

    async fn complete(&self, request: &GenerationRequest) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(request.prompt.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(result) => result,
            None => self.fallback.clone().ok_or(LlmError::EmptyContent),
        }
    }
}

/// Canned search results per query. Unknown queries return nothing.
#[derive(Default)]
pub struct ScriptedSearch {
    results: HashMap<String, Vec<RawPosting>>,
    failures: HashSet<String>,
}

impl ScriptedSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_results(mut self, query: &str, postings: Vec<RawPosting>) -> Self {
        self.results.insert(query.to_string(), postings);
        self
    }

    pub fn with_failure(mut self, query: &str) -> Self {
        self.failures.insert(query.to_string());
        self
    }
}

#[async_trait]
impl JobSearch for ScriptedSearch {
    async fn search(&self, query: &str) -> Result<Vec<RawPosting>, SearchError> {
        if self.failures.contains(query) {
            return Err(SearchError::Api {
                status: 429,
                message: "quota exceeded".to_string(),
            });
        }
        Ok(self.results.get(query).cloned().unwrap_or_default())
    }
}

/// A `MemoryStore` that fails chosen dedup lookups or every insert.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    exists_calls: AtomicUsize,
    failing_exists_call: Option<usize>,
    failing_inserts: bool,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails the nth `job_exists` call, counting from 1.
    pub fn failing_exists_call(mut self, n: usize) -> Self {
        self.failing_exists_call = Some(n);
        self
    }

    pub fn failing_inserts(mut self) -> Self {
        self.failing_inserts = true;
        self
    }

    fn unavailable() -> StoreError {
        StoreError::Unavailable("connection reset".to_string())
    }
}

#[async_trait]
impl Store for FlakyStore {
    async fn insert_job_if_absent(&self, job: JobPosting) -> Result<RegisterOutcome, StoreError> {
        if self.failing_inserts {
            return Err(Self::unavailable());
        }
        self.inner.insert_job_if_absent(job).await
    }

    async fn job_exists(&self, fingerprint: &Fingerprint) -> Result<bool, StoreError> {
        let call = self.exists_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.failing_exists_call == Some(call) {
            return Err(Self::unavailable());
        }
        self.inner.job_exists(fingerprint).await
    }

    async fn get_job(&self, fingerprint: &Fingerprint) -> Result<Option<JobPosting>, StoreError> {
        self.inner.get_job(fingerprint).await
    }

    async fn list_jobs(&self, filter: &JobFilter) -> Result<Vec<JobPosting>, StoreError> {
        self.inner.list_jobs(filter).await
    }

    async fn compare_and_set_status(
        &self,
        fingerprint: &Fingerprint,
        allowed_from: &[JobStatus],
        to: JobStatus,
        at: DateTime<Utc>,
    ) -> Result<StatusUpdate, StoreError> {
        self.inner
            .compare_and_set_status(fingerprint, allowed_from, to, at)
            .await
    }

    async fn replace_score(
        &self,
        fingerprint: &Fingerprint,
        breakdown: ScoreBreakdown,
        passes_threshold: bool,
    ) -> Result<Option<JobPosting>, StoreError> {
        self.inner
            .replace_score(fingerprint, breakdown, passes_threshold)
            .await
    }

    async fn begin_generation(&self, fingerprint: &Fingerprint) -> Result<Option<u64>, StoreError> {
        self.inner.begin_generation(fingerprint).await
    }

    async fn commit_package(
        &self,
        package: ApplicationPackage,
    ) -> Result<PackageCommit, StoreError> {
        self.inner.commit_package(package).await
    }

    async fn current_package(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Option<ApplicationPackage>, StoreError> {
        self.inner.current_package(fingerprint).await
    }

    async fn package_history(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Vec<ApplicationPackage>, StoreError> {
        self.inner.package_history(fingerprint).await
    }

    async fn insert_draft(&self, draft: OutreachDraft) -> Result<OutreachDraft, StoreError> {
        self.inner.insert_draft(draft).await
    }

    async fn get_draft(&self, id: Uuid) -> Result<Option<OutreachDraft>, StoreError> {
        self.inner.get_draft(id).await
    }

    async fn list_drafts(&self, filter: &DraftFilter) -> Result<Vec<OutreachDraft>, StoreError> {
        self.inner.list_drafts(filter).await
    }

    async fn mark_draft_sent(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<SendOutcome, StoreError> {
        self.inner.mark_draft_sent(id, at).await
    }
}
