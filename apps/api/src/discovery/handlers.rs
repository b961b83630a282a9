//! Axum route handlers for the jobs feed and discovery.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Deserialize;

use crate::discovery::parse::{parse_posted_date, parse_salary_range};
use crate::discovery::{DiscoveryReport, RescoreReport};
use crate::errors::AppError;
use crate::models::job::{CandidatePosting, JobPosting, JobStatus};
use crate::routes::fingerprint_param;
use crate::state::AppState;
use crate::store::JobFilter;

// ────────────────────────────────────────────────────────────────────────────
// Request types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListJobsQuery {
    pub status: Option<String>,
    #[serde(default)]
    pub include_below_threshold: bool,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ManualJobRequest {
    pub url: String,
    pub title: String,
    pub company: String,
    pub location: Option<String>,
    #[serde(default)]
    pub description: String,
    /// Free-form salary text, e.g. "$180K - $220K".
    pub salary: Option<String>,
    pub posted: Option<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/jobs
///
/// The feed: passing jobs by score, newest first among ties.
pub async fn handle_list_jobs(
    State(state): State<AppState>,
    Query(query): Query<ListJobsQuery>,
) -> Result<Json<Vec<JobPosting>>, AppError> {
    let status = query
        .status
        .as_deref()
        .map(str::parse::<JobStatus>)
        .transpose()
        .map_err(AppError::Validation)?;

    let filter = JobFilter {
        status,
        include_below_threshold: query.include_below_threshold,
        limit: query.limit,
    };
    Ok(Json(state.store.list_jobs(&filter).await?))
}

/// GET /api/jobs/:fingerprint
pub async fn handle_get_job(
    State(state): State<AppState>,
    Path(fingerprint): Path<String>,
) -> Result<Json<JobPosting>, AppError> {
    let fingerprint = fingerprint_param(&fingerprint)?;
    state
        .store
        .get_job(&fingerprint)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("job {fingerprint}")))
}

/// POST /api/jobs
///
/// Manual entry. Goes through the same dedup and scoring as discovery.
pub async fn handle_create_job(
    State(state): State<AppState>,
    Json(request): Json<ManualJobRequest>,
) -> Result<(StatusCode, Json<JobPosting>), AppError> {
    let (salary_min, salary_max) = request
        .salary
        .as_deref()
        .map(parse_salary_range)
        .unwrap_or((None, None));
    let posted_date = request
        .posted
        .as_deref()
        .and_then(|p| parse_posted_date(p, Utc::now().date_naive()));

    let candidate = CandidatePosting {
        url: request.url,
        title: request.title.trim().to_string(),
        company: request.company.trim().to_string(),
        location: request.location.filter(|l| !l.trim().is_empty()),
        salary_min,
        salary_max,
        description: request.description,
        source: "manual".to_string(),
        posted_date,
    };

    let job = state.discovery().ingest_manual(candidate).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

/// POST /api/jobs/discover
///
/// Runs one discovery batch synchronously and returns its report.
pub async fn handle_discover(
    State(state): State<AppState>,
) -> Result<Json<DiscoveryReport>, AppError> {
    let search = state.search.clone().ok_or_else(|| {
        AppError::Validation("job search is not configured (set SERPAPI_API_KEY)".to_string())
    })?;
    let report = state.discovery().run(search).await?;
    Ok(Json(report))
}

/// POST /api/jobs/rescore
pub async fn handle_rescore(
    State(state): State<AppState>,
) -> Result<Json<RescoreReport>, AppError> {
    Ok(Json(state.discovery().rescore_all().await?))
}
