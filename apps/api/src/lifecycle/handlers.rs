use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;

use crate::errors::AppError;
use crate::lifecycle;
use crate::models::job::{JobPosting, JobStatus};
use crate::routes::fingerprint_param;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

/// POST /api/jobs/:fingerprint/status
///
/// Explicit, human-triggered status change. Illegal moves return 409 with the
/// observed state.
pub async fn handle_set_status(
    State(state): State<AppState>,
    Path(fingerprint): Path<String>,
    Json(request): Json<StatusRequest>,
) -> Result<Json<JobPosting>, AppError> {
    let fingerprint = fingerprint_param(&fingerprint)?;
    let to: JobStatus = request.status.parse().map_err(AppError::Validation)?;
    let job = lifecycle::transition(state.store.as_ref(), &fingerprint, to).await?;
    Ok(Json(job))
}
