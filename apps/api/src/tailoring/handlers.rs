use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::package::ApplicationPackage;
use crate::routes::fingerprint_param;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct TailorRequest {
    /// Extra company background folded into the prompt.
    pub company_context: Option<String>,
}

/// POST /api/applications/:fingerprint/tailor
///
/// Generates (or regenerates) the package. The job's status is untouched.
pub async fn handle_tailor(
    State(state): State<AppState>,
    Path(fingerprint): Path<String>,
    request: Option<Json<TailorRequest>>,
) -> Result<(StatusCode, Json<ApplicationPackage>), AppError> {
    let fingerprint = fingerprint_param(&fingerprint)?;
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let package = state
        .tailor()
        .tailor_job(&fingerprint, request.company_context.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(package)))
}

/// GET /api/applications/:fingerprint
pub async fn handle_current_package(
    State(state): State<AppState>,
    Path(fingerprint): Path<String>,
) -> Result<Json<ApplicationPackage>, AppError> {
    let fingerprint = fingerprint_param(&fingerprint)?;
    Ok(Json(state.tailor().current(&fingerprint).await?))
}

/// GET /api/applications/:fingerprint/history
///
/// Every version, newest first, superseded ones included.
pub async fn handle_package_history(
    State(state): State<AppState>,
    Path(fingerprint): Path<String>,
) -> Result<Json<Vec<ApplicationPackage>>, AppError> {
    let fingerprint = fingerprint_param(&fingerprint)?;
    Ok(Json(state.tailor().history(&fingerprint).await?))
}
