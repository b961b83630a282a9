pub mod health;
pub mod profile;

use axum::{
    routing::{get, post},
    Router,
};

use crate::discovery::handlers as jobs;
use crate::errors::AppError;
use crate::lifecycle::handlers as lifecycle;
use crate::models::job::Fingerprint;
use crate::outreach::handlers as outreach;
use crate::state::AppState;
use crate::tailoring::handlers as tailoring;

/// Parses a `:fingerprint` path segment.
pub fn fingerprint_param(raw: &str) -> Result<Fingerprint, AppError> {
    raw.parse()
        .map_err(|_| AppError::Validation(format!("'{raw}' is not a valid job fingerprint")))
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Jobs feed, discovery and lifecycle
        .route(
            "/api/jobs",
            get(jobs::handle_list_jobs).post(jobs::handle_create_job),
        )
        .route("/api/jobs/discover", post(jobs::handle_discover))
        .route("/api/jobs/rescore", post(jobs::handle_rescore))
        .route("/api/jobs/:fingerprint", get(jobs::handle_get_job))
        .route(
            "/api/jobs/:fingerprint/status",
            post(lifecycle::handle_set_status),
        )
        // Application packages
        .route(
            "/api/applications/:fingerprint",
            get(tailoring::handle_current_package),
        )
        .route(
            "/api/applications/:fingerprint/tailor",
            post(tailoring::handle_tailor),
        )
        .route(
            "/api/applications/:fingerprint/history",
            get(tailoring::handle_package_history),
        )
        // Outreach
        .route("/api/outreach", get(outreach::handle_list_drafts))
        .route("/api/outreach/draft", post(outreach::handle_create_draft))
        .route("/api/outreach/:id/sent", post(outreach::handle_mark_sent))
        .route(
            "/api/outreach/:id/follow-ups",
            get(outreach::handle_follow_ups),
        )
        // Profiles (read-only)
        .route("/api/preferences", get(profile::preferences_handler))
        .route("/api/profile", get(profile::profile_handler))
        .with_state(state)
}
