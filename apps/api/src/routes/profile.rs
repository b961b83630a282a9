use axum::{extract::State, Json};

use crate::models::profile::{BaseProfile, PreferenceProfile};
use crate::state::AppState;

/// GET /api/preferences
pub async fn preferences_handler(State(state): State<AppState>) -> Json<PreferenceProfile> {
    Json(state.preferences.as_ref().clone())
}

/// GET /api/profile
/// The immutable base profile every package is grounded on.
pub async fn profile_handler(State(state): State<AppState>) -> Json<BaseProfile> {
    Json(state.base_profile.as_ref().clone())
}
