use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns a simple status object with service version and active backends.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "hunter-api",
        "store": if state.config.database_url.is_some() { "postgres" } else { "memory" },
        "model": state.gate.model_id(),
        "search_configured": state.search.is_some()
    }))
}
