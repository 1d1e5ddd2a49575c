use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns service status, version and how many lookup rows are cached.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "boston311-api",
        "fetch_mode": state.config.fetch_mode,
        "lookups": {
            "statuses": state.lookups.statuses.options().len(),
            "departments": state.lookups.departments.options().len(),
            "request_types": state.lookups.request_types.options().len(),
            "priorities": state.lookups.priorities.options().len(),
        }
    }))
}
