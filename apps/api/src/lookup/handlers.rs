use axum::{extract::State, Json};
use serde_json::Value;

use crate::errors::AppError;
use crate::state::AppState;

/// GET /api/v1/lookups
pub async fn handle_get_lookups(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let options = serde_json::to_value(state.lookups.options())
        .map_err(|e| AppError::Internal(e.into()))?;
    Ok(Json(options))
}
