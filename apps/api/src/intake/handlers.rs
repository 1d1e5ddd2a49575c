use axum::{extract::State, Json};
use serde::Deserialize;

use crate::errors::AppError;
use crate::extract::AppJson;
use crate::intake::pipeline::{process_report, IntakeOutcome};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct IntakeRequest {
    pub text: String,
}

/// POST /api/v1/intake
pub async fn handle_intake(
    State(state): State<AppState>,
    AppJson(req): AppJson<IntakeRequest>,
) -> Result<Json<IntakeOutcome>, AppError> {
    let outcome = process_report(
        state.intake.as_ref(),
        state.store.as_ref(),
        &state.lookups,
        &req.text,
    )
    .await?;
    Ok(Json(outcome))
}
