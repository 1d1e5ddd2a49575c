use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::errors::AppError;
use crate::extract::AppJson;
use crate::requests::detail::RequestDetail;
use crate::state::AppState;
use crate::status::update::{StatusUpdateFlow, StatusUpdateForm};

/// PATCH /api/v1/requests/:id/status
pub async fn handle_update_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AppJson(form): AppJson<StatusUpdateForm>,
) -> Result<Json<RequestDetail>, AppError> {
    let mut flow = StatusUpdateFlow::new(id, form);
    let detail = flow.submit(state.store.as_ref(), &state.lookups).await?;
    Ok(Json(detail.clone()))
}
