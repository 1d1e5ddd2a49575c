use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::extract::AppQuery;
use crate::requests::detail::{history_views, load_detail, HistoryView, RequestDetail};
use crate::requests::fetcher::load;
use crate::requests::filter::FilterParams;
use crate::requests::pipeline::{self, ListViewState, Page, RequestView, SortDirection, SortField};
use crate::requests::summary::{summarize, DashboardSummary};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub q: Option<String>,
    pub sort: Option<SortField>,
    pub dir: Option<SortDirection>,
    pub page: Option<usize>,
}

impl ListParams {
    pub fn into_view_state(self) -> ListViewState {
        let defaults = ListViewState::default();
        ListViewState {
            query: self.q.unwrap_or(defaults.query),
            sort: self.sort.unwrap_or(defaults.sort),
            direction: self.dir.unwrap_or(defaults.direction),
            page: self.page.unwrap_or(defaults.page),
        }
    }
}

/// GET /api/v1/requests
pub async fn handle_list_requests(
    State(state): State<AppState>,
    AppQuery(filter): AppQuery<FilterParams>,
    AppQuery(list): AppQuery<ListParams>,
) -> Result<Json<Page<RequestView>>, AppError> {
    let filter = filter.to_filter()?;
    let records = load(state.store.as_ref(), state.config.fetch_mode, &filter).await?;
    let view = list.into_view_state();
    Ok(Json(pipeline::run(
        &records,
        &state.lookups,
        &view,
        state.config.page_size,
    )))
}

/// GET /api/v1/requests/:id
pub async fn handle_get_request(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RequestDetail>, AppError> {
    Ok(Json(load_detail(state.store.as_ref(), &state.lookups, id).await?))
}

/// GET /api/v1/requests/:id/history
pub async fn handle_get_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<HistoryView>>, AppError> {
    if state.store.get_request(id).await?.is_none() {
        return Err(AppError::NotFound(format!("Service request {id} not found")));
    }
    Ok(Json(history_views(state.store.as_ref(), &state.lookups, id).await?))
}

/// GET /api/v1/dashboard
pub async fn handle_dashboard(
    State(state): State<AppState>,
    AppQuery(filter): AppQuery<FilterParams>,
) -> Result<Json<DashboardSummary>, AppError> {
    let filter = filter.to_filter()?;
    let records = load(state.store.as_ref(), state.config.fetch_mode, &filter).await?;
    Ok(Json(summarize(&records, &state.lookups)))
}
