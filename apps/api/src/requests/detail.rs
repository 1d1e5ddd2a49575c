use serde::Serialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::lookup::LookupCache;
use crate::models::request::{AiAnalysisRow, RequestHistoryRow};
use crate::requests::pipeline::RequestView;
use crate::store::RequestStore;

#[derive(Debug, Clone, Serialize)]
pub struct HistoryView {
    #[serde(flatten)]
    pub entry: RequestHistoryRow,
    pub status: String,
}

/// One request with its status history and latest analysis, as shown in the detail view.
#[derive(Debug, Clone, Serialize)]
pub struct RequestDetail {
    pub request: RequestView,
    pub history: Vec<HistoryView>,
    pub analysis: Option<AiAnalysisRow>,
}

pub async fn history_views(
    store: &dyn RequestStore,
    lookups: &LookupCache,
    id: Uuid,
) -> Result<Vec<HistoryView>, AppError> {
    Ok(store
        .history(id)
        .await?
        .into_iter()
        .map(|entry| HistoryView {
            status: lookups.statuses.resolve(Some(entry.status_id)).name().to_string(),
            entry,
        })
        .collect())
}

pub async fn load_detail(
    store: &dyn RequestStore,
    lookups: &LookupCache,
    id: Uuid,
) -> Result<RequestDetail, AppError> {
    let record = store
        .get_request(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Service request {id} not found")))?;
    let history = history_views(store, lookups, id).await?;
    let analysis = store.analysis(id).await?;
    Ok(RequestDetail {
        request: RequestView::resolve(&record, lookups),
        history,
        analysis,
    })
}
