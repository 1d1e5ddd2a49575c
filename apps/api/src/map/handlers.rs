use axum::{extract::State, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::extract::AppQuery;
use crate::map::mode::MapMode;
use crate::map::visualizer::{LatestLayer, MapLayer, MapVisualizer};
use crate::requests::fetcher::load;
use crate::requests::filter::FilterParams;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ZoomQuery {
    pub zoom: f64,
}

#[derive(Debug, Serialize)]
pub struct MapResponse {
    pub requested_mode: Option<MapMode>,
    pub fell_back: bool,
    pub total_records: usize,
    pub located_records: usize,
    pub layer: Option<MapLayer>,
}

/// GET /api/v1/map?zoom=
pub async fn handle_get_map(
    State(state): State<AppState>,
    AppQuery(zoom): AppQuery<ZoomQuery>,
    AppQuery(filter): AppQuery<FilterParams>,
) -> Result<Json<MapResponse>, AppError> {
    if !zoom.zoom.is_finite() {
        return Err(AppError::Validation("zoom must be a finite number".to_string()));
    }
    let filter = filter.to_filter()?;
    let records = load(state.store.as_ref(), state.config.fetch_mode, &filter).await?;

    let mut viz = MapVisualizer::new(
        state.map_thresholds(),
        state.heat.clone(),
        state.lookups.clone(),
        LatestLayer::default(),
        zoom.zoom,
    );
    viz.on_data(records, Utc::now());

    Ok(Json(MapResponse {
        requested_mode: viz.requested_mode(),
        fell_back: viz.fell_back(),
        total_records: viz.record_count(),
        located_records: viz.located_count(),
        layer: viz.into_sink().current,
    }))
}
