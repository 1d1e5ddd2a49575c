use std::sync::Arc;

use crate::config::Config;
use crate::intake::model::IntakeModel;
use crate::lookup::LookupCache;
use crate::map::heat::HeatRenderer;
use crate::map::mode::MapThresholds;
use crate::store::RequestStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RequestStore>,
    /// Reference data loaded once at startup.
    pub lookups: Arc<LookupCache>,
    pub intake: Arc<dyn IntakeModel>,
    /// `None` when the heat layer is disabled; the map then always draws markers.
    pub heat: Option<Arc<dyn HeatRenderer>>,
    pub config: Config,
}

impl AppState {
    pub fn map_thresholds(&self) -> MapThresholds {
        MapThresholds {
            min_zoom: self.config.map_min_zoom,
            max_markers: self.config.map_max_markers,
        }
    }
}
