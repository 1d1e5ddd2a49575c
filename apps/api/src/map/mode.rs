use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MapMode {
    Markers,
    Heatmap,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct MapThresholds {
    /// At or above this zoom, markers are always drawn.
    pub min_zoom: f64,
    /// At or below this many points, markers are drawn at any zoom.
    pub max_markers: usize,
}

impl Default for MapThresholds {
    fn default() -> Self {
        Self {
            min_zoom: 16.0,
            max_markers: 100,
        }
    }
}

/// Markers iff `zoom >= min_zoom` or `point_count <= max_markers`.
pub fn select_mode(zoom: f64, point_count: usize, thresholds: &MapThresholds) -> MapMode {
    if zoom >= thresholds.min_zoom || point_count <= thresholds.max_markers {
        MapMode::Markers
    } else {
        MapMode::Heatmap
    }
}
