//! Heat surface: points binned into a lat/lng grid whose cells halve in size
//! with each zoom level. Intensity is a cell's count over the densest cell's.

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

/// Cell edge in degrees at zoom 0.
const BASE_CELL_DEGREES: f64 = 11.25;
const MAX_ZOOM: f64 = 22.0;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HeatCell {
    pub latitude: f64,
    pub longitude: f64,
    pub count: usize,
    /// In (0, 1]; the densest cell is 1.0.
    pub intensity: f64,
}

#[derive(Debug, Error)]
#[error("heat rendering unavailable: {0}")]
pub struct HeatUnavailable(pub String);

/// Heat-layer capability. The visualizer falls back to markers when this is
/// absent or reports itself unavailable.
pub trait HeatRenderer: Send + Sync {
    fn render(&self, points: &[(f64, f64)], zoom: f64) -> Result<Vec<HeatCell>, HeatUnavailable>;
}

pub struct GridHeatRenderer;

impl HeatRenderer for GridHeatRenderer {
    fn render(&self, points: &[(f64, f64)], zoom: f64) -> Result<Vec<HeatCell>, HeatUnavailable> {
        Ok(aggregate(points, zoom))
    }
}

pub fn cell_size_degrees(zoom: f64) -> f64 {
    let zoom = if zoom.is_finite() { zoom.clamp(0.0, MAX_ZOOM) } else { 0.0 };
    BASE_CELL_DEGREES / 2f64.powf(zoom)
}

pub fn aggregate(points: &[(f64, f64)], zoom: f64) -> Vec<HeatCell> {
    let size = cell_size_degrees(zoom);
    let mut cells: BTreeMap<(i64, i64), usize> = BTreeMap::new();
    for &(lat, lng) in points {
        let key = ((lat / size).floor() as i64, (lng / size).floor() as i64);
        *cells.entry(key).or_default() += 1;
    }
    let densest = cells.values().copied().max().unwrap_or(0);
    if densest == 0 {
        return Vec::new();
    }
    cells
        .into_iter()
        .map(|((row, col), count)| HeatCell {
            latitude: (row as f64 + 0.5) * size,
            longitude: (col as f64 + 0.5) * size,
            count,
            intensity: count as f64 / densest as f64,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_size_halves_per_zoom_level() {
        assert_eq!(cell_size_degrees(0.0), 11.25);
        assert_eq!(cell_size_degrees(1.0), 5.625);
        assert!((cell_size_degrees(10.0) * 2.0 - cell_size_degrees(9.0)).abs() < 1e-12);
        assert_eq!(cell_size_degrees(-3.0), 11.25);
        assert_eq!(cell_size_degrees(f64::NAN), 11.25);
    }

    #[test]
    fn test_nearby_points_share_a_cell() {
        let points = [(42.3601, -71.0589), (42.3602, -71.0588), (42.3500, -71.1000)];
        let cells = aggregate(&points, 10.0);
        assert_eq!(cells.len(), 2);
        let total: usize = cells.iter().map(|c| c.count).sum();
        assert_eq!(total, 3);
        let dense = cells.iter().find(|c| c.count == 2).expect("shared cell");
        assert_eq!(dense.intensity, 1.0);
        let sparse = cells.iter().find(|c| c.count == 1).expect("lone cell");
        assert_eq!(sparse.intensity, 0.5);
    }

    #[test]
    fn test_cell_centres_lie_near_their_points() {
        let cells = aggregate(&[(42.3601, -71.0589)], 12.0);
        let size = cell_size_degrees(12.0);
        assert!((cells[0].latitude - 42.3601).abs() <= size / 2.0);
        assert!((cells[0].longitude + 71.0589).abs() <= size / 2.0);
    }

    #[test]
    fn test_no_points_no_cells() {
        assert!(aggregate(&[], 8.0).is_empty());
    }
}
