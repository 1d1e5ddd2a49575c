#![allow(dead_code)]

//! Two-state map layer machine (Markers / Heatmap).
//!
//! Every zoom or data change re-evaluates `select_mode` and redraws. The
//! active layer is always detached from the sink before the replacement is
//! attached, so a sink never holds two layers at once.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::lookup::LookupCache;
use crate::map::heat::{HeatCell, HeatRenderer};
use crate::map::markers::{build_markers, Marker};
use crate::map::mode::{select_mode, MapMode, MapThresholds};
use crate::models::request::ServiceRequestRow;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum MapLayer {
    Markers { markers: Vec<Marker> },
    Heatmap { cells: Vec<HeatCell> },
}

impl MapLayer {
    pub fn mode(&self) -> MapMode {
        match self {
            MapLayer::Markers { .. } => MapMode::Markers,
            MapLayer::Heatmap { .. } => MapMode::Heatmap,
        }
    }
}

/// Receives layer lifecycle events.
pub trait LayerSink {
    fn attach(&mut self, layer: &MapLayer);
    fn detach(&mut self);
}

/// Sink that keeps only the currently attached layer.
#[derive(Debug, Default)]
pub struct LatestLayer {
    pub current: Option<MapLayer>,
}

impl LayerSink for LatestLayer {
    fn attach(&mut self, layer: &MapLayer) {
        self.current = Some(layer.clone());
    }

    fn detach(&mut self) {
        self.current = None;
    }
}

pub struct MapVisualizer<S: LayerSink> {
    thresholds: MapThresholds,
    heat: Option<Arc<dyn HeatRenderer>>,
    lookups: Arc<LookupCache>,
    sink: S,
    zoom: f64,
    records: Vec<ServiceRequestRow>,
    active: Option<MapMode>,
    requested: Option<MapMode>,
}

impl<S: LayerSink> MapVisualizer<S> {
    pub fn new(
        thresholds: MapThresholds,
        heat: Option<Arc<dyn HeatRenderer>>,
        lookups: Arc<LookupCache>,
        sink: S,
        zoom: f64,
    ) -> Self {
        Self {
            thresholds,
            heat,
            lookups,
            sink,
            zoom,
            records: Vec::new(),
            active: None,
            requested: None,
        }
    }

    pub fn on_zoom(&mut self, zoom: f64, now: DateTime<Utc>) -> MapMode {
        self.zoom = zoom;
        self.redraw(now)
    }

    pub fn on_data(&mut self, records: Vec<ServiceRequestRow>, now: DateTime<Utc>) -> MapMode {
        self.records = records;
        self.redraw(now)
    }

    pub fn active_mode(&self) -> Option<MapMode> {
        self.active
    }

    /// The mode the thresholds asked for on the last redraw.
    pub fn requested_mode(&self) -> Option<MapMode> {
        self.requested
    }

    /// True when the last redraw wanted a heatmap but drew markers instead.
    pub fn fell_back(&self) -> bool {
        self.requested == Some(MapMode::Heatmap) && self.active == Some(MapMode::Markers)
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    pub fn located_count(&self) -> usize {
        self.records.iter().filter(|r| r.coordinates().is_some()).count()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    fn redraw(&mut self, now: DateTime<Utc>) -> MapMode {
        let points: Vec<(f64, f64)> = self.records.iter().filter_map(|r| r.coordinates()).collect();
        let requested = select_mode(self.zoom, points.len(), &self.thresholds);
        self.requested = Some(requested);

        if self.active.take().is_some() {
            self.sink.detach();
        }

        let layer = match requested {
            MapMode::Markers => self.markers_layer(now),
            MapMode::Heatmap => match self.heat.as_deref().map(|h| h.render(&points, self.zoom)) {
                Some(Ok(cells)) => MapLayer::Heatmap { cells },
                Some(Err(e)) => {
                    warn!("{e}; drawing markers instead");
                    self.markers_layer(now)
                }
                None => {
                    warn!("No heat renderer configured; drawing markers instead");
                    self.markers_layer(now)
                }
            },
        };

        let mode = layer.mode();
        debug!(
            "Map redraw at zoom {}: {} points, mode {:?}",
            self.zoom,
            points.len(),
            mode
        );
        self.sink.attach(&layer);
        self.active = Some(mode);
        mode
    }

    fn markers_layer(&self, now: DateTime<Utc>) -> MapLayer {
        MapLayer::Markers {
            markers: build_markers(&self.records, &self.lookups, now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::heat::{GridHeatRenderer, HeatUnavailable};
    use crate::testing::{epoch, Seed};

    /// Panics if a layer is attached while another is still attached.
    #[derive(Default)]
    struct RecordingSink {
        attached: Option<MapMode>,
        events: Vec<String>,
    }

    impl LayerSink for RecordingSink {
        fn attach(&mut self, layer: &MapLayer) {
            assert!(self.attached.is_none(), "stale layer still attached");
            self.attached = Some(layer.mode());
            self.events.push(format!("attach {:?}", layer.mode()));
        }

        fn detach(&mut self) {
            assert!(self.attached.take().is_some(), "detach with nothing attached");
            self.events.push("detach".to_string());
        }
    }

    struct BrokenHeat;

    impl HeatRenderer for BrokenHeat {
        fn render(&self, _: &[(f64, f64)], _: f64) -> Result<Vec<HeatCell>, HeatUnavailable> {
            Err(HeatUnavailable("plugin failed to load".into()))
        }
    }

    fn dense_records(seed: &Seed, n: usize) -> Vec<ServiceRequestRow> {
        (0..n)
            .map(|i| {
                let mut r = seed.request(&format!("r{i}"), &seed.pothole, i as i64);
                r.latitude = Some(42.35 + (i as f64) * 0.0001);
                r
            })
            .collect()
    }

    fn visualizer(
        seed: &Seed,
        heat: Option<Arc<dyn HeatRenderer>>,
        zoom: f64,
    ) -> MapVisualizer<RecordingSink> {
        MapVisualizer::new(
            MapThresholds::default(),
            heat,
            Arc::new(seed.cache()),
            RecordingSink::default(),
            zoom,
        )
    }

    #[test]
    fn test_zoom_switches_between_modes() {
        let seed = Seed::new();
        let mut viz = visualizer(&seed, Some(Arc::new(GridHeatRenderer)), 10.0);
        assert_eq!(viz.on_data(dense_records(&seed, 150), epoch()), MapMode::Heatmap);
        assert_eq!(viz.on_zoom(16.0, epoch()), MapMode::Markers);
        assert_eq!(viz.on_zoom(12.0, epoch()), MapMode::Heatmap);
        assert_eq!(
            viz.sink().events,
            vec![
                "attach Heatmap",
                "detach",
                "attach Markers",
                "detach",
                "attach Heatmap"
            ]
        );
    }

    #[test]
    fn test_data_change_reevaluates_mode() {
        let seed = Seed::new();
        let mut viz = visualizer(&seed, Some(Arc::new(GridHeatRenderer)), 10.0);
        assert_eq!(viz.on_data(dense_records(&seed, 150), epoch()), MapMode::Heatmap);
        assert_eq!(viz.on_data(dense_records(&seed, 40), epoch()), MapMode::Markers);
    }

    #[test]
    fn test_unlocated_records_excluded_from_both_layers() {
        let seed = Seed::new();
        let mut records = dense_records(&seed, 150);
        for r in records.iter_mut().take(10) {
            r.latitude = None;
            r.longitude = None;
        }

        let mut viz = MapVisualizer::new(
            MapThresholds::default(),
            Some(Arc::new(GridHeatRenderer) as Arc<dyn HeatRenderer>),
            Arc::new(seed.cache()),
            LatestLayer::default(),
            10.0,
        );
        viz.on_data(records, epoch());
        assert_eq!(viz.record_count(), 150);
        assert_eq!(viz.located_count(), 140);
        match &viz.sink().current {
            Some(MapLayer::Heatmap { cells }) => {
                assert_eq!(cells.iter().map(|c| c.count).sum::<usize>(), 140)
            }
            other => panic!("expected heatmap, got {other:?}"),
        }

        viz.on_zoom(17.0, epoch());
        match &viz.sink().current {
            Some(MapLayer::Markers { markers }) => assert_eq!(markers.len(), 140),
            other => panic!("expected markers, got {other:?}"),
        }
    }

    #[test]
    fn test_falls_back_to_markers_when_heat_fails() {
        let seed = Seed::new();
        let mut viz = visualizer(&seed, Some(Arc::new(BrokenHeat)), 10.0);
        assert_eq!(viz.on_data(dense_records(&seed, 150), epoch()), MapMode::Markers);
        assert_eq!(viz.requested_mode(), Some(MapMode::Heatmap));
        assert!(viz.fell_back());
    }

    #[test]
    fn test_falls_back_to_markers_without_heat_renderer() {
        let seed = Seed::new();
        let mut viz = visualizer(&seed, None, 10.0);
        assert_eq!(viz.on_data(dense_records(&seed, 150), epoch()), MapMode::Markers);
        assert!(viz.fell_back());
        assert_eq!(viz.sink().events, vec!["attach Markers"]);
    }
}
