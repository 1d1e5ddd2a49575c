// Map visualization: zoom/density-dependent choice between individual
// markers and an aggregated heat surface.

pub mod handlers;
pub mod heat;
pub mod markers;
pub mod mode;
pub mod visualizer;

