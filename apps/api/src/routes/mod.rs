pub mod health;

use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::intake::handlers::handle_intake;
use crate::lookup::handlers::handle_get_lookups;
use crate::map::handlers::handle_get_map;
use crate::requests::handlers::{
    handle_dashboard, handle_get_history, handle_get_request, handle_list_requests,
};
use crate::state::AppState;
use crate::status::handlers::handle_update_status;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/lookups", get(handle_get_lookups))
        // Request list and detail
        .route("/api/v1/requests", get(handle_list_requests))
        .route("/api/v1/requests/:id", get(handle_get_request))
        .route("/api/v1/requests/:id/history", get(handle_get_history))
        .route("/api/v1/requests/:id/status", patch(handle_update_status))
        // Map and dashboard
        .route("/api/v1/map", get(handle_get_map))
        .route("/api/v1/dashboard", get(handle_dashboard))
        // Intake
        .route("/api/v1/intake", post(handle_intake))
        .with_state(state)
}
