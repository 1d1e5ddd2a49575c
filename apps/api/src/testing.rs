//! Shared fixtures for unit tests.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use uuid::Uuid;

use crate::config::Config;
use crate::intake::extract::ExtractedRequest;
use crate::intake::model::IntakeModel;
use crate::intake::triage::PreClassification;
use crate::llm_client::{LlmError, DEFAULT_MODEL};
use crate::lookup::LookupCache;
use crate::map::heat::{GridHeatRenderer, HeatRenderer};
use crate::models::lookup::{LookupKind, LookupRow};
use crate::models::request::ServiceRequestRow;
use crate::requests::fetcher::FetchMode;
use crate::state::AppState;
use crate::store::RequestStore;

pub fn lookup(name: &str) -> LookupRow {
    LookupRow {
        id: Uuid::new_v4(),
        name: name.to_string(),
        description: None,
    }
}

/// A small seeded reference set shaped like the production seed data.
pub struct Seed {
    pub new: LookupRow,
    pub in_progress: LookupRow,
    pub closed: LookupRow,
    pub public_works: LookupRow,
    pub parks: LookupRow,
    pub pothole: LookupRow,
    pub graffiti: LookupRow,
    pub low: LookupRow,
    pub medium: LookupRow,
    pub critical: LookupRow,
}

impl Seed {
    pub fn new() -> Self {
        Self {
            new: lookup("New"),
            in_progress: lookup("In Progress"),
            closed: lookup("Closed"),
            public_works: lookup("Public Works"),
            parks: lookup("Parks and Recreation"),
            pothole: lookup("Pothole"),
            graffiti: lookup("Graffiti Removal"),
            low: lookup("Low"),
            medium: lookup("Medium"),
            critical: lookup("Critical"),
        }
    }

    pub fn rows(&self) -> Vec<(LookupKind, LookupRow)> {
        vec![
            (LookupKind::Status, self.new.clone()),
            (LookupKind::Status, self.in_progress.clone()),
            (LookupKind::Status, self.closed.clone()),
            (LookupKind::Department, self.public_works.clone()),
            (LookupKind::Department, self.parks.clone()),
            (LookupKind::RequestType, self.pothole.clone()),
            (LookupKind::RequestType, self.graffiti.clone()),
            (LookupKind::Priority, self.low.clone()),
            (LookupKind::Priority, self.medium.clone()),
            (LookupKind::Priority, self.critical.clone()),
        ]
    }

    pub fn cache(&self) -> LookupCache {
        LookupCache::from_rows(self.rows())
    }

    /// A valid request of the given type, created `minutes_ago` before a fixed epoch.
    pub fn request(
        &self,
        summary: &str,
        request_type: &LookupRow,
        minutes_ago: i64,
    ) -> ServiceRequestRow {
        ServiceRequestRow {
            id: Uuid::new_v4(),
            created_at: Some(epoch() - Duration::minutes(minutes_ago)),
            raw_input: summary.to_string(),
            summary: summary.to_string(),
            request_type_id: Some(request_type.id),
            department_id: Some(self.public_works.id),
            status_id: self.new.id,
            priority_id: Some(self.medium.id),
            address: Some("1 City Hall Sq, Boston, MA".to_string()),
            latitude: Some(42.3603),
            longitude: Some(-71.0580),
            is_emergency: false,
            is_valid: true,
        }
    }
}

pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

/// Intake model returning fixed answers. `None` makes the call fail.
pub struct CannedModel {
    pub classification: Option<PreClassification>,
    pub extracted: Option<ExtractedRequest>,
}

#[async_trait]
impl IntakeModel for CannedModel {
    async fn pre_classify(&self, _: &str) -> Result<PreClassification, LlmError> {
        self.classification.clone().ok_or(LlmError::EmptyContent)
    }

    async fn extract(&self, _: &str) -> Result<ExtractedRequest, LlmError> {
        self.extracted.clone().ok_or(LlmError::EmptyContent)
    }
}

pub fn config() -> Config {
    Config {
        database_url: "postgres://localhost/boston311_test".to_string(),
        anthropic_api_key: "test-key".to_string(),
        llm_model: DEFAULT_MODEL.to_string(),
        port: 0,
        rust_log: "debug".to_string(),
        page_size: 10,
        map_min_zoom: 16.0,
        map_max_markers: 100,
        heatmap_enabled: true,
        fetch_mode: FetchMode::InMemory,
    }
}

/// App state over `store` with the grid heat renderer and a model that always fails.
pub fn app_state(store: Arc<dyn RequestStore>, seed: &Seed) -> AppState {
    let heat: Arc<dyn HeatRenderer> = Arc::new(GridHeatRenderer);
    AppState {
        store,
        lookups: Arc::new(seed.cache()),
        intake: Arc::new(CannedModel {
            classification: None,
            extracted: None,
        }),
        heat: Some(heat),
        config: config(),
    }
}
