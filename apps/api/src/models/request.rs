use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// Columns selected for a `ServiceRequestRow`. `location` is derived by a
/// trigger and never read back.
pub const REQUEST_COLUMNS: &str = "id, created_at, raw_input, summary, request_type_id, \
     department_id, status_id, priority_id, address, latitude, longitude, is_emergency, is_valid";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct ServiceRequestRow {
    pub id: Uuid,
    pub created_at: Option<DateTime<Utc>>,
    pub raw_input: String,
    pub summary: String,
    pub request_type_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
    pub status_id: Uuid,
    pub priority_id: Option<Uuid>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub is_emergency: bool,
    pub is_valid: bool,
}

impl ServiceRequestRow {
    /// Returns `(latitude, longitude)` only when both are present and finite.
    /// A half-populated pair counts as no location at all.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) if lat.is_finite() && lng.is_finite() => Some((lat, lng)),
            _ => None,
        }
    }
}

/// Fields supplied when a request is created by intake or import.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewServiceRequest {
    pub created_at: Option<DateTime<Utc>>,
    pub raw_input: String,
    pub summary: String,
    pub request_type_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
    pub status_id: Uuid,
    pub priority_id: Option<Uuid>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub is_emergency: bool,
    pub is_valid: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct RequestHistoryRow {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub service_request_id: Uuid,
    pub status_id: Uuid,
    pub notes: Option<String>,
    pub updated_by: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AiAnalysisRow {
    pub id: Uuid,
    pub service_request_id: Uuid,
    pub triage_results: Option<Value>,
    pub validation_results: Option<Value>,
    pub classification_results: Option<Value>,
    pub geocoding_results: Option<Value>,
    pub confidence_scores: Option<Value>,
    pub created_at: DateTime<Utc>,
}

/// Analysis blobs written once alongside a new request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewAnalysis {
    pub triage_results: Option<Value>,
    pub validation_results: Option<Value>,
    pub classification_results: Option<Value>,
    pub geocoding_results: Option<Value>,
    pub confidence_scores: Option<Value>,
}
