//! In-memory store used by tests. Mirrors the Postgres triggers: inserts and
//! status changes append a history row.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::lookup::{LookupKind, LookupRow};
use crate::models::request::{
    AiAnalysisRow, NewAnalysis, NewServiceRequest, RequestHistoryRow, ServiceRequestRow,
};
use crate::requests::filter::RequestFilter;
use crate::store::RequestStore;

#[derive(Default)]
pub struct MemoryStore {
    pub lookups: Vec<(LookupKind, LookupRow)>,
    pub requests: Mutex<Vec<ServiceRequestRow>>,
    pub history: Mutex<Vec<RequestHistoryRow>>,
    pub analyses: Mutex<Vec<AiAnalysisRow>>,
    /// When set, every write fails with a database error.
    pub fail_writes: AtomicBool,
    /// Number of storage calls that reached a write method.
    pub write_calls: Mutex<usize>,
}

impl MemoryStore {
    pub fn with_lookups(lookups: Vec<(LookupKind, LookupRow)>) -> Self {
        Self {
            lookups,
            ..Default::default()
        }
    }

    /// Seeds a record and its initial history row, as the insert trigger would.
    pub fn seed(&self, row: ServiceRequestRow) {
        self.append_history(row.id, row.status_id, None, None);
        self.requests.lock().unwrap().push(row);
    }

    pub fn history_len(&self) -> usize {
        self.history.lock().unwrap().len()
    }

    fn append_history(&self, id: Uuid, status_id: Uuid, notes: Option<&str>, by: Option<&str>) {
        let mut history = self.history.lock().unwrap();
        // Keep created_at strictly increasing per request even within one clock tick.
        let last = history
            .iter()
            .filter(|h| h.service_request_id == id)
            .map(|h| h.created_at)
            .max();
        let now = Utc::now();
        let created_at = match last {
            Some(last) if last >= now => last + Duration::microseconds(1),
            _ => now,
        };
        history.push(RequestHistoryRow {
            id: Uuid::new_v4(),
            created_at,
            service_request_id: id,
            status_id,
            notes: notes.map(str::to_string),
            updated_by: by.map(str::to_string),
        });
    }

    fn record_write(&self) -> Result<(), AppError> {
        *self.write_calls.lock().unwrap() += 1;
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl RequestStore for MemoryStore {
    async fn lookups(&self, kind: LookupKind) -> Result<Vec<LookupRow>, AppError> {
        Ok(self
            .lookups
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, row)| row.clone())
            .collect())
    }

    async fn fetch_requests(
        &self,
        filter: &RequestFilter,
    ) -> Result<Vec<ServiceRequestRow>, AppError> {
        Ok(self
            .requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }

    async fn get_request(&self, id: Uuid) -> Result<Option<ServiceRequestRow>, AppError> {
        Ok(self
            .requests
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == id)
            .cloned())
    }

    async fn history(&self, id: Uuid) -> Result<Vec<RequestHistoryRow>, AppError> {
        let mut rows: Vec<_> = self
            .history
            .lock()
            .unwrap()
            .iter()
            .filter(|h| h.service_request_id == id)
            .cloned()
            .collect();
        rows.sort_by_key(|h| h.created_at);
        Ok(rows)
    }

    async fn analysis(&self, id: Uuid) -> Result<Option<AiAnalysisRow>, AppError> {
        Ok(self
            .analyses
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.service_request_id == id)
            .cloned())
    }

    async fn update_status(
        &self,
        id: Uuid,
        status_id: Uuid,
        note: &str,
        updated_by: &str,
    ) -> Result<(), AppError> {
        self.record_write()?;
        {
            let mut requests = self.requests.lock().unwrap();
            let row = requests
                .iter_mut()
                .find(|r| r.id == id)
                .ok_or_else(|| AppError::NotFound(format!("Service request {id} not found")))?;
            row.status_id = status_id;
        }
        self.append_history(id, status_id, Some(note), Some(updated_by));
        Ok(())
    }

    async fn create_request(
        &self,
        request: &NewServiceRequest,
        analysis: &NewAnalysis,
    ) -> Result<Uuid, AppError> {
        self.record_write()?;
        let id = Uuid::new_v4();
        self.seed(ServiceRequestRow {
            id,
            created_at: Some(request.created_at.unwrap_or_else(Utc::now)),
            raw_input: request.raw_input.clone(),
            summary: request.summary.clone(),
            request_type_id: request.request_type_id,
            department_id: request.department_id,
            status_id: request.status_id,
            priority_id: request.priority_id,
            address: request.address.clone(),
            latitude: request.latitude,
            longitude: request.longitude,
            is_emergency: request.is_emergency,
            is_valid: request.is_valid,
        });
        self.analyses.lock().unwrap().push(AiAnalysisRow {
            id: Uuid::new_v4(),
            service_request_id: id,
            triage_results: analysis.triage_results.clone(),
            validation_results: analysis.validation_results.clone(),
            classification_results: analysis.classification_results.clone(),
            geocoding_results: analysis.geocoding_results.clone(),
            confidence_scores: analysis.confidence_scores.clone(),
            created_at: Utc::now(),
        });
        Ok(id)
    }
}
