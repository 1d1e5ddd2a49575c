//! Storage seam. Handlers and flows talk to `dyn RequestStore`; the binary
//! wires in `PgStore`, tests wire in the in-memory store.

#[cfg(test)]
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::lookup::{LookupKind, LookupRow};
use crate::models::request::{
    AiAnalysisRow, NewAnalysis, NewServiceRequest, RequestHistoryRow, ServiceRequestRow,
};
use crate::requests::filter::RequestFilter;

#[async_trait]
pub trait RequestStore: Send + Sync {
    async fn lookups(&self, kind: LookupKind) -> Result<Vec<LookupRow>, AppError>;

    /// Records matching `filter`, newest first.
    async fn fetch_requests(&self, filter: &RequestFilter)
        -> Result<Vec<ServiceRequestRow>, AppError>;

    async fn get_request(&self, id: Uuid) -> Result<Option<ServiceRequestRow>, AppError>;

    /// History for one request, oldest first.
    async fn history(&self, id: Uuid) -> Result<Vec<RequestHistoryRow>, AppError>;

    async fn analysis(&self, id: Uuid) -> Result<Option<AiAnalysisRow>, AppError>;

    /// Sets `status_id`. The history row is appended by the storage layer, never by the caller.
    /// Returns `NotFound` when no such request exists.
    async fn update_status(
        &self,
        id: Uuid,
        status_id: Uuid,
        note: &str,
        updated_by: &str,
    ) -> Result<(), AppError>;

    async fn create_request(
        &self,
        request: &NewServiceRequest,
        analysis: &NewAnalysis,
    ) -> Result<Uuid, AppError>;
}
