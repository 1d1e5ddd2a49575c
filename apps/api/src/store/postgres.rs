use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::lookup::{LookupKind, LookupRow};
use crate::models::request::{
    AiAnalysisRow, NewAnalysis, NewServiceRequest, RequestHistoryRow, ServiceRequestRow,
    REQUEST_COLUMNS,
};
use crate::requests::filter::RequestFilter;
use crate::store::RequestStore;

/// Postgres-backed store. Status history and the geography column are
/// maintained by triggers defined in `migrations/`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Appends the WHERE clause for `filter`. Empty selections add nothing.
fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &RequestFilter) {
    builder.push(" WHERE TRUE");
    let columns = [
        (LookupKind::Status, "status_id"),
        (LookupKind::Department, "department_id"),
        (LookupKind::RequestType, "request_type_id"),
        (LookupKind::Priority, "priority_id"),
    ];
    for (kind, column) in columns {
        let ids = filter.selection(kind);
        if ids.is_empty() {
            continue;
        }
        builder
            .push(format!(" AND {column} = ANY("))
            .push_bind(ids.iter().copied().collect::<Vec<Uuid>>())
            .push(")");
    }
    if let Some(range) = filter.date_range {
        if let Some(start) = range.start {
            builder.push(" AND created_at >= ").push_bind(start);
        }
        if let Some(end) = range.end {
            builder.push(" AND created_at <= ").push_bind(end);
        }
    }
}

#[async_trait]
impl RequestStore for PgStore {
    async fn lookups(&self, kind: LookupKind) -> Result<Vec<LookupRow>, AppError> {
        let sql = format!(
            "SELECT id, name, description FROM {} ORDER BY name",
            kind.table()
        );
        Ok(sqlx::query_as::<_, LookupRow>(&sql)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn fetch_requests(
        &self,
        filter: &RequestFilter,
    ) -> Result<Vec<ServiceRequestRow>, AppError> {
        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {REQUEST_COLUMNS} FROM service_requests"
        ));
        push_filter(&mut builder, filter);
        builder.push(" ORDER BY created_at DESC NULLS LAST, id");

        let rows = builder
            .build_query_as::<ServiceRequestRow>()
            .fetch_all(&self.pool)
            .await?;
        debug!("Fetched {} service requests", rows.len());
        Ok(rows)
    }

    async fn get_request(&self, id: Uuid) -> Result<Option<ServiceRequestRow>, AppError> {
        let sql = format!("SELECT {REQUEST_COLUMNS} FROM service_requests WHERE id = $1");
        Ok(sqlx::query_as::<_, ServiceRequestRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn history(&self, id: Uuid) -> Result<Vec<RequestHistoryRow>, AppError> {
        Ok(sqlx::query_as::<_, RequestHistoryRow>(
            r#"
            SELECT id, created_at, service_request_id, status_id, notes, updated_by
            FROM request_history
            WHERE service_request_id = $1
            ORDER BY created_at ASC, id
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn analysis(&self, id: Uuid) -> Result<Option<AiAnalysisRow>, AppError> {
        Ok(sqlx::query_as::<_, AiAnalysisRow>(
            r#"
            SELECT id, service_request_id, triage_results, validation_results,
                   classification_results, geocoding_results, confidence_scores, created_at
            FROM ai_analysis_results
            WHERE service_request_id = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn update_status(
        &self,
        id: Uuid,
        status_id: Uuid,
        note: &str,
        updated_by: &str,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        // Transaction-local settings read by the history trigger.
        sqlx::query(
            "SELECT set_config('app.status_note', $1, true), \
             set_config('app.updated_by', $2, true)",
        )
        .bind(note)
        .bind(updated_by)
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query("UPDATE service_requests SET status_id = $1 WHERE id = $2")
            .bind(status_id)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Service request {id} not found")));
        }

        tx.commit().await?;
        info!("Service request {id} moved to status {status_id} by {updated_by}");
        Ok(())
    }

    async fn create_request(
        &self,
        request: &NewServiceRequest,
        analysis: &NewAnalysis,
    ) -> Result<Uuid, AppError> {
        let mut tx = self.pool.begin().await?;

        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO service_requests
                (created_at, raw_input, summary, request_type_id, department_id, status_id,
                 priority_id, address, latitude, longitude, is_emergency, is_valid)
            VALUES (COALESCE($1, now()), $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING id
            "#,
        )
        .bind(request.created_at)
        .bind(&request.raw_input)
        .bind(&request.summary)
        .bind(request.request_type_id)
        .bind(request.department_id)
        .bind(request.status_id)
        .bind(request.priority_id)
        .bind(&request.address)
        .bind(request.latitude)
        .bind(request.longitude)
        .bind(request.is_emergency)
        .bind(request.is_valid)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO ai_analysis_results
                (service_request_id, triage_results, validation_results,
                 classification_results, geocoding_results, confidence_scores)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(id)
        .bind(&analysis.triage_results)
        .bind(&analysis.validation_results)
        .bind(&analysis.classification_results)
        .bind(&analysis.geocoding_results)
        .bind(&analysis.confidence_scores)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        info!("Created service request {id}");
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::requests::filter::FilterState;
    use chrono::Utc;

    fn sql_for(filter: &RequestFilter) -> String {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT 1 FROM service_requests");
        push_filter(&mut builder, filter);
        builder.sql().to_string()
    }

    #[test]
    fn test_unrestricted_filter_adds_no_predicates() {
        assert_eq!(
            sql_for(&RequestFilter::default()),
            "SELECT 1 FROM service_requests WHERE TRUE"
        );
    }

    #[test]
    fn test_selected_sets_bind_arrays() {
        let mut state = FilterState::default();
        state.select(LookupKind::Status, [Uuid::new_v4()]);
        let filter = state.select(LookupKind::Priority, [Uuid::new_v4(), Uuid::new_v4()]);
        let sql = sql_for(&filter);
        assert!(sql.contains("status_id = ANY($1)"), "{sql}");
        assert!(sql.contains("priority_id = ANY($2)"), "{sql}");
        assert!(!sql.contains("department_id"), "{sql}");
    }

    #[test]
    fn test_date_bounds_are_inclusive() {
        let mut state = FilterState::default();
        let filter = state.set_date_range(Some(Utc::now()), None);
        let sql = sql_for(&filter);
        assert!(sql.ends_with(" AND created_at >= $1"), "{sql}");
    }
}
