//! `api import <csv> [--limit N]`: loads an open-data 311 export into
//! `service_requests`.
//!
//! Status, department and request type names the reference tables lack are
//! seeded first. All request batches are inserted in one transaction, so a failed
//! batch leaves the table untouched.

pub mod transform;

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{info, warn};
use uuid::Uuid;

use crate::lookup::LookupCache;
use crate::models::lookup::LookupKind;
use crate::store::postgres::PgStore;

use self::transform::{missing_lookups, transform_row, CsvRow, ImportedRequest};

const BATCH_SIZE: usize = 500;
const PROGRESS_EVERY: usize = 1000;

#[derive(Debug, Default, PartialEq)]
pub struct ImportReport {
    pub rows_read: usize,
    pub rows_skipped: usize,
    pub seeded_lookups: usize,
    pub inserted: usize,
}

/// Reads up to `limit` rows. Rows the CSV reader cannot decode are skipped
/// and counted in the returned total.
pub fn read_rows(path: &Path, limit: Option<usize>) -> Result<(Vec<CsvRow>, usize)> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open CSV file {}", path.display()))?;

    let mut rows = Vec::new();
    let mut skipped = 0;
    for (index, record) in reader.deserialize::<CsvRow>().enumerate() {
        if limit.is_some_and(|limit| index >= limit) {
            break;
        }
        match record {
            Ok(row) => rows.push(row),
            Err(e) => {
                warn!("Skipping CSV row {}: {e}", index + 1);
                skipped += 1;
            }
        }
        if (index + 1) % PROGRESS_EVERY == 0 {
            info!("Read {} rows...", index + 1);
        }
    }
    Ok((rows, skipped))
}

fn insert_batch(batch: &[ImportedRequest]) -> QueryBuilder<'_, Postgres> {
    let mut builder = QueryBuilder::new(
        "INSERT INTO service_requests \
         (created_at, raw_input, summary, request_type_id, department_id, status_id, \
          priority_id, address, latitude, longitude, is_emergency, is_valid, external_id, source) ",
    );
    builder.push_values(batch, |mut b, row| {
        let r = &row.request;
        b.push_bind(r.created_at)
            .push_bind(&r.raw_input)
            .push_bind(&r.summary)
            .push_bind(r.request_type_id)
            .push_bind(r.department_id)
            .push_bind(r.status_id)
            .push_bind(r.priority_id)
            .push_bind(&r.address)
            .push_bind(r.latitude)
            .push_bind(r.longitude)
            .push_bind(r.is_emergency)
            .push_bind(r.is_valid)
            .push_bind(&row.external_id)
            .push_bind(&row.source);
    });
    builder
}

fn seed_names(kind: LookupKind, names: &[String]) -> QueryBuilder<'_, Postgres> {
    let mut builder = QueryBuilder::new(format!("INSERT INTO {} (name) ", kind.table()));
    builder.push_values(names, |mut b, name| {
        b.push_bind(name);
    });
    builder.push(" ON CONFLICT (name) DO NOTHING");
    builder
}

fn link_types_to_departments(pairs: &[(Uuid, Uuid)]) -> QueryBuilder<'_, Postgres> {
    let mut builder = QueryBuilder::new(
        "INSERT INTO request_type_department_mapping (request_type_id, department_id) ",
    );
    builder.push_values(pairs, |mut b, (request_type_id, department_id)| {
        b.push_bind(request_type_id).push_bind(department_id);
    });
    builder.push(" ON CONFLICT DO NOTHING");
    builder
}

pub async fn run_import(pool: &PgPool, path: &Path, limit: Option<usize>) -> Result<ImportReport> {
    let (rows, rows_skipped) = read_rows(path, limit)?;

    let store = PgStore::new(pool.clone());
    let mut lookups = LookupCache::load(&store)
        .await
        .context("Failed to load reference tables")?;

    let missing = missing_lookups(&rows, &lookups);
    let seeded_lookups = missing.len();
    if !missing.is_empty() {
        let mut tx = pool.begin().await?;
        for (kind, names) in missing.by_kind() {
            if names.is_empty() {
                continue;
            }
            seed_names(kind, names).build().execute(&mut *tx).await?;
            info!("Seeded {} {}", names.len(), kind.table());
        }
        tx.commit().await?;
        lookups = LookupCache::load(&store).await?;
    }

    let new_status = lookups
        .statuses
        .find_by_name("New")
        .map(|s| s.id)
        .ok_or_else(|| anyhow!("Status 'New' is not seeded; run migrations first"))?;

    let now = Utc::now();
    let requests: Vec<ImportedRequest> = rows
        .iter()
        .map(|row| transform_row(row, &lookups, new_status, now))
        .collect();
    info!("Transformed {} service requests", requests.len());

    let pairs: Vec<(Uuid, Uuid)> = requests
        .iter()
        .filter_map(|r| Some((r.request.request_type_id?, r.request.department_id?)))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let total_batches = requests.len().div_ceil(BATCH_SIZE);
    let mut tx = pool.begin().await?;
    for chunk in pairs.chunks(BATCH_SIZE) {
        link_types_to_departments(chunk).build().execute(&mut *tx).await?;
    }
    for (n, batch) in requests.chunks(BATCH_SIZE).enumerate() {
        insert_batch(batch)
            .build()
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to insert batch {}/{total_batches}", n + 1))?;
        info!("Inserted batch {}/{total_batches} ({} rows)", n + 1, batch.len());
    }
    tx.commit().await?;

    Ok(ImportReport {
        rows_read: rows.len() + rows_skipped,
        rows_skipped,
        seeded_lookups,
        inserted: requests.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{epoch, Seed};
    use std::io::Write;

    const HEADER: &str = "case_enquiry_id,open_dt,sla_target_dt,closed_dt,case_status,case_title,subject,reason,type,location,latitude,longitude,source";

    fn write_csv(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{HEADER}").unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        file
    }

    #[test]
    fn test_read_rows_with_extra_columns() {
        let file = write_csv(&[
            "1,2024-01-05 08:30:00,2024-01-08 08:30:00,,Closed,Pothole Repair,Public Works Department,Street,Pothole,1 Main St,42.35,-71.06,Constituent Call",
            "2,2024-01-06,,,Open,Graffiti,Property Management,Graffiti,Graffiti Removal,\"2 Elm St, Boston\",,,Citizens Connect App",
        ]);
        let (rows, skipped) = read_rows(file.path(), None).unwrap();
        assert_eq!(skipped, 0);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].request_type, "Pothole");
        assert_eq!(rows[1].location, "2 Elm St, Boston");
        assert_eq!(rows[1].latitude, "");
    }

    #[test]
    fn test_limit_stops_early() {
        let line =
            "1,2024-01-05,,,Closed,Pothole,Public Works Department,Street,Pothole,1 Main St,,,App";
        let file = write_csv(&[line, line, line]);
        let (rows, _) = read_rows(file.path(), Some(2)).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_missing_file_errors() {
        assert!(read_rows(Path::new("/nonexistent/311.csv"), None).is_err());
    }

    #[test]
    fn test_batch_insert_sql() {
        let seed = Seed::new();
        let cache = seed.cache();
        let row = CsvRow {
            case_title: "Pothole".into(),
            ..Default::default()
        };
        let batch = vec![
            transform_row(&row, &cache, seed.new.id, epoch()),
            transform_row(&row, &cache, seed.new.id, epoch()),
        ];
        let builder = insert_batch(&batch);
        let sql = builder.sql();
        assert!(sql.starts_with("INSERT INTO service_requests"));
        assert!(sql.contains("external_id, source"));
        assert!(sql.contains("$28"));
        assert!(!sql.contains("$29"));
    }

    #[test]
    fn test_seed_sql_ignores_existing_names() {
        let names = vec!["Street Lights".to_string(), "Parks".to_string()];
        let builder = seed_names(LookupKind::Department, &names);
        let sql = builder.sql();
        assert!(sql.starts_with("INSERT INTO departments (name) VALUES"));
        assert!(sql.ends_with("ON CONFLICT (name) DO NOTHING"));

        let statuses = vec!["Open".to_string()];
        let builder = seed_names(LookupKind::Status, &statuses);
        assert!(builder.sql().starts_with("INSERT INTO statuses (name) VALUES"));
    }
}
