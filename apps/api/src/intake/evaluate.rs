//! `api evaluate <csv>`: runs labelled reports through intake and reports how
//! often the stored request agrees with the labels.

use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::errors::AppError;
use crate::intake::model::IntakeModel;
use crate::intake::pipeline::{process_report, IntakeOutcome};
use crate::lookup::LookupCache;
use crate::requests::pipeline::RequestView;
use crate::store::RequestStore;

/// One labelled row: the report text plus the expected classification.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LabelledReport {
    pub raw_input: String,
    pub request_type: String,
    pub department: String,
    pub priority: String,
    pub is_valid: String,
}

#[derive(Debug, Default, Serialize, PartialEq)]
pub struct EvaluationReport {
    pub total: usize,
    /// Reports that were persisted and compared against their labels.
    pub submitted: usize,
    /// Redirected, failed extraction or rejected.
    pub not_submitted: usize,
    pub request_type_match: usize,
    pub department_match: usize,
    pub priority_match: usize,
    pub is_valid_match: usize,
}

impl EvaluationReport {
    /// `count` as a percentage of submitted reports, rounded to two places.
    pub fn pct(&self, count: usize) -> f64 {
        if self.submitted == 0 {
            return 0.0;
        }
        (count as f64 / self.submitted as f64 * 10_000.0).round() / 100.0
    }
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total reports:  {}", self.total)?;
        writeln!(f, "Submitted:      {}", self.submitted)?;
        writeln!(f, "Not submitted:  {}", self.not_submitted)?;
        for (label, count) in [
            ("Request type", self.request_type_match),
            ("Department", self.department_match),
            ("Priority", self.priority_match),
            ("Is valid", self.is_valid_match),
        ] {
            writeln!(
                f,
                "  {label:<13} {count}/{} ({:.2}%)",
                self.submitted,
                self.pct(count)
            )?;
        }
        Ok(())
    }
}

/// Reads labelled rows, skipping rows with no report text.
pub fn read_labelled(path: &Path) -> Result<Vec<LabelledReport>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open CSV file {}", path.display()))?;
    let mut rows = Vec::new();
    for (index, record) in reader.deserialize::<LabelledReport>().enumerate() {
        let row = record.with_context(|| format!("Malformed row {}", index + 1))?;
        if row.raw_input.trim().is_empty() {
            warn!("Row {} has no raw_input, skipping", index + 1);
            continue;
        }
        rows.push(row);
    }
    Ok(rows)
}

fn same(actual: &str, expected: &str) -> bool {
    actual.trim().eq_ignore_ascii_case(expected.trim())
}

pub async fn evaluate(
    model: &dyn IntakeModel,
    store: &dyn RequestStore,
    lookups: &LookupCache,
    rows: &[LabelledReport],
) -> Result<EvaluationReport, AppError> {
    let mut report = EvaluationReport::default();
    for (index, row) in rows.iter().enumerate() {
        report.total += 1;
        let request_id = match process_report(model, store, lookups, &row.raw_input).await {
            Ok(IntakeOutcome::Submitted { request_id, .. }) => request_id,
            Ok(_) => {
                report.not_submitted += 1;
                continue;
            }
            Err(e) => {
                warn!("Report {} failed: {e}", index + 1);
                report.not_submitted += 1;
                continue;
            }
        };

        let record = store
            .get_request(request_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Service request {request_id} not found")))?;
        let view = RequestView::resolve(&record, lookups);
        report.submitted += 1;
        report.request_type_match += usize::from(same(&view.request_type, &row.request_type));
        report.department_match += usize::from(same(&view.department, &row.department));
        report.priority_match += usize::from(same(&view.priority, &row.priority));
        report.is_valid_match += usize::from(record.is_valid == same(&row.is_valid, "true"));
        info!("Report {}: {} / {}", index + 1, view.request_type, view.department);
    }
    Ok(report)
}
