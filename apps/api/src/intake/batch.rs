//! `api intake`: runs citizen reports through the intake pipeline from the
//! command line, one at a time or from a file with one report per line.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::intake::model::IntakeModel;
use crate::intake::pipeline::process_report;
use crate::lookup::LookupCache;
use crate::store::RequestStore;

/// Non-blank lines of `path`, trimmed.
pub fn read_reports(path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read reports from {}", path.display()))?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// `reports.txt` → `reports.json`
pub fn default_output_path(input: &Path) -> PathBuf {
    input.with_extension("json")
}

/// One JSON outcome per report. A report the pipeline rejects becomes an
/// `error` entry instead of aborting the batch.
pub async fn process_reports(
    model: &dyn IntakeModel,
    store: &dyn RequestStore,
    lookups: &LookupCache,
    reports: &[String],
) -> Result<Vec<Value>> {
    let mut results = Vec::with_capacity(reports.len());
    for (index, report) in reports.iter().enumerate() {
        let result = match process_report(model, store, lookups, report).await {
            Ok(outcome) => serde_json::to_value(&outcome)?,
            Err(e) => {
                warn!("Report {} failed: {e}", index + 1);
                json!({ "status": "error", "message": e.to_string() })
            }
        };
        results.push(result);
    }
    info!("Processed {} reports", results.len());
    Ok(results)
}

pub fn write_results(path: &Path, results: &[Value]) -> Result<()> {
    let body = serde_json::to_string_pretty(results)?;
    fs::write(path, body).with_context(|| format!("Failed to write {}", path.display()))
}
