//! Row mapping for open-data 311 exports.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use crate::lookup::{LookupCache, LookupTable};
use crate::models::lookup::LookupKind;
use crate::models::request::NewServiceRequest;

const EMERGENCY_SLA_HOURS: i64 = 24;

/// One row of the export. Absent columns deserialize as empty strings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CsvRow {
    pub case_enquiry_id: String,
    pub open_dt: String,
    pub case_status: String,
    pub case_title: String,
    pub subject: String,
    #[serde(rename = "type")]
    pub request_type: String,
    pub location: String,
    pub latitude: String,
    pub longitude: String,
    pub sla_target_dt: String,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportedRequest {
    pub request: NewServiceRequest,
    pub external_id: Option<String>,
    pub source: Option<String>,
}

fn non_empty(s: &str) -> Option<&str> {
    let s = s.trim();
    (!s.is_empty()).then_some(s)
}

/// Parses `YYYY-MM-DD HH:MM:SS`, then `YYYY-MM-DD` at midnight, as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = non_empty(raw)?;
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc());
    }
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc()),
        Err(_) => {
            warn!("Could not parse timestamp '{raw}'");
            None
        }
    }
}

/// Both coordinates or neither.
fn parse_coordinates(row: &CsvRow) -> (Option<f64>, Option<f64>) {
    let (Some(lat), Some(lng)) = (non_empty(&row.latitude), non_empty(&row.longitude)) else {
        return (None, None);
    };
    match (lat.parse::<f64>(), lng.parse::<f64>()) {
        (Ok(lat), Ok(lng)) => (Some(lat), Some(lng)),
        _ => {
            warn!("Invalid lat/long for case {}", row.case_enquiry_id);
            (None, None)
        }
    }
}

fn department_name(subject: &str) -> String {
    subject.replace(" Department", "").trim().to_string()
}

/// The name a row contributes to `request_types` when seeding.
fn request_type_name(row: &CsvRow) -> Option<&str> {
    non_empty(&row.request_type).or_else(|| non_empty(&row.case_title))
}

/// Names referenced by the export that the reference tables lack.
#[derive(Debug, Default, PartialEq)]
pub struct MissingLookups {
    pub statuses: Vec<String>,
    pub departments: Vec<String>,
    pub request_types: Vec<String>,
}

impl MissingLookups {
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn len(&self) -> usize {
        self.statuses.len() + self.departments.len() + self.request_types.len()
    }

    pub fn by_kind(&self) -> [(LookupKind, &[String]); 3] {
        [
            (LookupKind::Status, self.statuses.as_slice()),
            (LookupKind::Department, self.departments.as_slice()),
            (LookupKind::RequestType, self.request_types.as_slice()),
        ]
    }
}

/// Names absent from `table`, deduplicated case-insensitively. The first spelling seen wins.
fn absent_names<'a>(names: impl Iterator<Item = &'a str>, table: &LookupTable) -> Vec<String> {
    let mut absent = BTreeMap::new();
    for name in names.filter_map(non_empty) {
        if table.find_by_name(name).is_none() {
            absent
                .entry(name.to_lowercase())
                .or_insert_with(|| name.to_string());
        }
    }
    absent.into_values().collect()
}

/// Collects the status, department and request type names the export uses
/// but the reference tables lack.
pub fn missing_lookups(rows: &[CsvRow], lookups: &LookupCache) -> MissingLookups {
    let statuses = rows.iter().map(|r| r.case_status.as_str());
    let departments: Vec<String> = rows.iter().map(|r| department_name(&r.subject)).collect();
    let request_types = rows.iter().filter_map(request_type_name);
    MissingLookups {
        statuses: absent_names(statuses, &lookups.statuses),
        departments: absent_names(departments.iter().map(String::as_str), &lookups.departments),
        request_types: absent_names(request_types, &lookups.request_types),
    }
}

/// Maps a CSV row onto a new request. `new_status` is used when the row's
/// status is not a known status name; `now` stands in for a missing open date.
pub fn transform_row(
    row: &CsvRow,
    lookups: &LookupCache,
    new_status: Uuid,
    now: DateTime<Utc>,
) -> ImportedRequest {
    let title = non_empty(&row.case_title).unwrap_or("Unknown");
    let location = non_empty(&row.location).unwrap_or("Unknown location");
    let summary = format!("{title} - {location}");

    let department_id = lookups
        .departments
        .find_by_name(&department_name(&row.subject))
        .map(|d| d.id);
    let request_type_id = lookups
        .request_types
        .find_by_name(&row.request_type)
        .or_else(|| lookups.request_types.find_by_name(&row.case_title))
        .map(|t| t.id);
    let status_id = match lookups.statuses.find_by_name(&row.case_status) {
        Some(status) => status.id,
        None => {
            warn!("Unknown status '{}', using New", row.case_status);
            new_status
        }
    };

    let opened = parse_timestamp(&row.open_dt);
    let is_emergency = match (opened, parse_timestamp(&row.sla_target_dt)) {
        (Some(open), Some(target)) => (target - open).num_seconds() < EMERGENCY_SLA_HOURS * 3600,
        _ => false,
    };
    let (latitude, longitude) = parse_coordinates(row);

    ImportedRequest {
        request: NewServiceRequest {
            created_at: Some(opened.unwrap_or(now)),
            raw_input: summary.clone(),
            summary,
            request_type_id,
            department_id,
            status_id,
            priority_id: None,
            address: non_empty(&row.location).map(str::to_string),
            latitude,
            longitude,
            is_emergency,
            is_valid: true,
        },
        external_id: non_empty(&row.case_enquiry_id).map(str::to_string),
        source: non_empty(&row.source).map(str::to_string),
    }
}
