use std::collections::BTreeMap;

use serde::Serialize;

use crate::lookup::{LookupCache, LookupTable};
use crate::models::request::ServiceRequestRow;

/// Counts of in-scope requests grouped by each lookup's display name.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct DashboardSummary {
    pub total_requests: usize,
    pub emergencies: usize,
    pub located: usize,
    pub requests_by_department: BTreeMap<String, usize>,
    pub requests_by_type: BTreeMap<String, usize>,
    pub requests_by_status: BTreeMap<String, usize>,
    pub requests_by_priority: BTreeMap<String, usize>,
}

fn bump(counts: &mut BTreeMap<String, usize>, table: &LookupTable, id: Option<uuid::Uuid>) {
    *counts.entry(table.resolve(id).name().to_string()).or_default() += 1;
}

pub fn summarize(records: &[ServiceRequestRow], lookups: &LookupCache) -> DashboardSummary {
    let mut summary = DashboardSummary {
        total_requests: records.len(),
        ..Default::default()
    };
    for record in records {
        if record.is_emergency {
            summary.emergencies += 1;
        }
        if record.coordinates().is_some() {
            summary.located += 1;
        }
        bump(&mut summary.requests_by_department, &lookups.departments, record.department_id);
        bump(&mut summary.requests_by_type, &lookups.request_types, record.request_type_id);
        bump(&mut summary.requests_by_status, &lookups.statuses, Some(record.status_id));
        bump(&mut summary.requests_by_priority, &lookups.priorities, record.priority_id);
    }
    summary
}
