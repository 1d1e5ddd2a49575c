//! List pipeline: search → stable sort → fixed-size pagination.
//!
//! Every stage is a pure function over borrowed records. The caller owns the
//! `ListViewState` and passes it in by reference.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::lookup::LookupCache;
use crate::models::request::ServiceRequestRow;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    CreatedAt,
    RequestType,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

/// Serializable table state: search text, sort and the 1-based page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListViewState {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub sort: SortField,
    #[serde(default)]
    pub direction: SortDirection,
    #[serde(default = "first_page")]
    pub page: usize,
}

fn first_page() -> usize {
    1
}

impl Default for ListViewState {
    fn default() -> Self {
        Self {
            query: String::new(),
            sort: SortField::default(),
            direction: SortDirection::default(),
            page: first_page(),
        }
    }
}

/// A record with its lookup references resolved for display.
#[derive(Debug, Clone, Serialize)]
pub struct RequestView {
    #[serde(flatten)]
    pub record: ServiceRequestRow,
    pub request_type: String,
    pub department: String,
    pub status: String,
    pub priority: String,
}

impl RequestView {
    pub fn resolve(record: &ServiceRequestRow, lookups: &LookupCache) -> Self {
        Self {
            request_type: lookups.request_types.resolve(record.request_type_id).name().to_string(),
            department: lookups.departments.resolve(record.department_id).name().to_string(),
            status: lookups.statuses.resolve(Some(record.status_id)).name().to_string(),
            priority: lookups.priorities.resolve(record.priority_id).name().to_string(),
            record: record.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Matching records across all pages.
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
}

/// Case-insensitive substring match on summary, type name, department name and address.
pub fn matches_search(record: &ServiceRequestRow, lookups: &LookupCache, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    let contains = |haystack: &str| haystack.to_lowercase().contains(needle);
    contains(&record.summary)
        || contains(lookups.request_types.resolve(record.request_type_id).name())
        || contains(lookups.departments.resolve(record.department_id).name())
        || record.address.as_deref().is_some_and(contains)
}

pub fn search<'a>(
    records: &'a [ServiceRequestRow],
    lookups: &LookupCache,
    query: &str,
) -> Vec<&'a ServiceRequestRow> {
    let needle = query.trim().to_lowercase();
    records
        .iter()
        .filter(|r| matches_search(r, lookups, &needle))
        .collect()
}

/// Missing timestamps order after every present one.
fn compare_created_at(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Stable sort: records with equal keys keep their incoming relative order
/// in both directions.
pub fn sort_records(
    records: &mut [&ServiceRequestRow],
    lookups: &LookupCache,
    field: SortField,
    direction: SortDirection,
) {
    let ascending = |a: &ServiceRequestRow, b: &ServiceRequestRow| match field {
        SortField::CreatedAt => compare_created_at(a.created_at, b.created_at),
        SortField::RequestType => lookups
            .request_types
            .resolve(a.request_type_id)
            .name()
            .cmp(lookups.request_types.resolve(b.request_type_id).name()),
    };
    match direction {
        SortDirection::Asc => records.sort_by(|a, b| ascending(*a, *b)),
        SortDirection::Desc => records.sort_by(|a, b| ascending(*a, *b).reverse()),
    }
}

/// Slices out one 1-based page. Page 0 is read as page 1; a page past the end is empty.
pub fn paginate<T: Clone>(items: &[T], page: usize, page_size: usize) -> Page<T> {
    let page_size = page_size.max(1);
    let page = page.max(1);
    let total = items.len();
    let start = (page - 1).saturating_mul(page_size);
    let page_items = if start >= total {
        Vec::new()
    } else {
        items[start..(start + page_size).min(total)].to_vec()
    };
    Page {
        items: page_items,
        total,
        page,
        page_size,
        total_pages: total.div_ceil(page_size),
    }
}

/// Runs the whole pipeline for one view state.
pub fn run(
    records: &[ServiceRequestRow],
    lookups: &LookupCache,
    view: &ListViewState,
    page_size: usize,
) -> Page<RequestView> {
    let mut matched = search(records, lookups, &view.query);
    sort_records(&mut matched, lookups, view.sort, view.direction);
    let page = paginate(&matched, view.page, page_size);
    Page {
        items: page
            .items
            .into_iter()
            .map(|r| RequestView::resolve(r, lookups))
            .collect(),
        total: page.total,
        page: page.page,
        page_size: page.page_size,
        total_pages: page.total_pages,
    }
}
