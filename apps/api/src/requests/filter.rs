#![allow(dead_code)]

//! Filter state for the request list and map.
//!
//! An empty selection set, or an absent date range, places no restriction on
//! that dimension. `FilterState` hands back a normalized `RequestFilter` after
//! every change so callers never see a reversed date range.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::lookup::LookupKind;
use crate::models::request::ServiceRequestRow;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl DateRange {
    /// Drops an open-on-both-ends range and swaps reversed bounds.
    pub fn normalized(self) -> Option<DateRange> {
        match (self.start, self.end) {
            (None, None) => None,
            (Some(start), Some(end)) if start > end => Some(DateRange {
                start: Some(end),
                end: Some(start),
            }),
            _ => Some(self),
        }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start.map_or(true, |s| at >= s) && self.end.map_or(true, |e| at <= e)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RequestFilter {
    pub statuses: BTreeSet<Uuid>,
    pub departments: BTreeSet<Uuid>,
    pub request_types: BTreeSet<Uuid>,
    pub priorities: BTreeSet<Uuid>,
    pub date_range: Option<DateRange>,
}

impl RequestFilter {
    pub fn is_unrestricted(&self) -> bool {
        LookupKind::ALL.iter().all(|k| self.selection(*k).is_empty()) && self.date_range.is_none()
    }

    pub fn selection(&self, kind: LookupKind) -> &BTreeSet<Uuid> {
        match kind {
            LookupKind::Status => &self.statuses,
            LookupKind::Department => &self.departments,
            LookupKind::RequestType => &self.request_types,
            LookupKind::Priority => &self.priorities,
        }
    }

    fn selection_mut(&mut self, kind: LookupKind) -> &mut BTreeSet<Uuid> {
        match kind {
            LookupKind::Status => &mut self.statuses,
            LookupKind::Department => &mut self.departments,
            LookupKind::RequestType => &mut self.request_types,
            LookupKind::Priority => &mut self.priorities,
        }
    }

    /// Client-side evaluation, equivalent to the SQL the Postgres store builds.
    pub fn matches(&self, record: &ServiceRequestRow) -> bool {
        let in_range = match self.date_range {
            None => true,
            Some(range) => record.created_at.is_some_and(|at| range.contains(at)),
        };
        in_range
            && allows(&self.statuses, Some(record.status_id))
            && allows(&self.departments, record.department_id)
            && allows(&self.request_types, record.request_type_id)
            && allows(&self.priorities, record.priority_id)
    }
}

fn allows(selection: &BTreeSet<Uuid>, id: Option<Uuid>) -> bool {
    selection.is_empty() || id.is_some_and(|id| selection.contains(&id))
}

/// Mutable filter selection owned by a view. Every mutation returns the
/// normalized filter that should drive the next fetch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterState {
    current: RequestFilter,
}

impl FilterState {
    pub fn current(&self) -> &RequestFilter {
        &self.current
    }

    pub fn toggle(&mut self, kind: LookupKind, id: Uuid) -> RequestFilter {
        let selection = self.current.selection_mut(kind);
        if !selection.remove(&id) {
            selection.insert(id);
        }
        self.emit()
    }

    pub fn select(
        &mut self,
        kind: LookupKind,
        ids: impl IntoIterator<Item = Uuid>,
    ) -> RequestFilter {
        *self.current.selection_mut(kind) = ids.into_iter().collect();
        self.emit()
    }

    pub fn set_date_range(
        &mut self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> RequestFilter {
        self.current.date_range = Some(DateRange { start, end });
        self.emit()
    }

    pub fn clear(&mut self) -> RequestFilter {
        self.current = RequestFilter::default();
        self.emit()
    }

    fn emit(&mut self) -> RequestFilter {
        self.current.date_range = self.current.date_range.and_then(DateRange::normalized);
        self.current.clone()
    }
}

/// Filter query parameters: comma-separated ids per lookup, and
/// `start`/`end` as RFC 3339 timestamps or `YYYY-MM-DD` dates.
#[derive(Debug, Default, Deserialize)]
pub struct FilterParams {
    pub status: Option<String>,
    pub department: Option<String>,
    pub request_type: Option<String>,
    pub priority: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
}

impl FilterParams {
    pub fn to_filter(&self) -> Result<RequestFilter, AppError> {
        let mut state = FilterState::default();
        state.select(LookupKind::Status, parse_ids(self.status.as_deref(), "status")?);
        state.select(
            LookupKind::Department,
            parse_ids(self.department.as_deref(), "department")?,
        );
        state.select(
            LookupKind::RequestType,
            parse_ids(self.request_type.as_deref(), "request_type")?,
        );
        state.select(LookupKind::Priority, parse_ids(self.priority.as_deref(), "priority")?);
        let start = parse_bound(self.start.as_deref(), "start")?;
        let end = parse_bound(self.end.as_deref(), "end")?;
        // Order the raw bounds before a bare date is widened to a whole day.
        let (start, end) = match (start, end) {
            (Some(s), Some(e)) if s.earliest() > e.latest() => (Some(e), Some(s)),
            bounds => bounds,
        };
        Ok(state.set_date_range(start.map(|b| b.earliest()), end.map(|b| b.latest())))
    }
}

/// A `start`/`end` parameter: an exact instant, or a bare date covering the whole day.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Bound {
    At(DateTime<Utc>),
    Day(NaiveDate),
}

impl Bound {
    fn earliest(self) -> DateTime<Utc> {
        match self {
            Bound::At(at) => at,
            Bound::Day(day) => Utc.from_utc_datetime(&day.and_time(NaiveTime::MIN)),
        }
    }

    fn latest(self) -> DateTime<Utc> {
        match self {
            Bound::At(at) => at,
            Bound::Day(day) => {
                Bound::Day(day).earliest() + Duration::days(1) - Duration::milliseconds(1)
            }
        }
    }
}

fn parse_ids(raw: Option<&str>, field: &str) -> Result<BTreeSet<Uuid>, AppError> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            Uuid::parse_str(s)
                .map_err(|_| AppError::Validation(format!("'{s}' is not a valid {field} id")))
        })
        .collect()
}

fn parse_bound(raw: Option<&str>, field: &str) -> Result<Option<Bound>, AppError> {
    let raw = match raw.map(str::trim) {
        None | Some("") => return Ok(None),
        Some(raw) => raw,
    };
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(Bound::At(at.with_timezone(&Utc))));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|day| Some(Bound::Day(day)))
        .map_err(|_| AppError::Validation(format!("'{raw}' is not a valid {field} date")))
}
