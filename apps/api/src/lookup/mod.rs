//! Lookup cache: reference tables fetched once at startup and shared read-only.
//!
//! Every id→name join in the service goes through `LookupTable::resolve`, which
//! yields a `LookupRef`. An unresolved reference renders as [`UNKNOWN`] instead
//! of a blank or a raw id.

pub mod handlers;

use std::collections::HashMap;

use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::lookup::{LookupKind, LookupRow};
use crate::store::RequestStore;

/// Placeholder shown for a foreign key that has no matching lookup row.
pub const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LookupRef<'a> {
    Resolved(&'a LookupRow),
    Unresolved,
}

impl<'a> LookupRef<'a> {
    pub fn name(&self) -> &'a str {
        match self {
            LookupRef::Resolved(row) => &row.name,
            LookupRef::Unresolved => UNKNOWN,
        }
    }
}

/// One reference table, ordered by name for use as a filter option list.
#[derive(Debug, Clone, Default)]
pub struct LookupTable {
    rows: Vec<LookupRow>,
    by_id: HashMap<Uuid, usize>,
}

impl LookupTable {
    pub fn new(mut rows: Vec<LookupRow>) -> Self {
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        let by_id = rows.iter().enumerate().map(|(i, r)| (r.id, i)).collect();
        Self { rows, by_id }
    }

    pub fn resolve(&self, id: Option<Uuid>) -> LookupRef<'_> {
        id.and_then(|id| self.by_id.get(&id))
            .map(|&i| LookupRef::Resolved(&self.rows[i]))
            .unwrap_or(LookupRef::Unresolved)
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.by_id.contains_key(&id)
    }

    /// Case-insensitive lookup by display name.
    pub fn find_by_name(&self, name: &str) -> Option<&LookupRow> {
        let name = name.trim();
        self.rows.iter().find(|r| r.name.eq_ignore_ascii_case(name))
    }

    pub fn options(&self) -> &[LookupRow] {
        &self.rows
    }
}

#[derive(Debug, Clone, Default)]
pub struct LookupCache {
    pub statuses: LookupTable,
    pub departments: LookupTable,
    pub request_types: LookupTable,
    pub priorities: LookupTable,
}

/// Filter option lists as returned to clients.
#[derive(Debug, Serialize)]
pub struct LookupOptions<'a> {
    pub statuses: &'a [LookupRow],
    pub departments: &'a [LookupRow],
    pub request_types: &'a [LookupRow],
    pub priorities: &'a [LookupRow],
}

impl LookupCache {
    /// Fetches all four reference tables. Called once at startup.
    pub async fn load(store: &dyn RequestStore) -> Result<Self, AppError> {
        let mut rows = Vec::new();
        for kind in LookupKind::ALL {
            let table = store.lookups(kind).await?;
            info!("Loaded {} rows from {}", table.len(), kind.table());
            rows.extend(table.into_iter().map(|row| (kind, row)));
        }
        Ok(Self::from_rows(rows))
    }

    pub fn from_rows(rows: impl IntoIterator<Item = (LookupKind, LookupRow)>) -> Self {
        let mut grouped: HashMap<LookupKind, Vec<LookupRow>> = HashMap::new();
        for (kind, row) in rows {
            grouped.entry(kind).or_default().push(row);
        }
        let mut cache = LookupCache::default();
        for (kind, rows) in grouped {
            *cache.table_mut(kind) = LookupTable::new(rows);
        }
        cache
    }

    fn table_mut(&mut self, kind: LookupKind) -> &mut LookupTable {
        match kind {
            LookupKind::Status => &mut self.statuses,
            LookupKind::Department => &mut self.departments,
            LookupKind::RequestType => &mut self.request_types,
            LookupKind::Priority => &mut self.priorities,
        }
    }

    pub fn options(&self) -> LookupOptions<'_> {
        LookupOptions {
            statuses: self.statuses.options(),
            departments: self.departments.options(),
            request_types: self.request_types.options(),
            priorities: self.priorities.options(),
        }
    }
}
