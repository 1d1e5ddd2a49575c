use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One row of a reference table. All four lookup tables share this shape.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct LookupRow {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LookupKind {
    Status,
    Department,
    RequestType,
    Priority,
}

impl LookupKind {
    pub const ALL: [LookupKind; 4] = [
        LookupKind::Status,
        LookupKind::Department,
        LookupKind::RequestType,
        LookupKind::Priority,
    ];

    pub fn table(&self) -> &'static str {
        match self {
            LookupKind::Status => "statuses",
            LookupKind::Department => "departments",
            LookupKind::RequestType => "request_types",
            LookupKind::Priority => "priorities",
        }
    }
}
