//! Status update flow for one request: validate locally, persist, reload.
//!
//! The history row is written by the storage layer as a side effect of the
//! status change. A failed submit keeps the typed note on the flow and in the
//! returned error.

use serde::{Deserialize, Deserializer, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::lookup::LookupCache;
use crate::requests::detail::{load_detail, RequestDetail};
use crate::store::RequestStore;

const DEFAULT_UPDATED_BY: &str = "staff";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StatusUpdateForm {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub status_id: Option<Uuid>,
    #[serde(default)]
    pub note: String,
    pub updated_by: Option<String>,
}

/// An unselected status arrives as `""` from form clients.
fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<Uuid>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)?.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => Uuid::parse_str(raw).map(Some).map_err(serde::de::Error::custom),
    }
}

/// A form that passed local validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidStatusUpdate {
    pub status_id: Uuid,
    pub note: String,
    pub updated_by: String,
}

impl StatusUpdateForm {
    /// Rejects an empty status or a blank note, and a status the lookup cache does not know.
    pub fn validate(&self, lookups: &LookupCache) -> Result<ValidStatusUpdate, AppError> {
        let status_id = self
            .status_id
            .ok_or_else(|| AppError::Validation("A status must be selected".to_string()))?;
        let note = self.note.trim();
        if note.is_empty() {
            return Err(AppError::Validation("A note is required".to_string()));
        }
        if !lookups.statuses.contains(status_id) {
            return Err(AppError::Validation(format!("Unknown status {status_id}")));
        }
        let updated_by = self
            .updated_by
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_UPDATED_BY);
        Ok(ValidStatusUpdate {
            status_id,
            note: note.to_string(),
            updated_by: updated_by.to_string(),
        })
    }
}

/// Detail-view state for one request's status change.
#[derive(Debug, Clone)]
pub struct StatusUpdateFlow {
    pub request_id: Uuid,
    pub form: StatusUpdateForm,
    pub error: Option<String>,
    pub detail: Option<RequestDetail>,
}

impl StatusUpdateFlow {
    pub fn new(request_id: Uuid, form: StatusUpdateForm) -> Self {
        Self {
            request_id,
            form,
            error: None,
            detail: None,
        }
    }

    /// Validation failures return before any store call. Storage failures
    /// leave `form.note` untouched and wrap the cause with the draft note.
    pub async fn submit(
        &mut self,
        store: &dyn RequestStore,
        lookups: &LookupCache,
    ) -> Result<&RequestDetail, AppError> {
        let update = match self.form.validate(lookups) {
            Ok(update) => update,
            Err(e) => {
                self.error = Some(e.to_string());
                return Err(e);
            }
        };

        let persisted = store
            .update_status(self.request_id, update.status_id, &update.note, &update.updated_by)
            .await;
        if let Err(e) = persisted {
            warn!("Status update for {} failed: {e}", self.request_id);
            self.error = Some(e.to_string());
            return Err(AppError::StatusUpdateFailed {
                source: Box::new(e),
                draft_note: self.form.note.clone(),
            });
        }
        info!(
            "Request {} status set to {} by {}",
            self.request_id, update.status_id, update.updated_by
        );

        let detail = load_detail(store, lookups, self.request_id).await?;
        self.error = None;
        self.form = StatusUpdateForm::default();
        Ok(self.detail.insert(detail))
    }
}
