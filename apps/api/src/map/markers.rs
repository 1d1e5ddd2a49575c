use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::lookup::{LookupCache, UNKNOWN};
use crate::models::request::ServiceRequestRow;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MarkerPopup {
    pub request_type: String,
    pub summary: String,
    pub department: String,
    pub status: String,
    pub recency: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Marker {
    pub id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    pub is_emergency: bool,
    pub popup: MarkerPopup,
}

/// Human-readable age of a request relative to `now`.
pub fn recency_label(created_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(created_at) = created_at else {
        return UNKNOWN.to_string();
    };
    let age = now.signed_duration_since(created_at);
    let minutes = age.num_minutes();
    if minutes < 1 {
        return "just now".to_string();
    }
    let (value, unit) = if minutes < 60 {
        (minutes, "minute")
    } else if age.num_hours() < 24 {
        (age.num_hours(), "hour")
    } else {
        (age.num_days(), "day")
    };
    let plural = if value == 1 { "" } else { "s" };
    format!("{value} {unit}{plural} ago")
}

/// One marker per record with coordinates; unlocated records are skipped.
pub fn build_markers(
    records: &[ServiceRequestRow],
    lookups: &LookupCache,
    now: DateTime<Utc>,
) -> Vec<Marker> {
    records
        .iter()
        .filter_map(|r| {
            let (latitude, longitude) = r.coordinates()?;
            Some(Marker {
                id: r.id,
                latitude,
                longitude,
                is_emergency: r.is_emergency,
                popup: MarkerPopup {
                    request_type: lookups
                        .request_types
                        .resolve(r.request_type_id)
                        .name()
                        .to_string(),
                    summary: r.summary.clone(),
                    department: lookups.departments.resolve(r.department_id).name().to_string(),
                    status: lookups.statuses.resolve(Some(r.status_id)).name().to_string(),
                    recency: recency_label(r.created_at, now),
                },
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{epoch, Seed};
    use chrono::Duration;

    #[test]
    fn test_recency_labels() {
        let now = epoch();
        assert_eq!(recency_label(Some(now), now), "just now");
        assert_eq!(recency_label(Some(now - Duration::minutes(1)), now), "1 minute ago");
        assert_eq!(recency_label(Some(now - Duration::minutes(45)), now), "45 minutes ago");
        assert_eq!(recency_label(Some(now - Duration::hours(5)), now), "5 hours ago");
        assert_eq!(recency_label(Some(now - Duration::days(3)), now), "3 days ago");
        assert_eq!(recency_label(None, now), UNKNOWN);
    }

    #[test]
    fn test_unlocated_records_get_no_marker() {
        let seed = Seed::new();
        let mut unlocated = seed.request("no coords", &seed.pothole, 0);
        unlocated.latitude = None;
        unlocated.longitude = None;
        let records = vec![seed.request("located", &seed.graffiti, 90), unlocated];

        let markers = build_markers(&records, &seed.cache(), epoch());
        assert_eq!(markers.len(), 1);
        let popup = &markers[0].popup;
        assert_eq!(popup.request_type, "Graffiti Removal");
        assert_eq!(popup.summary, "located");
        assert_eq!(popup.department, "Public Works");
        assert_eq!(popup.status, "New");
        assert_eq!(popup.recency, "1 hour ago");
    }
}
