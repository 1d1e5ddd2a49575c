//! Intake pipeline: triage → (redirect | extract → persist).

use anyhow::anyhow;
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::intake::extract::ExtractedRequest;
use crate::intake::model::IntakeModel;
use crate::intake::triage::{triage, PreClassification, Recommendation, TriageResult};
use crate::lookup::LookupCache;
use crate::models::request::{NewAnalysis, NewServiceRequest};
use crate::store::RequestStore;

const CALL_911: &str = "Please call 911 immediately. This requires emergency services.";
const OTHER_SERVICE: &str = "This issue should be directed to another service provider.";
const NEW_STATUS: &str = "New";

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IntakeOutcome {
    Emergency {
        action: String,
        reason: String,
        triage: TriageResult,
    },
    NonService {
        action: String,
        reason: String,
        triage: TriageResult,
    },
    Submitted {
        request_id: Uuid,
        expedited: bool,
        triage: TriageResult,
        extracted: ExtractedRequest,
    },
    Error {
        message: String,
        triage: TriageResult,
    },
}

pub async fn process_report(
    model: &dyn IntakeModel,
    store: &dyn RequestStore,
    lookups: &LookupCache,
    report: &str,
) -> Result<IntakeOutcome, AppError> {
    let report = report.trim();
    if report.is_empty() {
        return Err(AppError::Validation("Report text is required".to_string()));
    }

    let classification = match model.pre_classify(report).await {
        Ok(c) => c,
        Err(e) => {
            warn!("Pre-classification failed, processing normally: {e}");
            PreClassification::fallback()
        }
    };
    let triage = triage(&classification);

    let expedited = match triage.recommendation {
        Recommendation::RedirectTo911 => {
            return Ok(IntakeOutcome::Emergency {
                action: CALL_911.to_string(),
                reason: classification.reason,
                triage,
            })
        }
        Recommendation::RedirectToOtherService => {
            return Ok(IntakeOutcome::NonService {
                action: OTHER_SERVICE.to_string(),
                reason: classification.reason,
                triage,
            })
        }
        Recommendation::Expedite => true,
        Recommendation::ProcessNormally => false,
    };

    let extracted = match model.extract(report).await {
        Ok(extracted) => extracted,
        Err(e) => {
            warn!("Extraction failed: {e}");
            let message = if expedited {
                "Failed to extract request details, but this appears to be an urgent 311 matter."
            } else {
                "Failed to extract request details."
            };
            return Ok(IntakeOutcome::Error {
                message: message.to_string(),
                triage,
            });
        }
    };

    let request = build_request(report, &extracted, &triage, lookups)?;
    let analysis = NewAnalysis {
        triage_results: serde_json::to_value(&triage).ok(),
        validation_results: Some(json!({
            "is_valid": true,
            "confidence": triage.confidence,
            "reasoning": classification.reason,
        })),
        classification_results: Some(json!({
            "pre_classification": classification,
            "extracted": extracted,
        })),
        geocoding_results: None,
        confidence_scores: Some(json!({ "triage": triage.confidence })),
    };

    let request_id = store.create_request(&request, &analysis).await?;
    info!("Intake created request {request_id} (expedited: {expedited})");

    Ok(IntakeOutcome::Submitted {
        request_id,
        expedited,
        triage,
        extracted,
    })
}

/// Maps extracted names onto lookup ids. Names the cache does not know stay null.
fn build_request(
    report: &str,
    extracted: &ExtractedRequest,
    triage: &TriageResult,
    lookups: &LookupCache,
) -> Result<NewServiceRequest, AppError> {
    let status = lookups
        .statuses
        .find_by_name(NEW_STATUS)
        .ok_or_else(|| AppError::Internal(anyhow!("Status '{NEW_STATUS}' is not seeded")))?;
    let request_type = lookups
        .request_types
        .find_by_name(&extracted.service_subtype)
        .or_else(|| lookups.request_types.find_by_name(&extracted.service_type));
    let department = lookups.departments.find_by_name(&extracted.service_type);
    let priority = lookups.priorities.find_by_name(triage.priority.display_name());

    Ok(NewServiceRequest {
        created_at: None,
        raw_input: report.to_string(),
        summary: extracted.summary(),
        request_type_id: request_type.map(|r| r.id),
        department_id: department.map(|r| r.id),
        status_id: status.id,
        priority_id: priority.map(|r| r.id),
        address: extracted.address().map(str::to_string),
        latitude: None,
        longitude: None,
        is_emergency: triage.is_emergency,
        is_valid: true,
    })
}
