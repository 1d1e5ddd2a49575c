use serde::{Deserialize, Serialize};

/// Triage confidence recorded for every model-derived classification.
pub const TRIAGE_CONFIDENCE: f64 = 0.85;

pub const FALLBACK_REASON: &str = "Error processing request, defaulting to normal handling";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    #[serde(rename = "REDIRECT_TO_911")]
    RedirectTo911,
    Expedite,
    RedirectToOtherService,
    ProcessNormally,
}

/// What the model is asked for. The recommendation is derived from these
/// flags, never taken from the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PreClassification {
    pub is_emergency: bool,
    pub belongs_in_311: bool,
    pub reason: String,
}

impl PreClassification {
    /// Used when the model call fails: treat as an ordinary 311 request.
    pub fn fallback() -> Self {
        Self {
            is_emergency: false,
            belongs_in_311: true,
            reason: FALLBACK_REASON.to_string(),
        }
    }

    pub fn recommendation(&self) -> Recommendation {
        match (self.is_emergency, self.belongs_in_311) {
            (true, false) => Recommendation::RedirectTo911,
            (true, true) => Recommendation::Expedite,
            (false, false) => Recommendation::RedirectToOtherService,
            (false, true) => Recommendation::ProcessNormally,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PriorityLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl PriorityLevel {
    /// Name of the matching row in the `priorities` table.
    pub fn display_name(&self) -> &'static str {
        match self {
            PriorityLevel::Low => "Low",
            PriorityLevel::Medium => "Medium",
            PriorityLevel::High => "High",
            PriorityLevel::Critical => "Critical",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TriageResult {
    pub is_emergency: bool,
    pub confidence: f64,
    pub reasoning: String,
    pub priority: PriorityLevel,
    pub recommendation: Recommendation,
}

pub fn triage(classification: &PreClassification) -> TriageResult {
    let recommendation = classification.recommendation();
    let priority = match recommendation {
        Recommendation::Expedite | Recommendation::RedirectTo911 => PriorityLevel::Critical,
        Recommendation::ProcessNormally => PriorityLevel::Medium,
        Recommendation::RedirectToOtherService => PriorityLevel::Low,
    };
    TriageResult {
        is_emergency: classification.is_emergency,
        confidence: TRIAGE_CONFIDENCE,
        reasoning: classification.reason.clone(),
        priority,
        recommendation,
    }
}
