use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExtractedPriority {
    High,
    Medium,
    Low,
}

/// Structured fields pulled from a citizen's report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractedRequest {
    /// Department-level category.
    pub service_type: String,
    /// Specific request type.
    pub service_subtype: String,
    pub location_address: String,
    #[serde(default)]
    pub location_details: Option<String>,
    pub description: String,
    pub priority: ExtractedPriority,
    #[serde(default)]
    pub additional_notes: Option<String>,
}

impl ExtractedRequest {
    /// The address, unless the model could not find one.
    pub fn address(&self) -> Option<&str> {
        let address = self.location_address.trim();
        (!address.is_empty() && !address.eq_ignore_ascii_case("unknown")).then_some(address)
    }

    pub fn summary(&self) -> String {
        match self.address() {
            Some(address) => format!("{} - {}", self.service_subtype.trim(), address),
            None => self.service_subtype.trim().to_string(),
        }
    }
}
