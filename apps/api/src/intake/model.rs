use async_trait::async_trait;

use crate::intake::extract::ExtractedRequest;
use crate::intake::prompts::{EXTRACT_SYSTEM, TRIAGE_SYSTEM};
use crate::intake::triage::PreClassification;
use crate::llm_client::{LlmClient, LlmError};

/// The model calls intake depends on. Carried in `AppState` as
/// `Arc<dyn IntakeModel>` so tests can substitute canned replies.
#[async_trait]
pub trait IntakeModel: Send + Sync {
    async fn pre_classify(&self, report: &str) -> Result<PreClassification, LlmError>;

    async fn extract(&self, report: &str) -> Result<ExtractedRequest, LlmError>;
}

#[async_trait]
impl IntakeModel for LlmClient {
    async fn pre_classify(&self, report: &str) -> Result<PreClassification, LlmError> {
        self.complete_json(TRIAGE_SYSTEM, report).await
    }

    async fn extract(&self, report: &str) -> Result<ExtractedRequest, LlmError> {
        self.complete_json(EXTRACT_SYSTEM, report).await
    }
}
