// Intake: LLM triage of a citizen report, structured extraction, and
// persistence of actionable reports.

pub mod batch;
pub mod evaluate;
pub mod extract;
pub mod handlers;
pub mod model;
pub mod pipeline;
pub mod prompts;
pub mod triage;
