use serde_derive::Serialize;

/// Job name constants, shared between the claim table and `next_stage`
/// chaining so the scheduler can address workers by name.
pub const SYNTHESIZER_JOB: &str = "larch";
pub const GRAPH_BUILD_JOB: &str = "cedar";

/// Entity counters reported by a finished job.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct DataProcessed {
    pub added: u64,
    pub updated: u64,
    pub deleted: u64,
}

/// Result contract every background job returns to its scheduler.
/// A precondition miss (no dataset, artifact already built) is a successful
/// skip, not an error.
#[derive(Debug, Clone, Serialize)]
pub struct JobResult {
    pub success: bool,
    pub elapsed_ms: u64,
    pub message: String,
    pub data_processed: DataProcessed,
    /// Name of the job the scheduler should trigger next, if any.
    pub next_stage: Option<String>,
}

impl JobResult {
    pub fn skipped(message: impl Into<String>, elapsed_ms: u64) -> Self {
        Self {
            success: true,
            elapsed_ms,
            message: message.into(),
            data_processed: DataProcessed::default(),
            next_stage: None,
        }
    }

    pub fn completed(
        message: impl Into<String>,
        elapsed_ms: u64,
        data_processed: DataProcessed,
        next_stage: Option<&str>,
    ) -> Self {
        Self {
            success: true,
            elapsed_ms,
            message: message.into(),
            data_processed,
            next_stage: next_stage.map(String::from),
        }
    }
}
