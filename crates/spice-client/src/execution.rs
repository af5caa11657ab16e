use chrono::{DateTime, Utc};

/// One remote run of a query.
///
/// `started_at` is unknown when the execution is submitted, and filled in
/// once the service reports it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Execution {
    pub execution_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
}

impl Execution {
    pub fn new(execution_id: impl Into<String>) -> Self {
        Self {
            execution_id: execution_id.into(),
            started_at: None,
        }
    }

    pub fn with_started_at(mut self, started_at: DateTime<Utc>) -> Self {
        self.started_at = Some(started_at);
        self
    }
}

impl std::fmt::Display for Execution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.execution_id)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ExecutionState {
    #[serde(rename = "QUERY_STATE_PENDING")]
    Pending,
    #[serde(rename = "QUERY_STATE_EXECUTING")]
    Executing,
    #[serde(rename = "QUERY_STATE_COMPLETED")]
    Completed,
    #[serde(rename = "QUERY_STATE_COMPLETED_PARTIAL")]
    CompletedPartial,
    #[serde(rename = "QUERY_STATE_FAILED")]
    Failed,
    #[serde(rename = "QUERY_STATE_CANCELLED")]
    Cancelled,
    #[serde(rename = "QUERY_STATE_EXPIRED")]
    Expired,
    #[serde(other)]
    Unknown,
}

impl ExecutionState {
    /// Whether a finished execution in this state has no usable result.
    pub fn is_failure(&self) -> bool {
        !matches!(self, Self::Completed | Self::CompletedPartial)
    }
}

/// Status of an execution, as reported by the status and latest-result
/// endpoints.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize)]
pub struct ExecutionStatus {
    #[serde(default)]
    pub execution_id: Option<String>,
    #[serde(default)]
    pub is_execution_finished: bool,
    pub state: ExecutionState,
    #[serde(default)]
    pub execution_started_at: Option<DateTime<Utc>>,
}
