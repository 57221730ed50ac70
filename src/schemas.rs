// Shared wire types for the console contract. Everything here is a
// transient projection of upstream state, never a system of record.
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Per-folder listing entry served by the storage proxy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderStat {
    pub folder: String,
    pub unseen: i64,
    /// Opaque drive-file descriptors, passed through as received.
    #[serde(default)]
    pub items: Vec<Value>,
}

/// Knowledge document as listed by the documents proxy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: String,
    pub title: String,
    pub chunks: i64,
    #[serde(default)]
    pub created_at: Option<String>,
    pub visibility: String,
    pub deletable: bool,
    #[serde(default)]
    pub cluster: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Running,
    Success,
    Error,
}

impl ExecutionStatus {
    /// Maps the raw upstream status. Anything unrecognized (including an
    /// absent status) counts as still running.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|value| value.trim().to_ascii_lowercase()).as_deref() {
            Some("success") => Self::Success,
            Some("error") | Some("crashed") => Self::Error,
            _ => Self::Running,
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// One entry of an execution trace. Order in the trace array is step order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceStep {
    pub label: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub ts: Option<String>,
}

/// One run of an upstream workflow, as surfaced by the execution proxy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    pub id: String,
    #[serde(default)]
    pub workflow_name: String,
    pub status: ExecutionStatus,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub stopped_at: Option<String>,
    #[serde(default)]
    pub duration_ms: Option<i64>,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub trace: Vec<TraceStep>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditsSummary {
    pub credits_used: i64,
    pub plan_credits: i64,
    pub remaining: i64,
}

/// Assistant reply from the review-chat proxy. `suggested_text` is only
/// present in edit mode; feedback replies are conversational only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub assistant_message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_text: Option<String>,
}
