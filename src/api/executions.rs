// Execution status route, polled by clients until a terminal state.
use crate::api::errors::{bad_request, map_upstream_error, require_session};
use crate::schemas::{Execution, ExecutionStatus, TraceStep};
use crate::state::AppState;
use crate::upstream::{value_to_i64, value_to_string};
use axum::extract::{Path, State};
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use axum_extra::extract::cookie::CookieJar;
use chrono::DateTime;
use serde_json::{json, Value};
use std::sync::Arc;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/api/executions/{id}", get(execution_status))
}

async fn execution_status(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Path(id): Path<String>,
) -> Result<Json<Value>, Response> {
    let token = require_session(&jar)?;
    let id = id.trim().to_string();
    if id.is_empty() {
        return Err(bad_request("execution id is required"));
    }

    let path = format!("executions/{id}");
    let payload = state
        .upstream
        .fetch_json(state.upstream.get_rest(&path, &token))
        .await
        .map_err(map_upstream_error)?;

    let execution = normalize_execution(&id, &payload);
    Ok(Json(json!({ "success": true, "execution": execution })))
}

/// Builds the console-facing execution record. Status is monotonic for a
/// given id in the happy path; polling only ever acts on the terminal
/// states, so unknown values are reported as still running.
pub fn normalize_execution(id: &str, payload: &Value) -> Execution {
    let status = ExecutionStatus::parse(
        payload
            .get("status")
            .and_then(Value::as_str),
    );
    let started_at = value_to_string(payload.get("startedAt").or_else(|| payload.get("started_at")));
    let stopped_at = value_to_string(payload.get("stoppedAt").or_else(|| payload.get("stopped_at")));
    Execution {
        id: value_to_string(payload.get("id")).unwrap_or_else(|| id.to_string()),
        workflow_name: value_to_string(
            payload
                .get("workflowName")
                .or_else(|| payload.get("workflow_name")),
        )
        .unwrap_or_default(),
        status,
        duration_ms: duration_between(started_at.as_deref(), stopped_at.as_deref())
            .or_else(|| value_to_i64(payload.get("duration_ms"))),
        started_at,
        stopped_at,
        mode: value_to_string(payload.get("mode")),
        trace: normalize_trace(payload.get("trace")),
    }
}

fn normalize_trace(value: Option<&Value>) -> Vec<TraceStep> {
    let Some(entries) = value.and_then(Value::as_array) else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| {
            let label = value_to_string(entry.get("label"))?;
            Some(TraceStep {
                label,
                summary: value_to_string(entry.get("summary")).unwrap_or_default(),
                ts: value_to_string(entry.get("ts")),
            })
        })
        .collect()
}

fn duration_between(started_at: Option<&str>, stopped_at: Option<&str>) -> Option<i64> {
    let started = DateTime::parse_from_rfc3339(started_at?).ok()?;
    let stopped = DateTime::parse_from_rfc3339(stopped_at?).ok()?;
    let millis = (stopped - started).num_milliseconds();
    if millis < 0 {
        None
    } else {
        Some(millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_a_running_execution() {
        let payload = json!({
            "id": "ex42",
            "workflowName": "generate-article",
            "status": "running",
            "startedAt": "2026-08-01T12:00:00Z",
            "mode": "webhook",
            "trace": [
                { "label": "fetch sources", "summary": "3 sources", "ts": "2026-08-01T12:00:01Z" },
                { "label": "draft" }
            ]
        });
        let execution = normalize_execution("ex42", &payload);
        assert_eq!(execution.id, "ex42");
        assert_eq!(execution.status, ExecutionStatus::Running);
        assert_eq!(execution.trace.len(), 2);
        assert_eq!(execution.trace[1].summary, "");
        assert!(execution.duration_ms.is_none());
    }

    #[test]
    fn computes_duration_from_timestamps() {
        let payload = json!({
            "status": "success",
            "startedAt": "2026-08-01T12:00:00Z",
            "stoppedAt": "2026-08-01T12:00:05.500Z"
        });
        let execution = normalize_execution("ex1", &payload);
        assert_eq!(execution.status, ExecutionStatus::Success);
        assert_eq!(execution.duration_ms, Some(5500));
    }

    #[test]
    fn absent_status_counts_as_running() {
        let execution = normalize_execution("ex1", &json!({}));
        assert_eq!(execution.status, ExecutionStatus::Running);
        assert_eq!(execution.id, "ex1");
        assert!(execution.trace.is_empty());
    }

    #[test]
    fn trace_entries_without_labels_are_dropped() {
        let payload = json!({ "trace": [{ "summary": "no label" }, { "label": "kept" }] });
        let execution = normalize_execution("ex1", &payload);
        assert_eq!(execution.trace.len(), 1);
        assert_eq!(execution.trace[0].label, "kept");
    }
}
