// Credits route: the backend reports usage with stringified numbers;
// the console contract promises integers.
use crate::api::errors::{map_upstream_error, require_session};
use crate::schemas::CreditsSummary;
use crate::state::AppState;
use crate::upstream::value_to_i64;
use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use axum_extra::extract::cookie::CookieJar;
use serde_json::{json, Value};
use std::sync::Arc;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/api/credits", get(credits))
}

async fn credits(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<Json<Value>, Response> {
    let token = require_session(&jar)?;
    let payload = state
        .upstream
        .fetch_json(state.upstream.get_webhook("credits", &token))
        .await
        .map_err(map_upstream_error)?;

    let summary = summarize_credits(&payload);
    Ok(Json(json!({ "success": true, "credits": summary })))
}

pub fn summarize_credits(payload: &Value) -> CreditsSummary {
    let credits_used = value_to_i64(payload.get("credits_used")).unwrap_or(0);
    let plan_credits = value_to_i64(payload.get("plan_credits")).unwrap_or(0);
    CreditsSummary {
        credits_used,
        plan_credits,
        remaining: (plan_credits - credits_used).max(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coerces_stringified_numbers() {
        let payload = json!({ "credits_used": "150", "plan_credits": "1000" });
        let summary = summarize_credits(&payload);
        assert_eq!(summary.credits_used, 150);
        assert_eq!(summary.plan_credits, 1000);
        assert_eq!(summary.remaining, 850);
    }

    #[test]
    fn remaining_never_goes_negative() {
        let payload = json!({ "credits_used": 1200, "plan_credits": 1000 });
        assert_eq!(summarize_credits(&payload).remaining, 0);
    }

    #[test]
    fn missing_fields_default_to_zero() {
        let summary = summarize_credits(&json!({}));
        assert_eq!(summary.credits_used, 0);
        assert_eq!(summary.plan_credits, 0);
        assert_eq!(summary.remaining, 0);
    }
}
