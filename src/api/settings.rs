// Workspace settings and per-agent toggles, proxied as-is.
use crate::api::errors::{bad_request, map_upstream_error, require_session};
use crate::state::AppState;
use axum::extract::State;
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/settings", get(get_settings).put(update_settings))
        .route("/api/settings/agents", post(toggle_agent))
}

async fn get_settings(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<Json<Value>, Response> {
    let token = require_session(&jar)?;
    let settings = state
        .upstream
        .fetch_json(state.upstream.get_webhook("get-settings", &token))
        .await
        .map_err(map_upstream_error)?;
    Ok(Json(json!({ "success": true, "settings": settings })))
}

#[derive(Debug, Deserialize)]
struct UpdateSettingsRequest {
    settings: Value,
}

async fn update_settings(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(payload): Json<UpdateSettingsRequest>,
) -> Result<Json<Value>, Response> {
    let token = require_session(&jar)?;
    if !payload.settings.is_object() {
        return Err(bad_request("settings must be an object"));
    }

    state
        .upstream
        .fetch_json(state.upstream.post_webhook_json("update-settings", &token, &payload.settings))
        .await
        .map_err(map_upstream_error)?;
    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
struct ToggleAgentRequest {
    agent: String,
    enabled: bool,
}

async fn toggle_agent(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(payload): Json<ToggleAgentRequest>,
) -> Result<Json<Value>, Response> {
    let token = require_session(&jar)?;
    let agent = payload.agent.trim();
    if agent.is_empty() {
        return Err(bad_request("agent is required"));
    }

    let body = json!({ "agent": agent, "enabled": payload.enabled });
    state
        .upstream
        .fetch_json(state.upstream.post_webhook_json("agent-toggle", &token, &body))
        .await
        .map_err(map_upstream_error)?;
    Ok(Json(json!({ "success": true })))
}
