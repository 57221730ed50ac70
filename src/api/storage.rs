// Content-storage routes: folder listing served through the ephemeral
// cache, plus the folder/file mutations that invalidate it.
use crate::api::errors::{bad_request, map_upstream_error, not_found, require_session};
use crate::schemas::FolderStat;
use crate::state::AppState;
use crate::upstream::{normalize_record_list, value_to_i64, UpstreamError};
use axum::extract::{Query, State};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/storage/folders", get(list_folders).post(create_folder))
        .route("/api/storage/move", post(move_file))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    #[serde(default)]
    folder: Option<String>,
}

async fn list_folders(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, Response> {
    let token = require_session(&jar)?;

    let stats = match state.folder_cache.get(&token) {
        Some(stats) => {
            debug!("folder listing served from cache");
            stats
        }
        None => {
            let payload = state
                .upstream
                .fetch_json(state.upstream.get_webhook("content-storage", &token))
                .await
                .map_err(map_upstream_error)?;
            let stats = flatten_folder_stats(&payload).map_err(map_upstream_error)?;
            state.folder_cache.put(&token, stats.clone());
            stats
        }
    };

    match query.folder.as_deref().map(str::trim).filter(|f| !f.is_empty()) {
        Some(requested) => {
            let matched = stats
                .iter()
                .find(|stat| stat.folder.eq_ignore_ascii_case(requested))
                .cloned()
                .ok_or_else(|| not_found("folder not found"))?;
            Ok(Json(json!({ "success": true, "folder": matched })))
        }
        None => Ok(Json(json!({ "success": true, "folders": stats }))),
    }
}

#[derive(Debug, Deserialize)]
struct CreateFolderRequest {
    name: String,
}

async fn create_folder(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(payload): Json<CreateFolderRequest>,
) -> Result<Json<Value>, Response> {
    let token = require_session(&jar)?;
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(bad_request("folder name is required"));
    }

    let body = json!({ "name": name });
    state
        .upstream
        .fetch_json(state.upstream.post_webhook_json("create-folder", &token, &body))
        .await
        .map_err(map_upstream_error)?;

    state.folder_cache.invalidate(&token);
    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
struct MoveFileRequest {
    file_id: String,
    target_folder: String,
}

async fn move_file(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(payload): Json<MoveFileRequest>,
) -> Result<Json<Value>, Response> {
    let token = require_session(&jar)?;
    let file_id = payload.file_id.trim();
    let target = payload.target_folder.trim();
    if file_id.is_empty() || target.is_empty() {
        return Err(bad_request("file_id and target_folder are required"));
    }

    let body = json!({ "fileId": file_id, "targetFolder": target });
    state
        .upstream
        .fetch_json(state.upstream.post_webhook_json("move-file", &token, &body))
        .await
        .map_err(map_upstream_error)?;

    state.folder_cache.invalidate(&token);
    Ok(Json(json!({ "success": true })))
}

/// Flattens the upstream array of single-key objects
/// (`{"blog posts": {"items": [...], "newFiles": 2}}`) into named stats.
/// Entries that do not follow that shape are skipped with a warning.
pub fn flatten_folder_stats(payload: &Value) -> Result<Vec<FolderStat>, UpstreamError> {
    let records = normalize_record_list(payload)?;
    let mut stats = Vec::with_capacity(records.len());
    for record in &records {
        let Some(object) = record.as_object() else {
            warn!("skipping non-object folder record");
            continue;
        };
        let Some((name, detail)) = object.iter().next() else {
            continue;
        };
        let items = detail
            .get("items")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        stats.push(FolderStat {
            folder: name.clone(),
            unseen: value_to_i64(detail.get("newFiles")).unwrap_or(0),
            items,
        });
    }
    Ok(stats)
}
