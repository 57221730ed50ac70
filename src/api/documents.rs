// Document routes: listing, upload, delete, analyze, text extraction and
// whole-document load/save. All truth lives upstream; these handlers
// only forward and reshape.
use crate::api::errors::{bad_request, internal, map_upstream_error, require_session};
use crate::schemas::DocumentRecord;
use crate::state::AppState;
use crate::upstream::{
    normalize_record_list, value_to_bool, value_to_i64, value_to_string, UpstreamError,
};
use axum::extract::{DefaultBodyLimit, Multipart, Query, State};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;

const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/documents", get(list_documents))
        .route(
            "/api/documents/upload",
            post(upload_document).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/api/documents/delete", post(delete_document))
        .route("/api/documents/analyze", post(analyze_document))
        .route(
            "/api/documents/extract-text",
            post(extract_text).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route(
            "/api/documents/content",
            get(load_document).put(save_document),
        )
}

async fn list_documents(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<Json<Value>, Response> {
    let token = require_session(&jar)?;
    let payload = state
        .upstream
        .fetch_json(state.upstream.get_webhook("list-documents", &token))
        .await
        .map_err(map_upstream_error)?;
    let documents = reshape_documents(&payload).map_err(map_upstream_error)?;
    Ok(Json(json!({ "success": true, "documents": documents })))
}

async fn upload_document(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    multipart: Multipart,
) -> Result<Json<Value>, Response> {
    let token = require_session(&jar)?;
    let form = build_upload_form(multipart).await?;

    let reply = state
        .upstream
        .fetch_json(state.upstream.post_webhook_multipart("upload-document", &token, form))
        .await
        .map_err(map_upstream_error)?;

    state.folder_cache.invalidate(&token);
    Ok(Json(json!({
        "success": true,
        "file_id": value_to_string(reply.get("fileId").or_else(|| reply.get("file_id"))),
        "execution_id": value_to_string(reply.get("executionId").or_else(|| reply.get("execution_id"))),
    })))
}

#[derive(Debug, Deserialize)]
struct FileIdRequest {
    file_id: String,
}

async fn delete_document(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(payload): Json<FileIdRequest>,
) -> Result<Json<Value>, Response> {
    let token = require_session(&jar)?;
    let file_id = payload.file_id.trim();
    if file_id.is_empty() {
        return Err(bad_request("file_id is required"));
    }

    let body = json!({ "fileId": file_id });
    state
        .upstream
        .fetch_json(state.upstream.post_webhook_json("delete-document", &token, &body))
        .await
        .map_err(map_upstream_error)?;
    Ok(Json(json!({ "success": true })))
}

async fn analyze_document(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(payload): Json<FileIdRequest>,
) -> Result<Json<Value>, Response> {
    let token = require_session(&jar)?;
    let file_id = payload.file_id.trim();
    if file_id.is_empty() {
        return Err(bad_request("file_id is required"));
    }

    let body = json!({ "fileId": file_id });
    let reply = state
        .upstream
        .fetch_json(state.upstream.post_webhook_json("analyze-document", &token, &body))
        .await
        .map_err(map_upstream_error)?;

    Ok(Json(json!({
        "success": true,
        "execution_id": value_to_string(reply.get("executionId").or_else(|| reply.get("execution_id"))),
    })))
}

async fn extract_text(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    multipart: Multipart,
) -> Result<Json<Value>, Response> {
    let token = require_session(&jar)?;
    let form = build_upload_form(multipart).await?;

    let reply = state
        .upstream
        .fetch_json(state.upstream.post_webhook_multipart("extract-text", &token, form))
        .await
        .map_err(map_upstream_error)?;

    let text = value_to_string(reply.get("text")).unwrap_or_default();
    Ok(Json(json!({ "success": true, "text": text })))
}

#[derive(Debug, Deserialize)]
struct ContentQuery {
    #[serde(default)]
    file_id: Option<String>,
}

async fn load_document(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(query): Query<ContentQuery>,
) -> Result<Json<Value>, Response> {
    let token = require_session(&jar)?;
    let file_id = query
        .file_id
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| bad_request("file_id is required"))?;

    let path = format!("load-document?fileId={}", urlencode(file_id));
    let reply = state
        .upstream
        .fetch_json(state.upstream.get_webhook(&path, &token))
        .await
        .map_err(map_upstream_error)?;

    Ok(Json(json!({
        "success": true,
        "file_id": value_to_string(reply.get("fileId").or_else(|| reply.get("file_id")))
            .unwrap_or_else(|| file_id.to_string()),
        "content": value_to_string(reply.get("content")).unwrap_or_default(),
    })))
}

#[derive(Debug, Deserialize)]
struct SaveRequest {
    file_id: String,
    content: String,
}

async fn save_document(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(payload): Json<SaveRequest>,
) -> Result<Json<Value>, Response> {
    let token = require_session(&jar)?;
    let file_id = payload.file_id.trim();
    if file_id.is_empty() {
        return Err(bad_request("file_id is required"));
    }

    // Whole-document replace: the payload is always the full content,
    // never a patch.
    let body = json!({ "fileId": file_id, "content": payload.content });
    state
        .upstream
        .fetch_json(state.upstream.put_webhook_json("save-document", &token, &body))
        .await
        .map_err(map_upstream_error)?;
    Ok(Json(json!({ "success": true })))
}

/// Reads the console multipart body and rebuilds it as an upstream form.
/// The `file` part is required; `cluster` and `visibility` pass through.
async fn build_upload_form(mut multipart: Multipart) -> Result<reqwest::multipart::Form, Response> {
    let mut form = reqwest::multipart::Form::new();
    let mut saw_file = false;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| bad_request(format!("invalid multipart body: {err}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field
                    .file_name()
                    .map(|value| value.to_string())
                    .unwrap_or_else(|| "upload.bin".to_string());
                let content_type = field.content_type().map(|value| value.to_string());
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|err| bad_request(format!("failed to read file part: {err}")))?;
                let mut part =
                    reqwest::multipart::Part::bytes(bytes.to_vec()).file_name(file_name);
                if let Some(mime) = content_type {
                    part = part
                        .mime_str(&mime)
                        .map_err(|err| internal(format!("invalid content type: {err}")))?;
                }
                form = form.part("file", part);
                saw_file = true;
            }
            "cluster" | "visibility" => {
                let value = field
                    .text()
                    .await
                    .map_err(|err| bad_request(format!("failed to read field: {err}")))?;
                form = form.text(name, value);
            }
            other => {
                warn!("ignoring unexpected upload field {other:?}");
            }
        }
    }

    if !saw_file {
        return Err(bad_request("file is required"));
    }
    Ok(form)
}

/// Reshapes the polymorphic upstream document list into records with
/// coerced numbers and defaulted optionals.
pub fn reshape_documents(payload: &Value) -> Result<Vec<DocumentRecord>, UpstreamError> {
    let records = normalize_record_list(payload)?;
    let mut documents = Vec::with_capacity(records.len());
    for record in &records {
        let Some(id) = value_to_string(record.get("id").or_else(|| record.get("fileId"))) else {
            warn!("skipping document record without id");
            continue;
        };
        let visibility = value_to_string(record.get("visibility"))
            .map(|value| value.to_ascii_lowercase())
            .filter(|value| value == "shared")
            .unwrap_or_else(|| "private".to_string());
        documents.push(DocumentRecord {
            id,
            title: value_to_string(record.get("title")).unwrap_or_else(|| "untitled".to_string()),
            chunks: value_to_i64(record.get("chunks")).unwrap_or(0),
            created_at: value_to_string(record.get("createdAt").or_else(|| record.get("created_at"))),
            visibility,
            deletable: value_to_bool(record.get("deletable"), true),
            cluster: value_to_string(record.get("cluster")),
        });
    }
    Ok(documents)
}

fn urlencode(raw: &str) -> String {
    url::form_urlencoded::byte_serialize(raw.as_bytes()).collect()
}
