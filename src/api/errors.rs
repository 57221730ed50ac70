// Normalized error responses for the console contract. Handlers convert
// every failure into one of these; nothing escapes as an unhandled error.
use crate::auth;
use crate::upstream::UpstreamError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use axum_extra::extract::cookie::CookieJar;
use serde_json::json;
use tracing::{error, warn};

pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(json!({ "success": false, "error": message.into() })),
    )
        .into_response()
}

pub fn bad_request(message: impl Into<String>) -> Response {
    error_response(StatusCode::BAD_REQUEST, message)
}

pub fn unauthorized() -> Response {
    error_response(StatusCode::UNAUTHORIZED, "authentication required")
}

pub fn not_found(message: impl Into<String>) -> Response {
    error_response(StatusCode::NOT_FOUND, message)
}

pub fn internal(message: impl Into<String>) -> Response {
    error_response(StatusCode::INTERNAL_SERVER_ERROR, message)
}

pub fn bad_gateway() -> Response {
    error_response(StatusCode::BAD_GATEWAY, "upstream error")
}

/// Extracts the session token or rejects with 401 before any upstream
/// call is made.
pub fn require_session(jar: &CookieJar) -> Result<String, Response> {
    auth::extract_session_token(jar).ok_or_else(unauthorized)
}

/// Maps a tagged upstream failure onto the console contract: 401 and 404
/// pass through where they carry meaning, everything else is a 502.
pub fn map_upstream_error(err: UpstreamError) -> Response {
    match err {
        UpstreamError::Status(StatusCode::UNAUTHORIZED, _) => {
            warn!("upstream rejected session token");
            error_response(StatusCode::UNAUTHORIZED, "session expired")
        }
        UpstreamError::Status(StatusCode::NOT_FOUND, _) => not_found("not found"),
        UpstreamError::Status(status, snippet) => {
            error!("upstream returned {status}: {snippet}");
            bad_gateway()
        }
        UpstreamError::Unavailable(detail) => {
            error!("upstream request failed: {detail}");
            bad_gateway()
        }
        UpstreamError::Malformed(detail) => {
            error!("upstream body malformed: {detail}");
            bad_gateway()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value;

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read response body");
        serde_json::from_slice(&bytes).expect("parse response json")
    }

    #[tokio::test]
    async fn error_body_carries_success_flag_and_message() {
        let response = bad_request("file is required");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let payload = body_json(response).await;
        assert_eq!(payload["success"], json!(false));
        assert_eq!(payload["error"], json!("file is required"));
    }

    #[tokio::test]
    async fn upstream_401_passes_through() {
        let err = UpstreamError::Status(StatusCode::UNAUTHORIZED, String::new());
        let response = map_upstream_error(err);
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn upstream_404_passes_through() {
        let err = UpstreamError::Status(StatusCode::NOT_FOUND, String::new());
        let response = map_upstream_error(err);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn generic_upstream_failures_map_to_502() {
        for err in [
            UpstreamError::Status(StatusCode::INTERNAL_SERVER_ERROR, "boom".to_string()),
            UpstreamError::Unavailable("connect refused".to_string()),
            UpstreamError::Malformed("empty body".to_string()),
        ] {
            let response = map_upstream_error(err);
            assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
            let payload = body_json(response).await;
            assert_eq!(payload["error"], json!("upstream error"));
        }
    }
}
