// Chat routes: the review assistant (edit/feedback modes) and the live
// help channel. Both delegate entirely to upstream webhooks.
use crate::api::errors::{bad_request, map_upstream_error, require_session};
use crate::schemas::ChatReply;
use crate::state::AppState;
use crate::upstream::value_to_string;
use axum::extract::State;
use axum::response::Response;
use axum::routing::post;
use axum::{Json, Router};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/chat/review", post(review_chat))
        .route("/api/chat/live", post(live_chat))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewMode {
    Edit,
    Feedback,
}

impl ReviewMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "edit" => Some(Self::Edit),
            "feedback" => Some(Self::Feedback),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Edit => "edit",
            Self::Feedback => "feedback",
        }
    }
}

#[derive(Debug, Deserialize)]
struct ReviewChatRequest {
    #[serde(default)]
    conversation_id: Option<String>,
    #[serde(default)]
    file_id: Option<String>,
    #[serde(default)]
    document_text: String,
    message: String,
    #[serde(default)]
    persona: Option<String>,
    #[serde(default = "default_mode")]
    mode: String,
}

fn default_mode() -> String {
    "edit".to_string()
}

async fn review_chat(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(payload): Json<ReviewChatRequest>,
) -> Result<Json<Value>, Response> {
    let token = require_session(&jar)?;
    let message = payload.message.trim();
    if message.is_empty() {
        return Err(bad_request("message is required"));
    }
    let mode = ReviewMode::parse(&payload.mode)
        .ok_or_else(|| bad_request("mode must be edit or feedback"))?;

    let body = json!({
        "conversationId": payload.conversation_id,
        "fileId": payload.file_id,
        "documentText": payload.document_text,
        "message": message,
        "persona": payload.persona,
        "mode": mode.as_str(),
    });
    let reply = state
        .upstream
        .fetch_json(state.upstream.post_webhook_json("review-chat", &token, &body))
        .await
        .map_err(map_upstream_error)?;

    Ok(Json(json!({ "success": true, "reply": reshape_reply(&reply, mode) })))
}

#[derive(Debug, Deserialize)]
struct LiveChatRequest {
    message: String,
    #[serde(default)]
    context: Option<Value>,
}

async fn live_chat(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(payload): Json<LiveChatRequest>,
) -> Result<Json<Value>, Response> {
    let token = require_session(&jar)?;
    let message = payload.message.trim();
    if message.is_empty() {
        return Err(bad_request("message is required"));
    }

    let body = json!({ "message": message, "context": payload.context });
    let reply = state
        .upstream
        .fetch_json(state.upstream.post_webhook_json("live-chat", &token, &body))
        .await
        .map_err(map_upstream_error)?;

    let answer = value_to_string(reply.get("assistant_message").or_else(|| reply.get("message")))
        .unwrap_or_default();
    Ok(Json(json!({ "success": true, "reply": { "assistant_message": answer } })))
}

/// Feedback mode never yields a proposal, even when the upstream sends
/// one along anyway.
pub fn reshape_reply(payload: &Value, mode: ReviewMode) -> ChatReply {
    let suggested_text = match mode {
        ReviewMode::Feedback => None,
        ReviewMode::Edit => value_to_string(
            payload
                .get("suggested_text")
                .or_else(|| payload.get("suggestedText")),
        ),
    };
    ChatReply {
        assistant_message: value_to_string(payload.get("assistant_message")).unwrap_or_default(),
        suggested_text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edit_mode_keeps_the_suggestion() {
        let payload = json!({
            "assistant_message": "tightened the intro",
            "suggested_text": "New intro."
        });
        let reply = reshape_reply(&payload, ReviewMode::Edit);
        assert_eq!(reply.suggested_text.as_deref(), Some("New intro."));
    }

    #[test]
    fn feedback_mode_strips_the_suggestion() {
        let payload = json!({
            "assistant_message": "reads well",
            "suggested_text": "should not leak"
        });
        let reply = reshape_reply(&payload, ReviewMode::Feedback);
        assert_eq!(reply.assistant_message, "reads well");
        assert!(reply.suggested_text.is_none());
    }

    #[test]
    fn mode_parsing() {
        assert_eq!(ReviewMode::parse(" Edit "), Some(ReviewMode::Edit));
        assert_eq!(ReviewMode::parse("FEEDBACK"), Some(ReviewMode::Feedback));
        assert_eq!(ReviewMode::parse("review"), None);
    }
}
