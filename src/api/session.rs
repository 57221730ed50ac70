// Session routes: login sets the HTTP-only cookie, logout clears it,
// me validates the token against the backend.
use crate::api::errors::{bad_gateway, bad_request, map_upstream_error, require_session};
use crate::auth;
use crate::state::AppState;
use crate::upstream::value_to_string;
use axum::extract::State;
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/session/login", post(login))
        .route("/api/session/logout", post(logout))
        .route("/api/session/me", get(me))
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    identifier: String,
    password: String,
}

async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<(CookieJar, Json<Value>), Response> {
    let identifier = payload.identifier.trim();
    let password = payload.password.trim();
    if identifier.is_empty() || password.is_empty() {
        return Err(bad_request("identifier and password are required"));
    }

    let body = json!({ "identifier": identifier, "password": password });
    let reply = state
        .upstream
        .fetch_json(state.upstream.post_rest_json("login", None, &body))
        .await
        .map_err(map_upstream_error)?;

    let token = value_to_string(reply.get("token")).ok_or_else(|| {
        tracing::error!("login reply carried no token");
        bad_gateway()
    })?;

    info!("session opened for {identifier}");
    let jar = jar.add(auth::session_cookie(
        &token,
        state.config.session.cookie_secure,
    ));
    Ok((jar, Json(json!({ "success": true }))))
}

async fn logout(jar: CookieJar) -> (CookieJar, Json<Value>) {
    // Clearing the cookie is the whole logout; the backend token simply
    // ages out upstream.
    let jar = jar.remove(auth::removal_cookie());
    (jar, Json(json!({ "success": true })))
}

async fn me(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<Json<Value>, Response> {
    let token = require_session(&jar)?;
    let reply = state
        .upstream
        .fetch_json(state.upstream.get_rest("userinfo", &token))
        .await
        .map_err(map_upstream_error)?;

    Ok(Json(json!({
        "success": true,
        "user": {
            "email": value_to_string(reply.get("email")),
            "client": value_to_string(reply.get("client")),
            "role": value_to_string(reply.get("role")).unwrap_or_else(|| "member".to_string()),
        }
    })))
}
