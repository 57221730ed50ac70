// Server entrypoint: configuration, tracing, router assembly, serve.
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::middleware::{from_fn, Next};
use axum::response::{IntoResponse, Response};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, Any as CorsAny, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use wingsuite_server::api;
use wingsuite_server::config::Config;
use wingsuite_server::shutdown::shutdown_signal;
use wingsuite_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;
    init_tracing(&config);

    let state = Arc::new(AppState::new(config.clone())?);
    let app = api::build_router(state)
        .layer(build_cors(&config))
        .layer(TraceLayer::new_for_http())
        .layer(from_fn(panic_guard));

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(addr.as_str()).await?;
    info!("console proxy listening on http://{addr}");

    let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());
    if let Err(err) = server.await {
        warn!("server exited with error: {err}");
    }

    Ok(())
}

fn init_tracing(config: &Config) {
    let default_level = config.observability.log_level.trim();
    let default_level = if default_level.is_empty() {
        "info".to_string()
    } else {
        default_level.to_lowercase()
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn build_cors(config: &Config) -> CorsLayer {
    let origins: Vec<axum::http::HeaderValue> = config
        .cors
        .allow_origins
        .as_deref()
        .unwrap_or_default()
        .iter()
        .filter(|value| *value != "*")
        .filter_map(|value| value.parse().ok())
        .collect();
    let wildcard = config
        .cors
        .allow_origins
        .as_deref()
        .map(|values| values.iter().any(|value| value == "*"))
        .unwrap_or(false);

    // Cookie auth needs credentials, and credentials forbid wildcards;
    // that mode requires explicit origins.
    if config.cors.allow_credentials.unwrap_or(false) && !origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(AllowMethods::list(vec![
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ]))
            .allow_headers(AllowHeaders::mirror_request())
            .allow_credentials(true);
    }

    if wildcard {
        return CorsLayer::new()
            .allow_origin(CorsAny)
            .allow_methods(CorsAny)
            .allow_headers(CorsAny);
    }

    if origins.is_empty() {
        return CorsLayer::new();
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(CorsAny)
        .allow_headers(CorsAny)
}

async fn panic_guard(request: Request<Body>, next: Next) -> Result<Response, StatusCode> {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let result = AssertUnwindSafe(next.run(request)).catch_unwind().await;
    match result {
        Ok(response) => Ok(response),
        Err(panic) => {
            error!("panic while handling {method} {path}: {}", panic_message(panic.as_ref()));
            Ok((
                StatusCode::INTERNAL_SERVER_ERROR,
                axum::Json(serde_json::json!({ "success": false, "error": "internal error" })),
            )
                .into_response())
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        return message.to_string();
    }
    if let Some(message) = panic.downcast_ref::<String>() {
        return message.clone();
    }
    "unknown panic".to_string()
}
