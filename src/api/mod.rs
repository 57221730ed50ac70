// Route aggregation, split by capability to keep the surface legible.
pub mod chat;
pub mod credits;
pub mod documents;
pub mod errors;
pub mod executions;
pub mod session;
pub mod settings;
pub mod storage;

use crate::state::AppState;
use axum::Router;
use std::sync::Arc;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(session::router())
        .merge(storage::router())
        .merge(documents::router())
        .merge(credits::router())
        .merge(executions::router())
        .merge(chat::router())
        .merge(settings::router())
        .with_state(state)
}
