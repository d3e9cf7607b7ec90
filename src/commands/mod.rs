//! HTTP surface: `GET /health` and `POST /ask`

mod ask;
mod types;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::app_state::AppState;
use crate::services::Embedder;

pub use ask::*;
pub use types::*;

pub fn router<E: Embedder + 'static>(state: Arc<AppState<E>>) -> Router {
    Router::new()
        .route("/health", get(health::<E>))
        .route("/ask", post(ask::<E>))
        .with_state(state)
}
