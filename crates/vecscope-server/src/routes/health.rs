use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::state::AppState;

/// Liveness check; also reports what the loaded index looks like.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "vecscope-server",
        "version": env!("CARGO_PKG_VERSION"),
        "chunks": state.index.len(),
        "method": state.index.method(),
        "dims": state.index.dims(),
    }))
}
