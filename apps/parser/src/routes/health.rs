use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Reports service version and whether the inference endpoint answers its probe.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let probe = state.pipeline.ensure_reachable().await;

    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "resume-parser",
        "model": state.config.model,
        "inference": {
            "endpoint": state.pipeline.endpoint(),
            "reachable": probe.is_ok(),
            "detail": probe.err().map(|e| e.to_string()),
        }
    }))
}
