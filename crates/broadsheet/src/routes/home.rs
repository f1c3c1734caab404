//! Dashboard and liveness.

use axum::Json;
use axum::extract::State;
use broadsheet_core::Dashboard;
use serde_json::{Value, json};

use crate::error::ApiResult;
use crate::state::AppState;

/// Site-wide counters. Open to anonymous callers.
pub async fn dashboard(State(state): State<AppState>) -> ApiResult<Json<Dashboard>> {
    Ok(Json(state.stats.dashboard().await?))
}

pub async fn healthz() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
