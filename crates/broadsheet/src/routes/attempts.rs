//! Attempt log listing and bulk clear.

use axum::Json;
use axum::extract::State;
use broadsheet_core::{Attempt, Entity, Operation, authorize, sees_all};
use serde_json::{Value, json};
use tracing::info;

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn list(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<Vec<Attempt>>> {
    authorize(&user, Operation::List, Entity::Attempt, None)?;
    let attempts = if sees_all(&user, Entity::Attempt) {
        state.attempts.list_all().await?
    } else {
        state.attempts.list_owned(user.id).await?
    };
    Ok(Json(attempts))
}

/// Delete every attempt. Staff only.
pub async fn clear(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<Value>> {
    authorize(&user, Operation::Clear, Entity::Attempt, None)?;
    let deleted = state.attempts.clear().await?;
    info!(actor = %user.username, deleted, "Attempts cleared");
    Ok(Json(json!({ "deleted": deleted })))
}
