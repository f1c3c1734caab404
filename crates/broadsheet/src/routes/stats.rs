//! Per-user statistics.

use axum::Json;
use axum::extract::State;
use broadsheet_core::{Entity, Operation, UserStatistics, authorize};

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::state::AppState;

/// Recount the caller's newsletters and return the fresh row.
pub async fn show(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<UserStatistics>> {
    authorize(&user, Operation::View, Entity::Statistics, Some(user.id))?;
    Ok(Json(state.stats.recompute(user.id).await?))
}
