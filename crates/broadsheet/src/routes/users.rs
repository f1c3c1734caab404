//! Registration and user administration.

use std::collections::BTreeSet;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use broadsheet_core::{Entity, NewUser, Operation, Permission, User, UserId, authorize};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::form::{RenderedField, USER_FORM};
use crate::state::AppState;

/// Response to a successful registration.
#[derive(Debug, Serialize)]
pub struct Registered {
    user: User,
    token: String,
}

pub async fn register(
    State(state): State<AppState>,
    Json(form): Json<NewUser>,
) -> ApiResult<(StatusCode, Json<Registered>)> {
    let user = state.users.register(&form).await?;
    let token = user.token.clone();
    Ok((StatusCode::CREATED, Json(Registered { user, token })))
}

pub async fn form(State(state): State<AppState>) -> Json<Vec<RenderedField>> {
    Json(state.styles.apply(USER_FORM))
}

pub async fn me(CurrentUser(user): CurrentUser) -> ApiResult<Json<User>> {
    authorize(&user, Operation::View, Entity::User, Some(user.id))?;
    Ok(Json(user))
}

#[derive(Debug, Deserialize)]
pub struct PermissionsBody {
    permissions: BTreeSet<Permission>,
}

pub async fn set_permissions(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<i64>,
    Json(body): Json<PermissionsBody>,
) -> ApiResult<Json<User>> {
    let id = UserId::new(id);
    authorize(&actor, Operation::Update, Entity::User, Some(id))?;
    let user = state.users.set_permissions(id, &body.permissions).await?;
    info!(user_id = %id, actor = %actor.username, "Updated permissions");
    Ok(Json(user))
}

#[derive(Debug, Deserialize)]
pub struct StaffBody {
    is_staff: bool,
}

pub async fn set_staff(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<i64>,
    Json(body): Json<StaffBody>,
) -> ApiResult<Json<User>> {
    let id = UserId::new(id);
    authorize(&actor, Operation::Update, Entity::User, Some(id))?;
    let user = state.users.set_staff(id, body.is_staff).await?;
    info!(user_id = %id, actor = %actor.username, is_staff = body.is_staff, "Updated staff flag");
    Ok(Json(user))
}

pub async fn remove(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    let id = UserId::new(id);
    authorize(&actor, Operation::Delete, Entity::User, Some(id))?;
    state.users.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
