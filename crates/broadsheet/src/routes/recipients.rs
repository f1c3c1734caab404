//! Recipient CRUD.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use broadsheet_core::{Entity, Operation, Recipient, RecipientForm, RecipientId, authorize, sees_all};

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::form::{RECIPIENT_FORM, RenderedField};
use crate::state::AppState;

/// Recipients the caller may see.
pub async fn list(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<Vec<Recipient>>> {
    authorize(&user, Operation::List, Entity::Recipient, None)?;
    let recipients = if sees_all(&user, Entity::Recipient) {
        state.recipients.list_all().await?.as_ref().clone()
    } else {
        state.recipients.list_owned(user.id).await?
    };
    Ok(Json(recipients))
}

pub async fn create(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(form): Json<RecipientForm>,
) -> ApiResult<(StatusCode, Json<Recipient>)> {
    authorize(&user, Operation::Create, Entity::Recipient, None)?;
    let recipient = state.recipients.create(&form, user.id).await?;
    Ok((StatusCode::CREATED, Json(recipient)))
}

pub async fn form(
    State(state): State<AppState>,
    CurrentUser(_): CurrentUser,
) -> Json<Vec<RenderedField>> {
    Json(state.styles.apply(RECIPIENT_FORM))
}

pub async fn detail(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<Recipient>> {
    let recipient = state.recipients.require(RecipientId(id)).await?;
    authorize(&user, Operation::View, Entity::Recipient, recipient.owner_id)?;
    Ok(Json(recipient))
}

pub async fn update(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(form): Json<RecipientForm>,
) -> ApiResult<Json<Recipient>> {
    let existing = state.recipients.require(RecipientId(id)).await?;
    authorize(&user, Operation::Update, Entity::Recipient, existing.owner_id)?;
    Ok(Json(state.recipients.update(existing.id, &form).await?))
}

pub async fn remove(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    let existing = state.recipients.require(RecipientId(id)).await?;
    authorize(&user, Operation::Delete, Entity::Recipient, existing.owner_id)?;
    state.recipients.delete(existing.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
