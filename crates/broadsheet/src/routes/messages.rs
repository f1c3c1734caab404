//! Message CRUD.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use broadsheet_core::{Entity, Message, MessageForm, MessageId, Operation, authorize, sees_all};

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::form::{MESSAGE_FORM, RenderedField};
use crate::state::AppState;

pub async fn list(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<Vec<Message>>> {
    authorize(&user, Operation::List, Entity::Message, None)?;
    let messages = if sees_all(&user, Entity::Message) {
        state.messages.list_all().await?
    } else {
        state.messages.list_owned(user.id).await?
    };
    Ok(Json(messages))
}

pub async fn create(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(form): Json<MessageForm>,
) -> ApiResult<(StatusCode, Json<Message>)> {
    authorize(&user, Operation::Create, Entity::Message, None)?;
    let message = state.messages.create(&form, user.id).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn form(
    State(state): State<AppState>,
    CurrentUser(_): CurrentUser,
) -> Json<Vec<RenderedField>> {
    Json(state.styles.apply(MESSAGE_FORM))
}

pub async fn detail(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<Message>> {
    let message = state.messages.require(MessageId(id)).await?;
    authorize(&user, Operation::View, Entity::Message, message.owner_id)?;
    Ok(Json(message))
}

pub async fn update(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(form): Json<MessageForm>,
) -> ApiResult<Json<Message>> {
    let existing = state.messages.require(MessageId(id)).await?;
    authorize(&user, Operation::Update, Entity::Message, existing.owner_id)?;
    Ok(Json(state.messages.update(existing.id, &form).await?))
}

pub async fn remove(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    let existing = state.messages.require(MessageId(id)).await?;
    authorize(&user, Operation::Delete, Entity::Message, existing.owner_id)?;
    state.messages.delete(existing.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
