//! Newsletter CRUD, sending and blocking.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use broadsheet_core::{
    Entity, Newsletter, NewsletterForm, NewsletterId, Operation, authorize, sees_all,
};
use serde::Deserialize;
use tracing::info;

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::form::{NEWSLETTER_FORM, RenderedField};
use crate::state::AppState;

pub async fn list(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<Vec<Newsletter>>> {
    authorize(&user, Operation::List, Entity::Newsletter, None)?;
    let newsletters = if sees_all(&user, Entity::Newsletter) {
        state.newsletters.list_all().await?
    } else {
        state.newsletters.list_owned(user.id).await?
    };
    Ok(Json(newsletters))
}

pub async fn create(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(form): Json<NewsletterForm>,
) -> ApiResult<(StatusCode, Json<Newsletter>)> {
    authorize(&user, Operation::Create, Entity::Newsletter, None)?;
    let newsletter = state.newsletters.create(&form, &user).await?;
    Ok((StatusCode::CREATED, Json(newsletter)))
}

pub async fn form(
    State(state): State<AppState>,
    CurrentUser(_): CurrentUser,
) -> Json<Vec<RenderedField>> {
    Json(state.styles.apply(NEWSLETTER_FORM))
}

pub async fn detail(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<Newsletter>> {
    let newsletter = state.newsletters.require(NewsletterId(id)).await?;
    authorize(&user, Operation::View, Entity::Newsletter, newsletter.owner_id)?;
    Ok(Json(newsletter))
}

pub async fn update(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(form): Json<NewsletterForm>,
) -> ApiResult<Json<Newsletter>> {
    let existing = state.newsletters.require(NewsletterId(id)).await?;
    authorize(&user, Operation::Update, Entity::Newsletter, existing.owner_id)?;
    Ok(Json(state.newsletters.update(existing.id, &form, &user).await?))
}

pub async fn remove(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    let existing = state.newsletters.require(NewsletterId(id)).await?;
    authorize(&user, Operation::Delete, Entity::Newsletter, existing.owner_id)?;
    state.newsletters.delete(existing.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Run the send workflow and answer with the plain-text report.
pub async fn send(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let existing = state.newsletters.require(NewsletterId(id)).await?;
    authorize(&user, Operation::Send, Entity::Newsletter, existing.owner_id)?;

    let report = state.dispatcher.send(existing.id, &user).await?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        report.summary(),
    ))
}

#[derive(Debug, Deserialize)]
pub struct BlockBody {
    is_blocked: bool,
}

pub async fn block(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(body): Json<BlockBody>,
) -> ApiResult<Json<Newsletter>> {
    let existing = state.newsletters.require(NewsletterId(id)).await?;
    authorize(&user, Operation::Block, Entity::Newsletter, existing.owner_id)?;

    let newsletter = state.newsletters.set_blocked(existing.id, body.is_blocked).await?;
    info!(
        newsletter_id = %existing.id,
        actor = %user.username,
        is_blocked = body.is_blocked,
        "Newsletter block flag changed"
    );
    Ok(Json(newsletter))
}
