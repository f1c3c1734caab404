//! HTTP routes.

mod attempts;
mod home;
mod messages;
mod newsletters;
mod recipients;
mod stats;
mod users;

use axum::Router;
use axum::routing::{delete, get, patch, post, put};

use crate::state::AppState;

/// Every route, without middleware.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::dashboard))
        .route("/healthz", get(home::healthz))
        .route("/users", post(users::register))
        .route("/users/form", get(users::form))
        .route("/users/me", get(users::me))
        .route("/users/:id", delete(users::remove))
        .route("/users/:id/permissions", put(users::set_permissions))
        .route("/users/:id/staff", patch(users::set_staff))
        .route("/recipients", get(recipients::list).post(recipients::create))
        .route("/recipients/form", get(recipients::form))
        .route(
            "/recipients/:id",
            get(recipients::detail)
                .put(recipients::update)
                .delete(recipients::remove),
        )
        .route("/messages", get(messages::list).post(messages::create))
        .route("/messages/form", get(messages::form))
        .route(
            "/messages/:id",
            get(messages::detail)
                .put(messages::update)
                .delete(messages::remove),
        )
        .route("/newsletters", get(newsletters::list).post(newsletters::create))
        .route("/newsletters/form", get(newsletters::form))
        .route(
            "/newsletters/:id",
            get(newsletters::detail)
                .put(newsletters::update)
                .delete(newsletters::remove),
        )
        .route("/newsletters/:id/send", post(newsletters::send))
        .route("/newsletters/:id/block", post(newsletters::block))
        .route("/attempts", get(attempts::list))
        .route("/attempts/clear", post(attempts::clear))
        .route("/stats", get(stats::show))
}
