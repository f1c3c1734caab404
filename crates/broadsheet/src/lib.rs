//! # Broadsheet
//!
//! HTTP front end for the Broadsheet mailing-list manager.
//!
//! Clients authenticate with `Authorization: Bearer <token>`, the token
//! handed out at registration. Every permission check goes through
//! [`broadsheet_core::authorize`]; refusals become a `303` redirect to the
//! matching listing or a `403` with a plain-text message.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod auth;
pub mod config;
pub mod error;
pub mod form;
mod routes;
pub mod state;

use axum::Router;
use tower_http::trace::TraceLayer;

pub use config::{Config, ConfigError};
pub use error::{ApiError, ApiResult};
pub use form::FieldStyles;
pub use state::AppState;

/// Build the application router over `state`.
#[must_use]
pub fn router(state: AppState) -> Router {
    routes::routes()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
