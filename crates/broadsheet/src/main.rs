//! Broadsheet server binary.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

use anyhow::Context;
use broadsheet::{AppState, Config, router};
use broadsheet_core::{Database, UserRepository};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "broadsheet=info,broadsheet_core=info,broadsheet_smtp=info,tower_http=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load configuration")?;
    info!("Starting Broadsheet on {}", config.bind);

    let db = Database::open(&config.database_url)
        .await
        .with_context(|| format!("Failed to open database {}", config.database_url))?;

    if let Some((email, token)) = config.admin() {
        let admin = UserRepository::new(&db)
            .ensure_superuser(email, token)
            .await
            .context("Failed to create superuser")?;
        info!(user_id = %admin.id, "Superuser {} ready", admin.email);
    }

    let transport = config.transport()?;
    let state = AppState::new(
        &db,
        transport,
        &config.smtp_from,
        config.recipient_cache_ttl(),
    );

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Broadsheet stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
