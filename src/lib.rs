//! Book collection service.
//!
//! Wires the books module into the kernel registry, applies its migrations
//! and serves it over HTTP.

pub mod modules;
pub mod utils;

use anyhow::Context;
use axum::Router;
use bookshelf_db::Database;
use bookshelf_kernel::{settings::Settings, InitCtx, ModuleRegistry};

/// Re-export commonly used types
pub use modules::*;

/// Registry with every project module, backed by `db`
pub fn build_registry(db: &Database) -> anyhow::Result<ModuleRegistry> {
    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, db)?;
    Ok(registry)
}

/// Apply pending migrations for every registered module
pub async fn migrate(registry: &ModuleRegistry, db: &Database) -> anyhow::Result<usize> {
    let applied = db
        .apply_migrations(&registry.collect_migrations())
        .await
        .context("failed to apply migrations")?;
    tracing::info!(applied, "migrations complete");
    Ok(applied)
}

/// Register, initialize, migrate and start every module
pub async fn bootstrap(settings: &Settings, db: &Database) -> anyhow::Result<ModuleRegistry> {
    let registry = build_registry(db)?;
    let ctx = InitCtx { settings };

    registry.init_modules(&ctx).await?;
    migrate(&registry, db).await?;
    registry.start_modules(&ctx).await?;

    Ok(registry)
}

/// Fully initialized application router over `db`, without binding a socket
pub async fn build_app(settings: &Settings, db: Database) -> anyhow::Result<Router> {
    let registry = bootstrap(settings, &db).await?;
    Ok(bookshelf_http::build_router(&registry, settings, db))
}

/// Connect, migrate, serve until Ctrl-C/SIGTERM, then shut everything down
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    let db = Database::connect(&settings.database)
        .await
        .context("failed to open database")?;

    let registry = bootstrap(&settings, &db).await?;

    let served =
        bookshelf_http::start_server(&registry, &settings, db.clone(), shutdown_signal()).await;

    registry.stop_modules().await?;
    db.close().await;
    served
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
