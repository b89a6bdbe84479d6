//! HTTP server facade for bookshelf with Axum, error handling, and OpenAPI support.

use std::future::Future;

use anyhow::Context;
use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};

use bookshelf_db::Database;
use bookshelf_kernel::{settings::Settings, ModuleRegistry};

pub mod error;
pub mod router;

use error::AppError;
use router::RouterBuilder;

/// Serve the application until `shutdown` resolves
pub async fn start_server<F>(
    registry: &ModuleRegistry,
    settings: &Settings,
    db: Database,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let address = settings.server.bind_address();
    tracing::info!("starting HTTP server on {}", address);

    let app = build_router(registry, settings, db);

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind to {}", address))?;

    tracing::info!("HTTP server listening on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server failed")?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

/// Build the main HTTP router with all module routes mounted
pub fn build_router(registry: &ModuleRegistry, settings: &Settings, db: Database) -> Router {
    let mut router_builder = RouterBuilder::new().merge(
        Router::new()
            .route("/healthz", get(health_check))
            .with_state(db),
    );

    for module in registry.modules() {
        tracing::info!(module = module.name(), "mounting module routes");
        router_builder = router_builder.merge(module.routes());
    }

    router_builder
        .with_openapi(registry)
        .with_fallbacks()
        .with_timeout(settings.server.request_timeout_ms)
        .with_cors()
        .with_tracing()
        .with_request_id()
        .build()
}

/// Liveness plus database reachability
async fn health_check(State(db): State<Database>) -> Result<Json<Value>, AppError> {
    db.ping().await.map_err(|err| {
        tracing::warn!(error = %err, "health check failed");
        AppError::service_unavailable("database is unreachable")
    })?;

    Ok(Json(json!({ "status": "ok", "database": "ok" })))
}
