use std::sync::Arc;

use axum::{
    routing::{get, put},
    Router,
};
use tokio::signal;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

mod config;
mod db;
mod error;
mod handlers;
mod models;
#[cfg(test)]
mod test_support;

use crate::config::{Config, StoreBackend};
use crate::db::{MemoryStore, MongoStore, ProductStore};

/// Shared application state — cheap to clone (the store sits behind an Arc).
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ProductStore>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present (ignored in production where env vars are injected)
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,product_catalog=debug".into()),
        )
        .with_target(false)
        .compact()
        .init();

    let config = Config::from_env()?;

    let store = connect_store(&config).await?;
    let app = build_router(AppState { store });

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn connect_store(config: &Config) -> anyhow::Result<Arc<dyn ProductStore>> {
    match config.store_backend {
        StoreBackend::Mongo => {
            let store = MongoStore::connect(
                &config.mongodb_uri,
                &config.mongodb_database,
                &config.mongodb_collection,
            )
            .await?;

            // The driver connects lazily; an unreachable server is not fatal at startup.
            if let Err(err) = store.ping().await {
                warn!(error = %err, "MongoDB did not answer the startup ping");
            }

            if config.enforce_unique_names {
                if let Err(err) = store.ensure_unique_names().await {
                    warn!(
                        error = %err,
                        "Could not build unique index on `name`; duplicates are only checked before insert"
                    );
                }
            }

            let store: Arc<dyn ProductStore> = Arc::new(store);
            Ok(store)
        }
        StoreBackend::Memory => {
            info!("Using in-memory product store; data is lost on exit");
            let store: Arc<dyn ProductStore> =
                Arc::new(MemoryStore::new(config.enforce_unique_names));
            Ok(store)
        }
    }
}

fn build_router(state: AppState) -> Router {
    Router::new()
        // ── Health ──────────────────────────────────────────────────────────
        .route("/health", get(handlers::health))

        // ── Products CRUD ───────────────────────────────────────────────────
        .route(
            "/products",
            get(handlers::products::list_products).post(handlers::products::create_product),
        )
        .route(
            "/products/:id",
            put(handlers::products::update_product).delete(handlers::products::delete_product),
        )

        // ── Report ──────────────────────────────────────────────────────────
        .route(
            "/products/raport/:name",
            get(handlers::report::product_report),
        )

        // ── Middleware ──────────────────────────────────────────────────────
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Failed to install SIGTERM handler");
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

    info!("Shutdown signal received, draining in-flight requests");
}
