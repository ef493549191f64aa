//! Application startup and lifecycle management.

use crate::config::QuotingConfig;
use crate::domain::NumberingAuthority;
use crate::handlers;
use crate::middleware::metrics_middleware;
use crate::services::{init_metrics, Database, DocumentService, DocumentStore, MemoryStore};
use axum::{
    middleware,
    routing::{get, patch, post, put},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::request_id_middleware;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub service: DocumentService,
}

/// HTTP routes over the document service.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_handler))
        .route("/documents", post(handlers::create_document))
        .route(
            "/documents/:id",
            get(handlers::get_document)
                .patch(handlers::update_details)
                .delete(handlers::delete_document),
        )
        .route("/documents/:id/notes", patch(handlers::update_notes))
        .route("/documents/:id/status", post(handlers::change_status))
        .route("/documents/:id/lines", post(handlers::add_line))
        .route("/documents/:id/lines/order", put(handlers::reorder_lines))
        .route("/documents/:id/versions", post(handlers::new_version))
        .route("/documents/:id/duplicate", post(handlers::duplicate))
        .route("/documents/:id/invoice", post(handlers::convert_to_invoice))
        .route("/documents/:id/tax-breakdown", get(handlers::tax_breakdown))
        .route(
            "/lines/:line_id",
            patch(handlers::update_line).delete(handlers::remove_line),
        )
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application, using PostgreSQL when a database is
    /// configured and the in-memory store otherwise.
    pub async fn build(config: QuotingConfig) -> Result<Self, AppError> {
        let store: Arc<dyn DocumentStore> = match &config.database {
            Some(database) => {
                let db = Database::new(
                    &database.url,
                    database.max_connections,
                    database.min_connections,
                )
                .await
                .map_err(|e| {
                    tracing::error!(error = %e, "Failed to connect to PostgreSQL");
                    e
                })?;

                db.run_migrations().await.map_err(|e| {
                    tracing::error!(error = %e, "Failed to run migrations");
                    e
                })?;

                Arc::new(db)
            }
            None => {
                tracing::warn!("DATABASE_URL not set, documents are kept in memory");
                Arc::new(MemoryStore::new())
            }
        };

        Self::build_with_store(config, store).await
    }

    /// Build the application over an existing store.
    pub async fn build_with_store(
        config: QuotingConfig,
        store: Arc<dyn DocumentStore>,
    ) -> Result<Self, AppError> {
        init_metrics();

        let numbering = NumberingAuthority::new(config.numbering.clone());
        let service = DocumentService::new(store.clone(), numbering);
        let state = AppState {
            store,
            service,
        };

        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!(error = %e, addr = %addr, "Failed to bind HTTP listener");
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(port = port, "Quoting service listener bound");

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let app = router(self.state);

        tracing::info!(
            service = "quoting-service",
            version = env!("CARGO_PKG_VERSION"),
            port = self.port,
            "Service ready to accept connections"
        );

        axum::serve(self.listener, app).await.map_err(|e| {
            tracing::error!(error = %e, "HTTP server error");
            std::io::Error::other(format!("HTTP server error: {}", e))
        })
    }
}
