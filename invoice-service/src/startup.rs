//! Application startup and lifecycle management.

use crate::config::{InvoiceConfig, StorageBackend};
use crate::handlers;
use crate::middleware::metrics_middleware;
use crate::services::metrics::init_metrics;
use crate::services::{CreditNoteService, Database, InMemoryStore, IngestionService, InvoiceStore};
use axum::{
    http::{header, HeaderName, HeaderValue, Method, Request},
    middleware,
    routing::{delete, get, post},
    Router,
};
use secrecy::ExposeSecret;
use service_core::error::AppError;
use service_core::middleware::{request_id_middleware, REQUEST_ID_HEADER};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: InvoiceConfig,
    pub store: Arc<dyn InvoiceStore>,
    pub ingestion: IngestionService,
    pub credit_notes: CreditNoteService,
}

impl AppState {
    pub fn new(config: InvoiceConfig, store: Arc<dyn InvoiceStore>) -> Self {
        Self {
            ingestion: IngestionService::new(store.clone(), config.import.base_dir.clone()),
            credit_notes: CreditNoteService::new(store.clone()),
            store,
            config,
        }
    }
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!("Invalid CORS origin '{}': {}. Ignoring.", origin, e);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static(REQUEST_ID_HEADER),
        ])
}

/// Build the HTTP router over `state`.
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.security.allowed_origins);

    let api = Router::new()
        .route("/data/load-from-file", post(handlers::load_from_file))
        .route("/data/load-from-json", post(handlers::load_from_json))
        .route("/invoices", get(handlers::list_invoices))
        .route("/invoices/statistics", get(handlers::get_statistics))
        .route("/invoices/:id", get(handlers::get_invoice))
        .route(
            "/credit-notes",
            get(handlers::list_credit_notes).post(handlers::create_credit_note),
        )
        .route(
            "/credit-notes/invoice/:invoice_id",
            get(handlers::list_invoice_credit_notes),
        )
        .route("/credit-notes/:id", delete(handlers::delete_credit_note))
        .route("/reports/overdue-invoices", get(handlers::overdue_invoices))
        .route(
            "/reports/payment-status-summary",
            get(handlers::payment_status_summary),
        )
        .route(
            "/reports/inconsistent-invoices",
            get(handlers::inconsistent_invoices),
        )
        .route(
            "/reports/executive-dashboard",
            get(handlers::executive_dashboard),
        );

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_handler))
        .nest("/api", api)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(cors)
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    http_port: u16,
    http_listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with the given configuration, running
    /// migrations when the store is PostgreSQL.
    pub async fn build(config: InvoiceConfig) -> Result<Self, AppError> {
        init_metrics();

        let store: Arc<dyn InvoiceStore> = match config.storage.backend {
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory storage; data is lost on shutdown");
                Arc::new(InMemoryStore::new())
            }
            StorageBackend::Postgres => {
                let database = config.storage.database.as_ref().ok_or_else(|| {
                    AppError::ConfigError(anyhow::anyhow!(
                        "DATABASE_URL is required for the postgres backend"
                    ))
                })?;

                let db = Database::new(
                    database.url.expose_secret(),
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
        };

        let state = AppState::new(config.clone(), store);

        let http_addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let http_listener = TcpListener::bind(http_addr).await.map_err(|e| {
            tracing::error!(error = %e, addr = %http_addr, "Failed to bind HTTP listener");
            AppError::from(e)
        })?;
        let http_port = http_listener.local_addr()?.port();

        tracing::info!(http_port = http_port, "Invoice service listener bound");

        Ok(Self {
            http_port,
            http_listener,
            state,
        })
    }

    /// Get the HTTP port the server is listening on.
    pub fn http_port(&self) -> u16 {
        self.http_port
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let app = router(self.state);

        tracing::info!(
            service = "invoice-service",
            version = env!("CARGO_PKG_VERSION"),
            http_port = self.http_port,
            "Service ready to accept connections"
        );

        axum::serve(self.http_listener, app).await
    }
}
