//! Application startup and lifecycle management.

use crate::config::TrackerConfig;
use crate::handlers::{clients, dashboard, expenses, invoices, reminders};
use crate::middleware::metrics_middleware;
use crate::scheduler::ReminderScheduler;
use crate::services::mailer::{dispatcher_from_config, NotificationDispatcher};
use crate::services::renderer::HtmlInvoiceRenderer;
use crate::services::{
    get_metrics, init_metrics, BillingService, Database, EntityStore, MemoryStore,
};
use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use service_core::error::AppError;
use service_core::middleware::tracing::request_id_middleware;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub billing: BillingService,
    pub scheduler: Arc<ReminderScheduler>,
    store: Arc<dyn EntityStore>,
}

/// Liveness probe.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.health_check().await {
        Ok(_) => {
            tracing::debug!("Health check passed");
            (
                StatusCode::OK,
                Json(json!({
                    "status": "ok",
                    "service": "invoice-tracker",
                    "version": env!("CARGO_PKG_VERSION")
                })),
            )
        }
        Err(e) => {
            tracing::warn!(error = %e, "Health check failed - store unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unhealthy",
                    "service": "invoice-tracker",
                    "error": e.to_string()
                })),
            )
        }
    }
}

/// Readiness probe.
async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.health_check().await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

/// Metrics endpoint for Prometheus scraping.
async fn metrics_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        get_metrics(),
    )
}

/// Every route the service serves, without listeners attached.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics_handler))
        // Clients
        .route(
            "/clients",
            get(clients::list_clients).post(clients::create_client),
        )
        .route(
            "/clients/:client_id",
            get(clients::get_client)
                .patch(clients::update_client)
                .delete(clients::delete_client),
        )
        // Invoices
        .route(
            "/invoices",
            get(invoices::list_invoices).post(invoices::create_invoice),
        )
        .route(
            "/invoices/:invoice_id",
            get(invoices::get_invoice)
                .patch(invoices::update_invoice)
                .delete(invoices::delete_invoice),
        )
        .route(
            "/invoices/:invoice_id/line-items",
            get(invoices::list_line_items).put(invoices::replace_line_items),
        )
        .route("/invoices/:invoice_id/send", post(invoices::send_invoice))
        .route(
            "/invoices/:invoice_id/document",
            get(invoices::invoice_document),
        )
        // Expenses
        .route(
            "/expenses",
            get(expenses::list_expenses).post(expenses::create_expense),
        )
        .route(
            "/expenses/:expense_id",
            get(expenses::get_expense)
                .patch(expenses::update_expense)
                .delete(expenses::delete_expense),
        )
        // Dashboard
        .route("/dashboard/stats", get(dashboard::dashboard_stats))
        // Reminders
        .route("/reminders/status", get(reminders::reminder_status))
        .route("/reminders/due-soon/run", post(reminders::run_due_soon))
        .route("/reminders/overdue/run", post(reminders::run_overdue))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    http_port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application from configuration: Postgres when a database URL is
    /// set, otherwise the in-memory store.
    pub async fn build(config: TrackerConfig) -> Result<Self, AppError> {
        let store: Arc<dyn EntityStore> = match &config.database {
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
                tracing::warn!("DATABASE_URL not set, data will not survive a restart");
                Arc::new(MemoryStore::new())
            }
        };

        let dispatcher =
            dispatcher_from_config(config.smtp.clone(), &config.billing.business_name)?;

        Self::build_with(config, store, dispatcher).await
    }

    /// Build the application around an existing store and dispatcher.
    pub async fn build_with(
        config: TrackerConfig,
        store: Arc<dyn EntityStore>,
        dispatcher: Arc<dyn NotificationDispatcher>,
    ) -> Result<Self, AppError> {
        init_metrics();

        let renderer = Arc::new(HtmlInvoiceRenderer::new(
            config.billing.business_name.clone(),
            config.billing.tax_rate,
        ));
        let billing = BillingService::new(
            store.clone(),
            dispatcher.clone(),
            renderer,
            config.billing.tax_rate,
        );
        let scheduler = Arc::new(ReminderScheduler::new(
            store.clone(),
            dispatcher,
            config.reminders.clone(),
        ));

        let state = AppState {
            billing,
            scheduler,
            store,
        };

        let addr = config.common.socket_addr();
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!(error = %e, addr = %addr, "Failed to bind HTTP listener");
            AppError::from(e)
        })?;
        let http_port = listener.local_addr()?.port();

        tracing::info!(http_port = http_port, "Invoice tracker listener bound");

        Ok(Self {
            http_port,
            listener,
            state,
        })
    }

    /// Get the HTTP port the server is listening on.
    pub fn http_port(&self) -> u16 {
        self.http_port
    }

    /// Handle to the reminder scheduler, for stopping it on shutdown.
    pub fn scheduler(&self) -> Arc<ReminderScheduler> {
        self.state.scheduler.clone()
    }

    /// Start the reminder jobs and serve HTTP until the server stops.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.state.scheduler.start().await;

        let app = router(self.state);

        tracing::info!(
            service = "invoice-tracker",
            version = env!("CARGO_PKG_VERSION"),
            http_port = self.http_port,
            "Service ready to accept connections"
        );

        axum::serve(self.listener, app).await.map_err(|e| {
            tracing::error!(error = %e, "HTTP server error");
            e
        })
    }
}
