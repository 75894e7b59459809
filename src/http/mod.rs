//! HTTP surface.
//!
//! Two listeners: the public API built by [`router`], and a separate
//! Prometheus endpoint served by [`run_metrics_server`].
//!
//! Request bodies are typed with `deny_unknown_fields`, so anything the
//! handlers do not expect is refused by the extractor before any business
//! logic runs.

mod admin;
mod capability;
mod catalog;
mod extract;
mod state;

pub use state::AppState;

use axum::Router;
use axum::routing::{get, post};
use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use tokio::net::TcpListener;

/// Build the public API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(catalog::health))
        // Catalog
        .route("/products", get(catalog::list_products))
        .route("/products/:id", get(catalog::get_product))
        .route("/submissions", post(catalog::submit))
        // Capability links
        .route("/sale-confirmations", post(capability::confirm_sale))
        .route("/deletion-requests", post(capability::request_deletion))
        .route("/token-validation/:token", get(capability::validate_token))
        // Moderation
        .route("/admin/session", post(admin::login))
        .route("/admin/submissions", get(admin::list_submissions))
        .route(
            "/admin/products/:id",
            get(admin::get_product).delete(admin::delete_product),
        )
        .route("/admin/products/:id/approve", post(admin::approve_product))
        .route("/admin/products/:id/reject", post(admin::reject_product))
        .route("/admin/deletion-requests", get(admin::list_deletion_requests))
        .route(
            "/admin/deletion-requests/:id/approve",
            post(admin::approve_deletion),
        )
        .route(
            "/admin/deletion-requests/:id/reject",
            post(admin::reject_deletion),
        )
        .with_state(state)
}

/// Serve the API until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

/// Handler for GET /metrics - returns Prometheus metrics in text format.
async fn metrics_handler() -> String {
    crate::metrics::gather_metrics()
}

/// Run the HTTP server for Prometheus metrics.
///
/// Binds to `ip:port` and serves the `/metrics` endpoint.
/// This is a long-running task that should be spawned in the background.
pub async fn run_metrics_server(ip: IpAddr, port: u16) {
    let app = Router::new().route("/metrics", get(metrics_handler));

    let addr = SocketAddr::new(ip, port);
    tracing::info!("Prometheus HTTP server listening on {}", addr);

    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind metrics server on {}: {}", addr, e);
            return;
        }
    };

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Metrics server error: {}", e);
    }
}

/// Format epoch seconds as RFC 3339.
fn rfc3339(secs: i64) -> Option<String> {
    chrono::DateTime::from_timestamp(secs, 0).map(|t| t.to_rfc3339())
}
