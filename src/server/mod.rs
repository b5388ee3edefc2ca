//! HTTP transport for the extension: `/process`, `/render` and `/health`.

mod handlers;

use crate::config::Config;
use crate::error::{Error, QuickCalResult};
use crate::orchestrator::Orchestrator;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

pub use handlers::RenderRequest;

/// Selections are short; anything bigger than this is not a highlight
const MAX_BODY_BYTES: usize = 256 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Orchestrator,
    /// How long `/process` waits for the pipeline before answering
    pub request_deadline: Duration,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator, request_deadline: Duration) -> Self {
        Self {
            orchestrator,
            request_deadline,
        }
    }
}

/// Build the router with tracing and permissive CORS
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/process", post(handlers::process_handler))
        .route("/render", post(handlers::render_handler))
        .route("/health", get(handlers::health_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(MAX_BODY_BYTES)),
        )
        .with_state(state)
}

/// Bind the configured address and serve until `shutdown` resolves
pub async fn serve<F>(config: &Config, state: AppState, shutdown: F) -> QuickCalResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr: SocketAddr = format!("{}:{}", config.bind_addr, config.port)
        .parse()
        .map_err(|e| Error::Config(format!("Invalid listen address: {}", e)))?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on {}", addr);

    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await?;

    info!("Server stopped");
    Ok(())
}
