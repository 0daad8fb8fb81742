//! HTTP API for circle.
//!
//! One JSON endpoint per order operation, backed by a shared
//! [`OrderService`]. See [`routes::build_router`] for the route table.

pub mod routes;
pub mod types;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tokio::sync::Mutex;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{info, Level};

pub use routes::build_router;

use crate::error::{Error, Result};
use crate::service::OrderService;
use types::ErrorResponse;

/// State shared by all handlers.
#[derive(Debug)]
pub struct AppState {
    /// The order service. `SQLite` connections are not `Sync`, so access is
    /// serialized.
    pub service: Mutex<OrderService>,
}

impl AppState {
    /// Wrap a service for sharing between handlers.
    #[must_use]
    pub fn new(service: OrderService) -> Self {
        Self {
            service: Mutex::new(service),
        }
    }
}

/// An [`Error`] rendered as a JSON response.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl ApiError {
    /// HTTP status for the wrapped error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            Error::OrderNotFound { .. } => StatusCode::NOT_FOUND,
            Error::DuplicateOrder { .. }
            | Error::TransitionRefused { .. }
            | Error::OrderLocked { .. } => StatusCode::CONFLICT,
            Error::NotHolder { .. } => StatusCode::FORBIDDEN,
            Error::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        } else {
            tracing::debug!(error = %self.0, %status, "request refused");
        }

        let details = match &self.0 {
            Error::Validation(report) => Some(report.clone()),
            _ => None,
        };
        let body = ErrorResponse {
            error: self.0.to_string(),
            details,
        };
        (status, Json(body)).into_response()
    }
}

/// Serve the API on `addr` until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve(service: OrderService, addr: SocketAddr) -> Result<()> {
    let state = Arc::new(AppState::new(service));
    let app = build_router(state).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("circle API listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("circle API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
}
