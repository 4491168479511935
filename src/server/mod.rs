//! Reference key-value service (`stowage serve`).
//!
//! A small HTTP front end over [`NamespaceDb`] implementing the API the
//! [`HttpKvService`](crate::remote::HttpKvService) client speaks. Entries
//! never expire and every request touches a single key.
//!
//! Errors are returned as JSON bodies of the form
//! `{"error": "<code>", "message": "<details>"}`; the code is what clients
//! match on (`key_not_found`, `namespace_not_found`, `value_too_large`, ...).

mod db;
mod handlers;
mod metrics;

use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::config::ServerConfig;

pub use db::{DbError, NamespaceDb, validate_name};

/// Largest request body accepted, in bytes.
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Error returned by HTTP handlers.
#[derive(Debug)]
pub(crate) enum AppError {
    NotFound {
        code: &'static str,
        message: String,
    },
    BadRequest(String),
    PayloadTooLarge(String),
    QuotaExceeded(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            Self::NotFound { code, message } => (StatusCode::NOT_FOUND, code, message),
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, "invalid_request", message),
            Self::PayloadTooLarge(message) => {
                (StatusCode::PAYLOAD_TOO_LARGE, "value_too_large", message)
            },
            Self::QuotaExceeded(message) => (StatusCode::CONFLICT, "quota_exceeded", message),
            Self::Internal(message) => {
                error!(error = %message, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
            },
        };

        let body = serde_json::json!({ "error": code, "message": message });
        (status, Json(body)).into_response()
    }
}

impl From<DbError> for AppError {
    fn from(err: DbError) -> Self {
        let message = err.to_string();
        match err {
            DbError::InvalidName(_) => Self::BadRequest(message),
            DbError::NamespaceNotFound(_) => Self::NotFound {
                code: "namespace_not_found",
                message,
            },
            DbError::KeyNotFound => Self::NotFound {
                code: "key_not_found",
                message,
            },
            DbError::ValueTooLarge { .. } => Self::PayloadTooLarge(message),
            DbError::QuotaExceeded { .. } => Self::QuotaExceeded(message),
            DbError::Storage(e) => Self::Internal(format!("{e:#}")),
        }
    }
}

/// Builds the service router over `db`.
pub fn router(db: NamespaceDb) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/v1/namespaces/{namespace}",
            put(handlers::namespace_ensure).get(handlers::namespace_get),
        )
        .route(
            "/v1/namespaces/{namespace}/keys",
            get(handlers::key_get)
                .put(handlers::key_put)
                .delete(handlers::key_delete),
        )
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(db)
}

/// Runs the service until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the listen address is invalid, the database cannot be
/// opened, the metrics exporter cannot be installed, or the listener fails.
pub async fn serve(config: &ServerConfig) -> Result<()> {
    let addr: SocketAddr = config
        .listen
        .parse()
        .with_context(|| format!("Invalid listen address: {}", config.listen))?;

    if let Some(metrics_listen) = &config.metrics_listen {
        metrics::install_exporter(metrics_listen)?;
    }

    let db = NamespaceDb::open(&config.data_path)?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!(
        %addr,
        data_path = %config.data_path.display(),
        "Key-value service listening"
    );

    axum::serve(listener, router(db))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Key-value service failed")?;

    info!("Key-value service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
