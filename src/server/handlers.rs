//! HTTP handlers for namespaces and keys.
//!
//! Database calls are blocking and run under `spawn_blocking`.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use super::db::{DbError, NamespaceDb};
use super::{AppError, metrics};
use crate::remote::NamespaceConfig;

/// `?key=` parameter of the key routes.
#[derive(Debug, Deserialize)]
pub(crate) struct KeyQuery {
    key: String,
}

async fn blocking<T, F>(db: NamespaceDb, op: F) -> Result<T, AppError>
where
    T: Send + 'static,
    F: FnOnce(NamespaceDb) -> Result<T, DbError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || op(db))
        .await
        .map_err(|e| AppError::Internal(format!("Task join error: {e}")))?
        .map_err(AppError::from)
}

/// GET /health - Liveness probe.
pub(crate) async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// PUT /v1/namespaces/{namespace} - Resolve or create a namespace.
pub(crate) async fn namespace_ensure(
    State(db): State<NamespaceDb>,
    Path(namespace): Path<String>,
    Json(config): Json<NamespaceConfig>,
) -> Result<(StatusCode, Json<NamespaceConfig>), AppError> {
    metrics::record_namespace_operation("ensure");
    let name = namespace.clone();
    let (config, created) =
        blocking(db, move |db| db.ensure_namespace(&name, &config)).await?;

    debug!(namespace = %namespace, created, "Namespace resolved");
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(config)))
}

/// GET /v1/namespaces/{namespace} - Stored namespace configuration.
pub(crate) async fn namespace_get(
    State(db): State<NamespaceDb>,
    Path(namespace): Path<String>,
) -> Result<Json<NamespaceConfig>, AppError> {
    metrics::record_namespace_operation("get");
    let config = blocking(db, move |db| db.namespace(&namespace)).await?;
    Ok(Json(config))
}

/// GET /v1/namespaces/{namespace}/keys?key= - Raw payload of a key.
pub(crate) async fn key_get(
    State(db): State<NamespaceDb>,
    Path(namespace): Path<String>,
    Query(KeyQuery { key }): Query<KeyQuery>,
) -> Result<impl IntoResponse, AppError> {
    metrics::record_kv_operation("get");
    let payload = blocking(db, move |db| db.get(&namespace, &key)).await?;
    Ok((
        [(header::CONTENT_TYPE, "application/octet-stream")],
        payload,
    ))
}

/// PUT /v1/namespaces/{namespace}/keys?key= - Upsert a raw payload.
pub(crate) async fn key_put(
    State(db): State<NamespaceDb>,
    Path(namespace): Path<String>,
    Query(KeyQuery { key }): Query<KeyQuery>,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    metrics::record_kv_operation("put");
    metrics::record_payload_size(body.len());
    blocking(db, move |db| db.put(&namespace, &key, &body)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /v1/namespaces/{namespace}/keys?key= - Remove a key.
pub(crate) async fn key_delete(
    State(db): State<NamespaceDb>,
    Path(namespace): Path<String>,
    Query(KeyQuery { key }): Query<KeyQuery>,
) -> Result<StatusCode, AppError> {
    metrics::record_kv_operation("delete");
    blocking(db, move |db| db.delete(&namespace, &key)).await?;
    Ok(StatusCode::NO_CONTENT)
}
