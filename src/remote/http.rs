//! HTTP client for the stowage key-value service.
//!
//! Speaks the API served by `stowage serve`:
//!
//! | Operation          | Request                                     |
//! |--------------------|---------------------------------------------|
//! | health probe       | `GET /health`                               |
//! | ensure namespace   | `PUT /v1/namespaces/{ns}` (JSON config)     |
//! | fetch              | `GET /v1/namespaces/{ns}/keys?key={key}`    |
//! | upsert             | `PUT /v1/namespaces/{ns}/keys?key={key}`    |
//! | remove             | `DELETE /v1/namespaces/{ns}/keys?key={key}` |
//!
//! Keys travel percent-encoded in the query string, since URL parsers
//! collapse `.` and `..` path segments even when encoded.

use async_trait::async_trait;
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::retry::{RetryConfig, retry_service_call};
use super::{KvService, NamespaceConfig, ServiceError};

/// Transport settings for [`HttpKvService`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Per-request timeout in milliseconds.
    pub request_timeout_ms: u64,
    /// TCP connect timeout in milliseconds.
    pub connect_timeout_ms: u64,
    pub retry: RetryConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 5_000,
            connect_timeout_ms: 2_000,
            retry: RetryConfig::default(),
        }
    }
}

/// Error body returned by the service on failure.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    message: String,
}

/// Key-value service session over HTTP.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct HttpKvService {
    client: Client,
    base: String,
    retry: RetryConfig,
}

impl HttpKvService {
    /// Connects to the service at `endpoint` and verifies it is reachable.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Protocol`] if the endpoint is not a valid
    /// http(s) URL, or [`ServiceError::Unavailable`] if the health probe
    /// fails after retries.
    pub async fn connect(endpoint: &str, config: &ClientConfig) -> Result<Self, ServiceError> {
        let url = Url::parse(endpoint)
            .map_err(|e| ServiceError::Protocol(format!("invalid endpoint '{endpoint}': {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ServiceError::Protocol(format!(
                "unsupported endpoint scheme '{}'",
                url.scheme()
            )));
        }

        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .build()
            .map_err(|e| ServiceError::Protocol(format!("failed to build HTTP client: {e}")))?;

        let service = Self {
            client,
            base: url.as_str().trim_end_matches('/').to_string(),
            retry: config.retry.clone(),
        };
        service.health().await?;
        debug!(endpoint = %service.base, "Connected to key-value service");
        Ok(service)
    }

    /// Base URL of the service, without trailing slash.
    pub fn endpoint(&self) -> &str {
        &self.base
    }

    async fn health(&self) -> Result<(), ServiceError> {
        let url = format!("{}/health", self.base);
        retry_service_call(&self.retry, "health", || async {
            let resp = self.client.get(&url).send().await.map_err(transport_error)?;
            expect_success(resp, None).await.map(drop)
        })
        .await
    }

    fn namespace_url(&self, namespace: &str) -> String {
        format!("{}/v1/namespaces/{}", self.base, encode_segment(namespace))
    }

    fn key_url(&self, namespace: &str, key: &str) -> String {
        format!(
            "{}/keys?key={}",
            self.namespace_url(namespace),
            encode_segment(key)
        )
    }
}

#[async_trait]
impl KvService for HttpKvService {
    async fn ensure_namespace(
        &self,
        name: &str,
        config: &NamespaceConfig,
    ) -> Result<(), ServiceError> {
        let url = self.namespace_url(name);
        retry_service_call(&self.retry, "ensure_namespace", || async {
            let resp = self
                .client
                .put(&url)
                .json(config)
                .send()
                .await
                .map_err(transport_error)?;
            expect_success(resp, Some(name)).await.map(drop)
        })
        .await
    }

    async fn fetch(&self, namespace: &str, key: &str) -> Result<Vec<u8>, ServiceError> {
        let url = self.key_url(namespace, key);
        retry_service_call(&self.retry, "fetch", || async {
            let resp = self.client.get(&url).send().await.map_err(transport_error)?;
            let resp = expect_success(resp, Some(namespace)).await?;
            let body = resp.bytes().await.map_err(transport_error)?;
            Ok(body.to_vec())
        })
        .await
    }

    async fn upsert(
        &self,
        namespace: &str,
        key: &str,
        payload: Vec<u8>,
    ) -> Result<(), ServiceError> {
        let url = self.key_url(namespace, key);
        retry_service_call(&self.retry, "upsert", || async {
            let resp = self
                .client
                .put(&url)
                .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
                .body(payload.clone())
                .send()
                .await
                .map_err(transport_error)?;
            expect_success(resp, Some(namespace)).await.map(drop)
        })
        .await
    }

    async fn remove(&self, namespace: &str, key: &str) -> Result<(), ServiceError> {
        let url = self.key_url(namespace, key);
        retry_service_call(&self.retry, "remove", || async {
            let resp = self
                .client
                .delete(&url)
                .send()
                .await
                .map_err(transport_error)?;
            expect_success(resp, Some(namespace)).await.map(drop)
        })
        .await
    }
}

fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, NON_ALPHANUMERIC).to_string()
}

fn transport_error(err: reqwest::Error) -> ServiceError {
    if err.is_decode() || err.is_builder() {
        ServiceError::Protocol(err.to_string())
    } else {
        ServiceError::Unavailable(err.to_string())
    }
}

/// Passes successful responses through and maps failures to [`ServiceError`].
async fn expect_success(
    resp: Response,
    namespace: Option<&str>,
) -> Result<Response, ServiceError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.bytes().await.unwrap_or_default();
    let parsed: Option<ErrorBody> = serde_json::from_slice(&body).ok();
    Err(classify_failure(status, parsed, namespace))
}

fn classify_failure(
    status: StatusCode,
    body: Option<ErrorBody>,
    namespace: Option<&str>,
) -> ServiceError {
    let (code, message) = body
        .map(|b| (b.error, b.message))
        .unwrap_or_else(|| (String::new(), status.to_string()));

    match status {
        StatusCode::NOT_FOUND => match code.as_str() {
            "key_not_found" => ServiceError::KeyNotFound,
            "namespace_not_found" => {
                ServiceError::NamespaceNotFound(namespace.unwrap_or_default().to_string())
            },
            _ => ServiceError::Protocol(format!("unexpected 404 from service: {message}")),
        },
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => {
            ServiceError::Unavailable(message)
        },
        s if s.is_server_error() => ServiceError::Unavailable(format!("{s}: {message}")),
        s => ServiceError::Rejected {
            status: s.as_u16(),
            message,
        },
    }
}
