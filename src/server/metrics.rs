//! Prometheus metrics for the reference service.

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::info;

/// Starts a Prometheus scrape endpoint on `listen`.
///
/// # Errors
///
/// Returns an error if the address is invalid or a recorder is already
/// installed.
pub(crate) fn install_exporter(listen: &str) -> Result<()> {
    let addr: SocketAddr = listen
        .parse()
        .with_context(|| format!("Invalid metrics address: {listen}"))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("Failed to install Prometheus exporter")?;

    info!(%addr, "Metrics exporter listening");
    Ok(())
}

pub(crate) fn record_kv_operation(operation: &'static str) {
    ::metrics::counter!("stowage_kv_operations_total", "operation" => operation).increment(1);
}

pub(crate) fn record_namespace_operation(operation: &'static str) {
    ::metrics::counter!("stowage_namespace_operations_total", "operation" => operation)
        .increment(1);
}

pub(crate) fn record_payload_size(bytes: usize) {
    ::metrics::histogram!("stowage_payload_bytes").record(bytes as f64);
}
