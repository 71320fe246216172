//! Prometheus scrape endpoint for `logbatch run`.
//!
//! When `[metrics] enabled = true`, buffer and driver counters are served
//! from the exporter's own HTTP listener for the lifetime of the run.

use std::net::SocketAddr;

use anyhow::Result;
use logbatch_core::config::MetricsConfig;
use metrics_exporter_prometheus::PrometheusBuilder;

/// The exporter's listener answers on this path only.
const SCRAPE_PATH: &str = "/metrics";

/// Resolve `[metrics]` into the socket the listener binds.
fn scrape_addr(config: &MetricsConfig) -> Result<SocketAddr> {
    if config.endpoint != SCRAPE_PATH {
        return Err(anyhow::anyhow!(
            "unsupported metrics endpoint '{}': only '{}' is served",
            config.endpoint,
            SCRAPE_PATH
        ));
    }

    format!("{}:{}", config.listen_addr, config.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid metrics listen address: {}", e))
}

/// Register the Prometheus recorder, start serving it, and describe the
/// `logbatch_*` metrics.
///
/// Needs a running tokio runtime. A second call fails because the global
/// recorder is already set.
pub fn install_metrics_recorder(config: &MetricsConfig) -> Result<()> {
    let addr = scrape_addr(config)?;
    if addr.ip().is_unspecified() {
        tracing::warn!(listen_addr = %addr, "buffer metrics reachable on all interfaces");
    }

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("failed to install metrics recorder: {}", e))?;
    logbatch_core::metrics::describe_all();

    tracing::info!(listen_addr = %addr, path = SCRAPE_PATH, "serving buffer metrics");
    Ok(())
}
