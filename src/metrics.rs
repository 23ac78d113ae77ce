use ::metrics::counter;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

use crate::config::MetricsConfig;
use crate::utils::error::{AppError, Result};

pub const CYCLES_TOTAL: &str = "promoshare_cycles_total";
pub const CYCLES_SKIPPED_TOTAL: &str = "promoshare_cycles_skipped_total";
pub const OFFERS_CREATED_TOTAL: &str = "promoshare_offers_created_total";
pub const DUPLICATES_SUPPRESSED_TOTAL: &str = "promoshare_duplicates_suppressed_total";
pub const DELIVERIES_TOTAL: &str = "promoshare_deliveries_total";
pub const STORE_FAILURES_TOTAL: &str = "promoshare_store_failures_total";
pub const FEED_FAILURES_TOTAL: &str = "promoshare_feed_failures_total";

/// Starts the Prometheus scrape endpoint when enabled. Counters are no-ops
/// until a recorder is installed.
pub fn install_exporter(config: &MetricsConfig, host: &str) -> Result<()> {
    if !config.enabled {
        return Ok(());
    }

    let addr: SocketAddr = format!("{}:{}", host, config.port)
        .parse()
        .map_err(|e| AppError::Internal(format!("invalid metrics address: {}", e)))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| AppError::Internal(format!("failed to install metrics exporter: {}", e)))?;

    tracing::info!(%addr, "Metrics exporter listening");
    Ok(())
}

pub fn cycle_completed() {
    counter!(CYCLES_TOTAL).increment(1);
}

pub fn cycle_skipped() {
    counter!(CYCLES_SKIPPED_TOTAL).increment(1);
}

pub fn offer_created() {
    counter!(OFFERS_CREATED_TOTAL).increment(1);
}

pub fn duplicate_suppressed() {
    counter!(DUPLICATES_SUPPRESSED_TOTAL).increment(1);
}

pub fn delivery(ok: bool) {
    counter!(DELIVERIES_TOTAL, "ok" => ok.to_string()).increment(1);
}

pub fn store_failure() {
    counter!(STORE_FAILURES_TOTAL).increment(1);
}

pub fn feed_failure() {
    counter!(FEED_FAILURES_TOTAL).increment(1);
}
