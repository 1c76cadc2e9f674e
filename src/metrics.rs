// src/metrics.rs
use std::net::SocketAddr;

use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("monitor_cycles_total", "Monitoring cycles started.");
        describe_counter!("fetch_retries_total", "Page fetch retries after transient errors.");
        describe_counter!("fetch_failures_total", "Cycles whose page fetch ultimately failed.");
        describe_counter!("extract_failures_total", "Pages whose content region was not found.");
        describe_counter!("changes_detected_total", "Cycles that produced a change summary.");
        describe_counter!("notify_sent_total", "Notifications delivered, per channel.");
        describe_counter!("notify_failures_total", "Notification attempts that failed, per channel.");
        describe_counter!("state_writes_total", "Successful state file writes.");
        describe_gauge!("monitor_last_cycle_ts", "Unix ts when the last cycle finished.");
    });
}

/// Install a Prometheus recorder with its own HTTP listener on `addr`.
/// Must be called from inside a tokio runtime.
pub fn install_exporter(addr: SocketAddr) -> anyhow::Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("prometheus exporter on {addr}: {e}"))?;
    ensure_metrics_described();
    Ok(())
}
