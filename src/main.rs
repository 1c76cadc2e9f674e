//! Page change monitor: binary entrypoint.
//! Loads config, wires logging/metrics, then polls until Ctrl-C.

use anyhow::Context;
use page_change_monitor::metrics::install_exporter;
use page_change_monitor::{logging, shutdown, Monitor, MonitorConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();

    let cfg = MonitorConfig::load_default().context("loading monitor config")?;
    logging::init(&cfg.log)?;

    if let Some(addr) = cfg.metrics_addr {
        install_exporter(addr)?;
        info!(%addr, "prometheus exporter listening");
    }

    let monitor = Monitor::from_config(&cfg).await?;

    let (trigger, stop) = shutdown::channel();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => trigger.trigger(),
            Err(e) => error!("cannot listen for Ctrl-C: {e}"),
        }
    });

    monitor.run(stop).await;
    Ok(())
}
