//! Sends one test message through every configured channel and prints the outcome.
//! Useful to check credentials and device keys before starting the monitor.

use anyhow::Context;
use page_change_monitor::{MonitorConfig, Notification, NotifierMux};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_target(false).init();

    let cfg = MonitorConfig::load_default().context("loading monitor config")?;
    let mux = NotifierMux::from_config(&cfg.notify)?;
    if mux.is_empty() {
        println!("no notification channels configured");
        return Ok(());
    }

    let note = Notification {
        title: "Monitor test".into(),
        content: format!("Test notification for {}", cfg.target_url),
        url: Some(cfg.target_url.clone()),
    };
    let report = mux.notify(&note).await;

    for name in &report.delivered {
        println!("ok      {name}");
    }
    for (name, err) in &report.failed {
        println!("FAILED  {name}: {err}");
    }
    if report.all_failed() {
        anyhow::bail!("every channel failed");
    }
    Ok(())
}
