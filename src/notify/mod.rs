// src/notify/mod.rs
//! Outbound alert channels and the dispatcher that fans a message out to them.

pub mod bark;
pub mod session;
pub mod wecom;

use async_trait::async_trait;
use metrics::counter;
use tracing::{error, info};

use crate::config::NotifyConfig;
use crate::error::NotifyError;

pub use bark::BarkNotifier;
pub use session::Session;
pub use wecom::WeComNotifier;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub content: String,
    /// Click-through link, usually the monitored page.
    pub url: Option<String>,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Stable label for logs and metrics.
    fn name(&self) -> String;
    async fn send(&self, n: &Notification) -> Result<(), NotifyError>;
}

#[derive(Debug, Default)]
pub struct DispatchReport {
    pub delivered: Vec<String>,
    pub failed: Vec<(String, NotifyError)>,
}

impl DispatchReport {
    pub fn all_failed(&self) -> bool {
        self.delivered.is_empty() && !self.failed.is_empty()
    }
}

/// Sends to every channel in turn; one failing channel never blocks the rest.
#[derive(Default)]
pub struct NotifierMux {
    channels: Vec<Box<dyn Notifier>>,
}

impl NotifierMux {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, n: impl Notifier + 'static) -> Self {
        self.channels.push(Box::new(n));
        self
    }

    pub fn push(&mut self, n: Box<dyn Notifier>) {
        self.channels.push(n);
    }

    /// One WeCom channel and one Bark channel per device key, as configured.
    pub fn from_config(cfg: &NotifyConfig) -> Result<Self, NotifyError> {
        let mut mux = Self::new();
        if let Some(w) = &cfg.wecom {
            mux.push(Box::new(WeComNotifier::new(w.clone())?));
        }
        if let Some(b) = &cfg.bark {
            for key in &b.device_keys {
                mux.push(Box::new(BarkNotifier::new(b, key.clone())?));
            }
        }
        Ok(mux)
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub async fn notify(&self, n: &Notification) -> DispatchReport {
        let mut report = DispatchReport::default();
        if self.channels.is_empty() {
            tracing::debug!("no notification channels configured");
            return report;
        }
        for ch in &self.channels {
            let name = ch.name();
            match ch.send(n).await {
                Ok(()) => {
                    info!(target: "notify", channel = %name, "notification sent");
                    counter!("notify_sent_total", "channel" => name.clone()).increment(1);
                    report.delivered.push(name);
                }
                Err(e) => {
                    error!(target: "notify", channel = %name, "notification failed: {e}");
                    counter!("notify_failures_total", "channel" => name.clone()).increment(1);
                    report.failed.push((name, e));
                }
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct Recording {
        label: &'static str,
        fail: bool,
        seen: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Notifier for Recording {
        fn name(&self) -> String {
            self.label.to_string()
        }
        async fn send(&self, n: &Notification) -> Result<(), NotifyError> {
            self.seen.lock().unwrap().push(format!("{}:{}", self.label, n.title));
            if self.fail {
                Err(NotifyError::TokenRefresh("boom".into()))
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn failing_channel_does_not_block_others() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mux = NotifierMux::new()
            .with(Recording { label: "a", fail: true, seen: seen.clone() })
            .with(Recording { label: "b", fail: false, seen: seen.clone() });
        let n = Notification {
            title: "T".into(),
            content: "C".into(),
            url: None,
        };
        let report = mux.notify(&n).await;
        assert_eq!(report.delivered, vec!["b".to_string()]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "a");
        assert!(!report.all_failed());
        assert_eq!(*seen.lock().unwrap(), vec!["a:T".to_string(), "b:T".to_string()]);
    }

    #[tokio::test]
    async fn empty_mux_reports_nothing() {
        let n = Notification {
            title: "T".into(),
            content: "C".into(),
            url: None,
        };
        let report = NotifierMux::new().notify(&n).await;
        assert!(report.delivered.is_empty() && report.failed.is_empty());
    }
}
