// src/notify/bark.rs
//! Bark push: one GET per device, title/content carried in the URL path.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;

use super::{Notification, Notifier};
use crate::config::BarkConfig;
use crate::error::NotifyError;

pub struct BarkNotifier {
    base: Url,
    device_key: String,
    sound: Option<String>,
    icon: Option<String>,
    group: Option<String>,
    level: Option<String>,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct BarkResponse {
    code: i64,
    #[serde(default)]
    message: String,
}

impl BarkNotifier {
    pub fn new(cfg: &BarkConfig, device_key: String) -> Result<Self, NotifyError> {
        let base = Url::parse(&cfg.api_base)
            .map_err(|e| NotifyError::InvalidEndpoint(format!("{}: {e}", cfg.api_base)))?;
        if base.cannot_be_a_base() {
            return Err(NotifyError::InvalidEndpoint(cfg.api_base.clone()));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;
        Ok(Self {
            base,
            device_key,
            sound: cfg.sound.clone(),
            icon: cfg.icon.clone(),
            group: cfg.group.clone(),
            level: cfg.level.clone(),
            client,
        })
    }

    /// `{base}/{key}/{title}/{content}?sound=..&icon=..&group=..&level=..&url=..`
    pub(crate) fn build_url(&self, n: &Notification) -> Result<Url, NotifyError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| NotifyError::InvalidEndpoint(self.base.to_string()))?
            .pop_if_empty()
            .push(&self.device_key)
            .push(&n.title)
            .push(&n.content);
        {
            let mut q = url.query_pairs_mut();
            let params = [
                ("sound", self.sound.as_deref()),
                ("icon", self.icon.as_deref()),
                ("group", self.group.as_deref()),
                ("level", self.level.as_deref()),
                ("url", n.url.as_deref()),
            ];
            for (k, v) in params {
                if let Some(v) = v {
                    q.append_pair(k, v);
                }
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }
        Ok(url)
    }
}

#[async_trait]
impl Notifier for BarkNotifier {
    fn name(&self) -> String {
        // Device keys are secrets; only a prefix goes to logs.
        let prefix: String = self.device_key.chars().take(4).collect();
        format!("bark:{prefix}…")
    }

    async fn send(&self, n: &Notification) -> Result<(), NotifyError> {
        let url = self.build_url(n)?;
        let resp: BarkResponse = self.client.get(url).send().await?.json().await?;
        if resp.code != 200 {
            return Err(NotifyError::Api {
                code: resp.code,
                message: resp.message,
            });
        }
        Ok(())
    }
}
