// src/config/notify.rs
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::env;

pub const ENV_WECOM_SECRET: &str = "WECOM_CORP_SECRET";
pub const ENV_BARK_KEYS: &str = "BARK_DEVICE_KEYS";

/// Channels are enabled by presence of their section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotifyConfig {
    #[serde(default)]
    pub wecom: Option<WeComConfig>,
    #[serde(default)]
    pub bark: Option<BarkConfig>,
}

fn default_to_user() -> String {
    "@all".to_string()
}
fn default_dedup_interval() -> u64 {
    1800
}
fn default_token_margin() -> i64 {
    300
}
fn default_wecom_base() -> String {
    "https://qyapi.weixin.qq.com".to_string()
}
fn default_wecom_timeout() -> u64 {
    15
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeComConfig {
    pub corp_id: String,
    /// "ENV" means: read from WECOM_CORP_SECRET
    pub corp_secret: String,
    pub agent_id: i64,
    #[serde(default = "default_to_user")]
    pub to_user: String,
    /// Server-side suppression window for identical messages.
    #[serde(default = "default_dedup_interval")]
    pub dedup_interval_secs: u64,
    /// Tokens are refreshed this long before the server says they expire.
    #[serde(default = "default_token_margin")]
    pub token_margin_secs: i64,
    #[serde(default = "default_wecom_base")]
    pub api_base: String,
    #[serde(default = "default_wecom_timeout")]
    pub timeout_secs: u64,
}

impl WeComConfig {
    pub(crate) fn resolve_secret(&mut self) -> Result<()> {
        if self.corp_secret.trim().eq_ignore_ascii_case("env") {
            self.corp_secret = env::var(ENV_WECOM_SECRET)
                .map_err(|_| anyhow!("Missing {ENV_WECOM_SECRET} env var"))?;
        }
        Ok(())
    }
}

fn default_bark_base() -> String {
    "https://api.day.app".to_string()
}
fn default_sound() -> Option<String> {
    Some("minuet".into())
}
fn default_group() -> Option<String> {
    Some("visa_monitor".into())
}
fn default_level() -> Option<String> {
    Some("timeSensitive".into())
}
fn default_bark_timeout() -> u64 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BarkConfig {
    /// One channel per key. Empty list means: read BARK_DEVICE_KEYS (comma-separated).
    #[serde(default)]
    pub device_keys: Vec<String>,
    #[serde(default = "default_bark_base")]
    pub api_base: String,
    #[serde(default = "default_sound")]
    pub sound: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default = "default_group")]
    pub group: Option<String>,
    #[serde(default = "default_level")]
    pub level: Option<String>,
    #[serde(default = "default_bark_timeout")]
    pub timeout_secs: u64,
}

impl BarkConfig {
    pub(crate) fn resolve_device_keys(&mut self) -> Result<()> {
        if self.device_keys.is_empty() {
            let raw = env::var(ENV_BARK_KEYS)
                .map_err(|_| anyhow!("bark enabled without device_keys and {ENV_BARK_KEYS}"))?;
            self.device_keys = split_keys(&raw);
        }
        self.device_keys.retain(|k| !k.trim().is_empty());
        if self.device_keys.is_empty() {
            return Err(anyhow!("bark enabled but no device keys configured"));
        }
        Ok(())
    }
}

fn split_keys(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_keys_trims_and_drops_empty() {
        assert_eq!(split_keys(" a, ,b ,"), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn wecom_defaults_follow_service_limits() {
        let cfg: WeComConfig =
            toml::from_str("corp_id = \"c\"\ncorp_secret = \"s\"\nagent_id = 1000002").unwrap();
        assert_eq!(cfg.to_user, "@all");
        assert_eq!(cfg.dedup_interval_secs, 1800);
        assert_eq!(cfg.token_margin_secs, 300);
    }
}
