// src/config/mod.rs
//! Monitor configuration: built once at startup, then passed by reference.

pub mod notify;

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use notify::{BarkConfig, NotifyConfig, WeComConfig};

pub const ENV_CONFIG_PATH: &str = "MONITOR_CONFIG_PATH";
pub const DEFAULT_TOML_PATH: &str = "config/monitor.toml";
pub const DEFAULT_JSON_PATH: &str = "config/monitor.json";

pub const DEFAULT_TARGET_URL: &str =
    "https://theterritory.com.au/migrate/migrate-to-work/northern-territory-government-visa-nomination";

fn default_target_url() -> String {
    DEFAULT_TARGET_URL.to_string()
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string()
}
fn default_check_interval() -> u64 {
    300
}
fn default_request_timeout() -> u64 {
    20
}
fn default_storage_file() -> PathBuf {
    PathBuf::from("last_state.json")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_target_url")]
    pub target_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_storage_file")]
    pub storage_file: PathBuf,
    /// Sent with every page request, on top of the user agent.
    #[serde(default)]
    pub extra_headers: BTreeMap<String, String>,
    /// Prometheus scrape address; no exporter when absent.
    #[serde(default)]
    pub metrics_addr: Option<SocketAddr>,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub extract: ExtractConfig,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            target_url: default_target_url(),
            user_agent: default_user_agent(),
            check_interval_secs: default_check_interval(),
            request_timeout_secs: default_request_timeout(),
            storage_file: default_storage_file(),
            extra_headers: BTreeMap::new(),
            metrics_addr: None,
            retry: RetryConfig::default(),
            extract: ExtractConfig::default(),
            log: LogConfig::default(),
            notify: NotifyConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub backoff_factor: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 10,
            initial_delay_ms: 1_000,
            backoff_factor: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Tried in order; first match is the content region.
    pub content_selectors: Vec<String>,
    /// Tried in order; first non-empty value is the published date.
    pub date_selectors: Vec<String>,
    pub default_title: String,
    pub max_lines: usize,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            content_selectors: vec!["main article".into(), ".content-wrapper".into()],
            date_selectors: vec![
                "time[datetime]".into(),
                ".published-date".into(),
                r#"meta[property="article:published_time"]"#.into(),
                "span.date".into(),
            ],
            default_title: "Northern Territory visa nomination".into(),
            max_lines: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub file: PathBuf,
    pub max_size_bytes: u64,
    pub backup_count: usize,
    /// debug | info | warning | error | critical
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from("visa_monitor.log"),
            max_size_bytes: 10 * 1024 * 1024,
            backup_count: 3,
            level: "info".into(),
        }
    }
}

impl MonitorConfig {
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Load from an explicit path. TOML or JSON, picked by extension with fallback.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading monitor config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let mut cfg = parse_config(&content, &ext)
            .with_context(|| format!("parsing monitor config {}", path.display()))?;
        cfg.resolve_secrets()?;
        cfg.validate()
            .with_context(|| format!("validating monitor config {}", path.display()))?;
        Ok(cfg)
    }

    /// Load using env var + fallbacks:
    /// 1) $MONITOR_CONFIG_PATH
    /// 2) config/monitor.toml
    /// 3) config/monitor.json
    /// 4) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from_file(&pb);
            }
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
        for candidate in [DEFAULT_TOML_PATH, DEFAULT_JSON_PATH] {
            let p = PathBuf::from(candidate);
            if p.exists() {
                return Self::load_from_file(&p);
            }
        }
        let mut cfg = Self::default();
        cfg.resolve_secrets()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn resolve_secrets(&mut self) -> Result<()> {
        if let Some(wecom) = self.notify.wecom.as_mut() {
            wecom.resolve_secret()?;
        }
        if let Some(bark) = self.notify.bark.as_mut() {
            bark.resolve_device_keys()?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let url = reqwest::Url::parse(&self.target_url)
            .with_context(|| format!("target_url is not a valid URL: {}", self.target_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("target_url must be http(s), got {}", url.scheme());
        }
        if self.check_interval_secs == 0 {
            bail!("check_interval_secs must be > 0");
        }
        if self.extract.max_lines == 0 {
            bail!("extract.max_lines must be > 0");
        }
        if self.extract.content_selectors.is_empty() {
            bail!("extract.content_selectors must not be empty");
        }
        if self.retry.backoff_factor == 0 {
            bail!("retry.backoff_factor must be >= 1");
        }
        for sel in self
            .extract
            .content_selectors
            .iter()
            .chain(&self.extract.date_selectors)
        {
            crate::extract::compile(sel)?;
        }
        Ok(())
    }
}

fn parse_config(s: &str, hint_ext: &str) -> Result<MonitorConfig> {
    if hint_ext == "json" {
        return serde_json::from_str(s).context("invalid JSON config");
    }
    match toml::from_str::<MonitorConfig>(s) {
        Ok(cfg) => Ok(cfg),
        Err(toml_err) => match serde_json::from_str::<MonitorConfig>(s) {
            Ok(cfg) => Ok(cfg),
            Err(_) => Err(anyhow!(toml_err).context("invalid TOML config")),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_original_defaults() {
        let cfg = parse_config("", "toml").unwrap();
        assert_eq!(cfg.check_interval_secs, 300);
        assert_eq!(cfg.request_timeout_secs, 20);
        assert_eq!(cfg.retry.max_retries, 10);
        assert_eq!(cfg.retry.initial_delay_ms, 1_000);
        assert_eq!(cfg.retry.backoff_factor, 2);
        assert_eq!(cfg.extract.max_lines, 20);
        assert_eq!(cfg.log.backup_count, 3);
        assert!(cfg.notify.wecom.is_none());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn json_fallback_is_accepted() {
        let cfg = parse_config(r#"{"check_interval_secs": 60}"#, "").unwrap();
        assert_eq!(cfg.check_interval_secs, 60);
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut cfg = MonitorConfig::default();
        cfg.target_url = "ftp://example.com".into();
        assert!(cfg.validate().is_err());

        let mut cfg = MonitorConfig::default();
        cfg.check_interval_secs = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = MonitorConfig::default();
        cfg.extract.content_selectors.clear();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn unparsable_selectors_are_rejected() {
        let mut cfg = MonitorConfig::default();
        cfg.extract.content_selectors.push("div[".into());
        let err = cfg.validate().unwrap_err().to_string();
        assert!(err.contains("div["), "{err}");

        let mut cfg = MonitorConfig::default();
        cfg.extract.date_selectors = vec!["::nope".into()];
        assert!(cfg.validate().is_err());
    }
}
