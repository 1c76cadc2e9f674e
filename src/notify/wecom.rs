// src/notify/wecom.rs
//! WeCom (WeChat Work) application messages: token session + markdown send.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{Notification, Notifier, Session};
use crate::config::WeComConfig;
use crate::error::NotifyError;

/// errcodes meaning the access token is no longer accepted.
const TOKEN_REJECTED: [i64; 3] = [40001, 40014, 42001];

pub struct WeComNotifier {
    cfg: WeComConfig,
    client: Client,
    session: Mutex<Option<Session>>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    errcode: i64,
    #[serde(default)]
    errmsg: String,
    access_token: Option<String>,
    expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    errcode: i64,
    #[serde(default)]
    errmsg: String,
}

#[derive(Serialize)]
struct MarkdownBody {
    content: String,
}

#[derive(Serialize)]
struct MarkdownMessage<'a> {
    touser: &'a str,
    msgtype: &'static str,
    agentid: i64,
    markdown: MarkdownBody,
    enable_duplicate_check: u8,
    duplicate_check_interval: u64,
}

impl WeComNotifier {
    pub fn new(cfg: WeComConfig) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;
        Ok(Self {
            cfg,
            client,
            session: Mutex::new(None),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.cfg.api_base.trim_end_matches('/'), path)
    }

    /// Current session, refreshed when absent or past its (margin-adjusted) expiry.
    async fn ensure_session(&self, now: DateTime<Utc>) -> Result<Session, NotifyError> {
        let mut slot = self.session.lock().await;
        if let Some(s) = Session::reusable(slot.as_ref(), now) {
            return Ok(s);
        }
        let fresh = self.request_token(now).await?;
        *slot = Some(fresh.clone());
        Ok(fresh)
    }

    async fn request_token(&self, now: DateTime<Utc>) -> Result<Session, NotifyError> {
        let refresh_err = |e: reqwest::Error| NotifyError::TokenRefresh(e.to_string());
        let resp: TokenResponse = self
            .client
            .get(self.endpoint("/cgi-bin/gettoken"))
            .query(&[
                ("corpid", self.cfg.corp_id.as_str()),
                ("corpsecret", self.cfg.corp_secret.as_str()),
            ])
            .send()
            .await
            .map_err(refresh_err)?
            .error_for_status()
            .map_err(refresh_err)?
            .json()
            .await
            .map_err(refresh_err)?;

        if resp.errcode != 0 {
            return Err(NotifyError::TokenRefresh(format!(
                "errcode {}: {}",
                resp.errcode, resp.errmsg
            )));
        }
        let token = resp
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| NotifyError::TokenRefresh("response carried no access_token".into()))?;
        let expires_in = resp.expires_in.unwrap_or(0);
        debug!(target: "notify", expires_in, "wecom token refreshed");
        Session::grant(token, expires_in, now, self.cfg.token_margin_secs).ok_or_else(|| {
            NotifyError::TokenRefresh(format!("expires_in {expires_in} out of range"))
        })
    }

    async fn invalidate_session(&self) {
        *self.session.lock().await = None;
    }
}

pub(crate) fn render_markdown(n: &Notification) -> String {
    let mut md = format!("**{}**\n{}", n.title, n.content);
    if let Some(url) = &n.url {
        md.push_str(&format!("\n[View details]({url})"));
    }
    md
}

#[async_trait]
impl Notifier for WeComNotifier {
    fn name(&self) -> String {
        format!("wecom:{}", self.cfg.agent_id)
    }

    async fn send(&self, n: &Notification) -> Result<(), NotifyError> {
        let session = self.ensure_session(Utc::now()).await?;

        let payload = MarkdownMessage {
            touser: &self.cfg.to_user,
            msgtype: "markdown",
            agentid: self.cfg.agent_id,
            markdown: MarkdownBody {
                content: render_markdown(n),
            },
            enable_duplicate_check: 1,
            duplicate_check_interval: self.cfg.dedup_interval_secs,
        };

        let resp: ApiResponse = self
            .client
            .post(self.endpoint("/cgi-bin/message/send"))
            .query(&[("access_token", session.access_token.as_str())])
            .json(&payload)
            .send()
            .await?
            .json()
            .await?;

        if resp.errcode != 0 {
            if TOKEN_REJECTED.contains(&resp.errcode) {
                warn!(target: "notify", errcode = resp.errcode, "wecom rejected token, dropping session");
                self.invalidate_session().await;
            }
            return Err(NotifyError::Api {
                code: resp.errcode,
                message: resp.errmsg,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markdown_has_bold_title_and_link() {
        let n = Notification {
            title: "Visa page".into(),
            content: "Key changes:\n• something new here".into(),
            url: Some("https://example.test".into()),
        };
        assert_eq!(
            render_markdown(&n),
            "**Visa page**\nKey changes:\n• something new here\n[View details](https://example.test)"
        );
    }

    #[test]
    fn markdown_without_url_has_no_link() {
        let n = Notification {
            title: "T".into(),
            content: "C".into(),
            url: None,
        };
        assert_eq!(render_markdown(&n), "**T**\nC");
    }
}
