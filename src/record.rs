// src/record.rs
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One observation of the monitored page. This is also the persisted state document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub title: String,
    #[serde(rename = "date")]
    pub published_date: String,
    /// Normalized text: trimmed, non-empty lines joined by `\n`.
    #[serde(rename = "content")]
    pub body_text: String,
    #[serde(rename = "url")]
    pub source_url: String,
    #[serde(rename = "hash")]
    pub fingerprint: String,
}

impl ContentRecord {
    /// Builds a record; the fingerprint is always derived from `body_text`.
    pub fn new(
        title: impl Into<String>,
        published_date: impl Into<String>,
        body_text: impl Into<String>,
        source_url: impl Into<String>,
    ) -> Self {
        let body_text = body_text.into();
        let fingerprint = fingerprint(&body_text);
        Self {
            title: title.into(),
            published_date: published_date.into(),
            body_text,
            source_url: source_url.into(),
            fingerprint,
        }
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.body_text.lines()
    }
}

/// Hex SHA-256 of the normalized body text.
pub fn fingerprint(body_text: &str) -> String {
    let digest = Sha256::digest(body_text.as_bytes());
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest.iter() {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}
