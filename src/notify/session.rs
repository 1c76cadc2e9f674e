// src/notify/session.rs
use chrono::{DateTime, Duration as ChronoDuration, Utc};

/// Cached access token of a token-session channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Token granted at `now`, valid `expires_in` seconds by the server's clock.
    /// The session is considered expired `margin` seconds early.
    /// Negative inputs are treated as 0. `None` when the expiry is not
    /// representable as a timestamp.
    pub fn grant(
        access_token: String,
        expires_in: i64,
        now: DateTime<Utc>,
        margin: i64,
    ) -> Option<Self> {
        let lifetime = expires_in.max(0).saturating_sub(margin.max(0)).max(0);
        let expires_at = ChronoDuration::try_seconds(lifetime)
            .and_then(|d| now.checked_add_signed(d))?;
        Some(Self {
            access_token,
            issued_at: now,
            expires_at,
        })
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    /// The session to reuse at `now`, if any. Does not mutate anything.
    pub fn reusable(current: Option<&Session>, now: DateTime<Utc>) -> Option<Session> {
        current.filter(|s| s.is_valid_at(now)).cloned()
    }
}
