//! Identity persisted by the login flow.

use chrono::{DateTime, TimeDelta, Utc};
use tracing::warn;

use super::state::UserName;
use crate::error::{Error, Result};
use crate::storage::{ACCESS_TOKEN_KEY, DurableStore, EXPIRATION_TIME_KEY, NAME_KEY};

/// What a completed OAuth login leaves in durable storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user_name: UserName,
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

impl Credentials {
    /// Credentials whose token expires `expires_in_secs` from now.
    pub fn new(
        user_name: UserName,
        access_token: impl Into<String>,
        expires_in_secs: i64,
    ) -> Result<Self> {
        let expires_at = TimeDelta::try_seconds(expires_in_secs)
            .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
            .ok_or(Error::ExpiryOutOfRange(expires_in_secs))?;
        Ok(Self {
            user_name,
            access_token: access_token.into(),
            expires_at,
        })
    }

    /// Write all identity keys to `storage`.
    pub async fn persist(&self, storage: &dyn DurableStore) -> Result<()> {
        storage.set(NAME_KEY, self.user_name.as_str()).await?;
        storage.set(ACCESS_TOKEN_KEY, &self.access_token).await?;
        storage
            .set(EXPIRATION_TIME_KEY, &self.expires_at.to_rfc3339())
            .await?;
        Ok(())
    }
}

/// Parse a stored expiration time.
///
/// Accepts RFC3339 or milliseconds since the Unix epoch.
fn parse_expiration(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    raw.parse::<i64>()
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
}

/// The stored access token, provided it has not expired at `now`.
///
/// A token without an expiration time is treated as valid.
pub async fn current_access_token(storage: &dyn DurableStore, now: DateTime<Utc>) -> Result<String> {
    let token = storage
        .get(ACCESS_TOKEN_KEY)
        .await?
        .filter(|t| !t.is_empty())
        .ok_or(Error::NotAuthenticated)?;

    if let Some(raw) = storage.get(EXPIRATION_TIME_KEY).await? {
        let Some(expires_at) = parse_expiration(&raw) else {
            warn!(name: "session.expiration.invalid", value = %raw, "Unreadable token expiration");
            return Err(Error::NotAuthenticated);
        };
        if expires_at <= now {
            return Err(Error::SessionExpired(expires_at));
        }
    }

    Ok(token)
}
