use std::{fmt, time::Duration};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now())
    }

    pub fn from_epoch_secs(epoch_secs: i64) -> Option<Self> {
        DateTime::from_timestamp(epoch_secs, 0).map(Self)
    }

    pub fn as_epoch_secs(self) -> i64 {
        self.0.timestamp()
    }

    pub fn checked_add(self, duration: Duration) -> Option<Self> {
        let chrono_duration = chrono::Duration::from_std(duration).ok()?;
        self.0.checked_add_signed(chrono_duration).map(Self)
    }

    fn format_fixed(self) -> String {
        self.0.format(EXPIRY_FORMAT).to_string()
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

const EXPIRY_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Access-token expiry as the SSO verify endpoint reports it: a fixed-width,
/// zero-padded UTC string (`YYYY-MM-DDTHH:MM:SSZ`). The format makes
/// lexicographic comparison equivalent to chronological comparison, which is
/// also why the token table can select "latest" with a plain ORDER BY.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenExpiry(String);

impl TokenExpiry {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn from_timestamp(at: Timestamp) -> Self {
        Self(at.format_fixed())
    }

    /// Closed boundary: a token whose expiry equals the current instant is
    /// already expired.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        now.format_fixed().as_str() >= self.0.as_str()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TokenExpiry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::{Timestamp, TokenExpiry};

    fn ts(epoch_secs: i64) -> Timestamp {
        Timestamp::from_epoch_secs(epoch_secs).expect("valid epoch seconds")
    }

    #[test]
    fn expiry_formats_fixed_width_utc() {
        let expiry = TokenExpiry::from_timestamp(ts(0));
        assert_eq!(expiry.as_str(), "1970-01-01T00:00:00Z");
    }

    #[test]
    fn expiry_boundary_is_closed() {
        let at = ts(1_700_000_000);
        let expiry = TokenExpiry::from_timestamp(at);

        assert!(expiry.is_expired(at));
        assert!(!expiry.is_expired(ts(1_699_999_999)));
        assert!(expiry.is_expired(ts(1_700_000_001)));
    }

    #[test]
    fn expiry_ordering_matches_chronology() {
        let earlier = TokenExpiry::from_timestamp(ts(1_600_000_000));
        let later = TokenExpiry::from_timestamp(ts(1_700_000_000));
        assert!(earlier < later);
    }
}
