use chrono::{DateTime, Duration, Utc};
use model::payload::first_value;
use model::time::parse_timestamp_value;
use serde_json::Value;
use std::sync::Mutex;

const EXPIRY_KEYS: [&str; 6] = [
    "expiration",
    "expiresAt",
    "expires",
    "expiry",
    "expiresIn",
    "expiresInSeconds",
];

const EPOCH_MILLIS_FLOOR: i64 = 1_000_000_000_000;
const EPOCH_SECONDS_FLOOR: i64 = 1_000_000_000;

fn safety_window() -> Duration {
    Duration::seconds(60)
}

fn default_lifetime() -> Duration {
    Duration::minutes(20)
}

#[derive(Clone, Debug)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

/// Session-token cache shared by every clone of a client.
///
/// A token is considered usable while it is more than the safety window
/// away from expiry, so near-expiry tokens never race an in-flight call.
#[derive(Debug, Default)]
pub(crate) struct TokenCache {
    inner: Mutex<Option<CachedToken>>,
}

impl TokenCache {
    pub(crate) fn new() -> Self {
        TokenCache {
            inner: Mutex::new(None),
        }
    }

    /// The cached token, when it is still comfortably within its lifetime.
    pub(crate) fn fresh_token(&self, now: DateTime<Utc>) -> Option<String> {
        let guard = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.as_ref().and_then(|cached| {
            let deadline = cached.expires_at.checked_sub_signed(safety_window())?;
            if deadline > now {
                Some(cached.token.clone())
            } else {
                None
            }
        })
    }

    pub(crate) fn store(&self, token: String, expires_at: DateTime<Utc>) {
        let mut guard = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Some(CachedToken { token, expires_at });
    }

    /// Forget the cached token; the next authenticated call logs in again.
    pub(crate) fn clear(&self) {
        let mut guard = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = None;
    }
}

/// Interpret the login response's expiry field.
///
/// Accepts absolute ISO timestamps, epoch seconds, epoch milliseconds and
/// relative "expires in N seconds" values; a missing or unreadable field
/// defaults to twenty minutes from now.
pub(crate) fn parse_token_expiry(payload: &Value, now: DateTime<Utc>) -> DateTime<Utc> {
    let fallback = now
        .checked_add_signed(default_lifetime())
        .unwrap_or(now);

    let Some(raw) = first_value(payload, &EXPIRY_KEYS) else {
        return fallback;
    };

    if let Some(numeric) = raw.as_i64() {
        if numeric > EPOCH_MILLIS_FLOOR {
            return DateTime::<Utc>::from_timestamp_millis(numeric).unwrap_or(fallback);
        }
        if numeric > EPOCH_SECONDS_FLOOR {
            return DateTime::<Utc>::from_timestamp(numeric, 0).unwrap_or(fallback);
        }
        return now
            .checked_add_signed(Duration::seconds(numeric.max(0)))
            .unwrap_or(fallback);
    }

    if raw.is_string() {
        if let Some(parsed) = parse_timestamp_value(raw) {
            return parsed;
        }
    }

    fallback
}
