use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use std::str::FromStr;

/// Completeness of a single synced trade day.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// The day may be missing rows: pagination truncated, or the day is
    /// still open (today never completes).
    Partial,
    /// A full, non-truncated pagination finished and the caller permitted
    /// completion.
    Complete,
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncStatus::Partial => write!(f, "partial"),
            SyncStatus::Complete => write!(f, "complete"),
        }
    }
}

/// Error returned when parsing an invalid sync status.
#[derive(Debug, PartialEq)]
pub struct SyncStatusParseError;

impl FromStr for SyncStatus {
    type Err = SyncStatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "partial" => Ok(SyncStatus::Partial),
            "complete" => Ok(SyncStatus::Complete),
            _ => Err(SyncStatusParseError),
        }
    }
}

/// Per-account, per-UTC-date bookkeeping for the day-sync hot path.
#[derive(Clone, Debug, PartialEq)]
pub struct TradeDaySync {
    /// Account this record tracks.
    pub account_id: i64,
    /// UTC calendar date.
    pub trade_date: NaiveDate,
    /// Whether the day's events are fully cached.
    pub sync_status: SyncStatus,
    /// When the day was last fetched from the gateway.
    pub last_synced_at: DateTime<Utc>,
    /// Non-voided rows stored for the day at last sync.
    pub row_count: i64,
    /// When the record was last written.
    pub updated_at: DateTime<Utc>,
}

impl TradeDaySync {
    /// Whether the record is complete and was synced within `max_age`.
    pub fn is_fresh_complete(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        self.sync_status == SyncStatus::Complete
            && now.signed_duration_since(self.last_synced_at) <= max_age
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn sync_status_parse_roundtrip() {
        for status in [SyncStatus::Partial, SyncStatus::Complete] {
            let parsed: SyncStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("done".parse::<SyncStatus>().is_err());
    }

    #[test]
    fn freshness_requires_complete_and_recent() {
        let now = Utc.with_ymd_and_hms(2026, 2, 20, 12, 0, 0).unwrap();
        let record = TradeDaySync {
            account_id: 1,
            trade_date: NaiveDate::from_ymd_opt(2026, 2, 19).unwrap(),
            sync_status: SyncStatus::Complete,
            last_synced_at: now - Duration::minutes(30),
            row_count: 10,
            updated_at: now,
        };

        assert!(record.is_fresh_complete(now, Duration::minutes(180)));
        assert!(!record.is_fresh_complete(now, Duration::minutes(15)));

        let partial = TradeDaySync {
            sync_status: SyncStatus::Partial,
            ..record
        };
        assert!(!partial.is_fresh_complete(now, Duration::minutes(180)));
    }
}
