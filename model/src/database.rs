use crate::{SyncStatus, TradeDaySync, TradeEvent};
use chrono::{DateTime, NaiveDate, Utc};
use std::error::Error;

/// Outcome of one upsert batch.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StoreOutcome {
    /// Rows newly inserted.
    pub inserted: usize,
    /// Existing rows overwritten from a newer upstream observation.
    pub updated: usize,
}

/// Parameters for the bounded, closed-rows-only trade listing.
#[derive(Clone, Debug)]
pub struct TradeEventQuery {
    /// Account scope.
    pub account_id: i64,
    /// Maximum rows returned (newest first).
    pub limit: i64,
    /// Inclusive lower bound on the trade timestamp.
    pub start: Option<DateTime<Utc>>,
    /// Inclusive upper bound on the trade timestamp.
    pub end: Option<DateTime<Utc>>,
    /// Case-insensitive substring match on the displayed symbol.
    pub symbol_query: Option<String>,
}

/// Read access to locally mirrored trade events.
///
/// Every read excludes rows whose raw payload marks them voided.
pub trait TradeEventRead {
    /// Whether any non-voided event exists for the account.
    fn has_local_trades(&mut self, account_id: i64) -> Result<bool, Box<dyn Error>>;

    /// Most recent non-voided trade timestamp for the account.
    fn latest_trade_timestamp(
        &mut self,
        account_id: i64,
    ) -> Result<Option<DateTime<Utc>>, Box<dyn Error>>;

    /// Earliest non-voided trade timestamp for the account.
    fn earliest_trade_timestamp(
        &mut self,
        account_id: i64,
    ) -> Result<Option<DateTime<Utc>>, Box<dyn Error>>;

    /// Bounded listing of closing rows, newest first.
    fn list_closed(&mut self, query: &TradeEventQuery) -> Result<Vec<TradeEvent>, Box<dyn Error>>;

    /// All non-voided events in a range, oldest first, for the metrics engine.
    fn for_metrics(
        &mut self,
        account_id: i64,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<TradeEvent>, Box<dyn Error>>;

    /// Non-voided rows whose timestamp falls on the given UTC date.
    fn count_for_day(&mut self, account_id: i64, day: NaiveDate) -> Result<i64, Box<dyn Error>>;
}

/// Write access to locally mirrored trade events.
pub trait TradeEventWrite {
    /// Upsert a batch of normalized events in one transaction.
    ///
    /// Dedupe is two-tier: `(account, source_trade_id)` when the source id
    /// is present, `(account, order_id, timestamp)` otherwise. Matches
    /// overwrite the mutable fields; `source_trade_id` and `status` are
    /// only overwritten by non-empty incoming values.
    fn store_events(&mut self, events: &[TradeEvent]) -> Result<StoreOutcome, Box<dyn Error>>;
}

/// Read access to day-sync bookkeeping.
pub trait DaySyncRead {
    /// The day-sync record for an account and UTC date, if one exists.
    fn for_day(
        &mut self,
        account_id: i64,
        day: NaiveDate,
    ) -> Result<Option<TradeDaySync>, Box<dyn Error>>;
}

/// Write access to day-sync bookkeeping.
pub trait DaySyncWrite {
    /// Create or refresh the day-sync record, stamping `last_synced_at`.
    fn upsert_day(
        &mut self,
        account_id: i64,
        day: NaiveDate,
        status: SyncStatus,
        row_count: i64,
    ) -> Result<TradeDaySync, Box<dyn Error>>;
}

/// Database trait with the accessors needed by the sync and analytics core.
///
/// The trait abstracts the concrete store so orchestration code can run
/// against the SQLite implementation or a test double.
pub trait DatabaseFactory {
    /// Returns a reader for trade event data.
    fn trade_event_read(&self) -> Box<dyn TradeEventRead>;
    /// Returns a writer for trade event data.
    fn trade_event_write(&self) -> Box<dyn TradeEventWrite>;
    /// Returns a reader for day-sync bookkeeping.
    fn day_sync_read(&self) -> Box<dyn DaySyncRead>;
    /// Returns a writer for day-sync bookkeeping.
    fn day_sync_write(&self) -> Box<dyn DaySyncWrite>;
}
