//! Windowed account refresh: plan windows, fetch chunks, upsert.

use crate::config::SyncConfig;
use crate::sync_planner::{build_sync_windows, iter_time_chunks};
use crate::validators::{validate_account_id, validate_time_range};
use chrono::{DateTime, Utc};
use model::{DatabaseFactory, TradeHistoryProvider};
use serde::Serialize;
use std::error::Error;
use tracing::debug;

/// Counters for one refresh run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct RefreshReport {
    /// Events received from the gateway across all chunks.
    pub fetched_count: usize,
    /// New rows stored.
    pub inserted_count: usize,
    /// Existing rows overwritten.
    pub updated_count: usize,
}

/// Pull the windows a refresh needs and upsert them chunk by chunk.
///
/// Each chunk commits independently, so a mid-sync failure keeps earlier
/// chunks and the error propagates to the caller.
pub(crate) fn refresh_account_trades(
    factory: &dyn DatabaseFactory,
    provider: &dyn TradeHistoryProvider,
    config: &SyncConfig,
    account_id: i64,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Result<RefreshReport, Box<dyn Error>> {
    validate_account_id(account_id)?;
    validate_time_range(start, end)?;

    let now = Utc::now();
    let end_utc = end.unwrap_or(now);

    let (latest, earliest) = if start.is_none() {
        let mut reader = factory.trade_event_read();
        (
            reader.latest_trade_timestamp(account_id)?,
            reader.earliest_trade_timestamp(account_id)?,
        )
    } else {
        (None, None)
    };

    let windows = build_sync_windows(
        start,
        end_utc,
        now,
        latest,
        earliest,
        config.initial_lookback_days,
    )?;

    let mut writer = factory.trade_event_write();
    let mut report = RefreshReport::default();

    for (window_start, window_end) in windows {
        for (chunk_start, chunk_end) in
            iter_time_chunks(window_start, window_end, config.sync_chunk_days)
        {
            let events =
                provider.fetch_trade_history(account_id, chunk_start, Some(chunk_end), None, None)?;
            report.fetched_count = report.fetched_count.saturating_add(events.len());
            let outcome = writer.store_events(&events)?;
            report.inserted_count = report.inserted_count.saturating_add(outcome.inserted);
            report.updated_count = report.updated_count.saturating_add(outcome.updated);
        }
    }

    debug!(
        account_id,
        fetched = report.fetched_count,
        inserted = report.inserted_count,
        updated = report.updated_count,
        "account refresh finished"
    );
    Ok(report)
}
