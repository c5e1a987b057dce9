//! Single-day hot path: serve one UTC calendar date from cache when the
//! bookkeeping says it is complete and fresh, otherwise page the whole day
//! from the gateway and record how far we got.

use crate::config::SyncConfig;
use crate::services::trade_sync::{refresh_account_trades, RefreshReport};
use crate::validators::{validate_account_id, validate_time_range};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use model::time::as_utc;
use model::{
    DatabaseFactory, SyncStatus, TradeDaySync, TradeEvent, TradeHistoryProvider, UpstreamError,
};
use serde::Serialize;
use std::collections::HashSet;
use std::error::Error;
use tracing::warn;

/// Pagination stops after this many pages and reports truncation; the
/// gateway has no cursor, so offset paging under churn cannot be trusted
/// to terminate on its own.
const MAX_DAY_SYNC_PAGES: usize = 200;

/// Counters for one day-sync run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DaySyncReport {
    /// The UTC date that was synced or served.
    pub trade_date: NaiveDate,
    /// Whether the cached day satisfied the request without a fetch.
    pub cache_hit: bool,
    /// Events received across the page walk (before dedupe).
    pub fetched_count: usize,
    /// New rows stored.
    pub inserted_count: usize,
    /// Existing rows overwritten.
    pub updated_count: usize,
    /// Status recorded for the day.
    pub status: SyncStatus,
    /// Whether pagination was cut short.
    pub truncated: bool,
}

/// What a cache-ensure request ended up doing.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum EnsureOutcome {
    /// Same-UTC-date request went through the day-sync hot path.
    DaySync(DaySyncReport),
    /// A windowed refresh ran.
    Refreshed(RefreshReport),
    /// The local cache already satisfied the request.
    CacheHit,
}

enum DayAction {
    CacheHit(TradeDaySync),
    Fetch { allow_complete: bool },
}

struct DayPages {
    events: Vec<TradeEvent>,
    truncated: bool,
}

/// Make sure the local cache can answer a request for the given range.
///
/// Requests whose start and end fall on the same UTC calendar date take
/// the day-sync path; anything else refreshes through the window planner
/// when forced or when the account has no local data yet.
pub(crate) fn ensure_trade_cache_for_request(
    factory: &dyn DatabaseFactory,
    provider: &dyn TradeHistoryProvider,
    config: &SyncConfig,
    account_id: i64,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    refresh: bool,
) -> Result<EnsureOutcome, Box<dyn Error>> {
    validate_account_id(account_id)?;
    validate_time_range(start, end)?;

    if let (Some(start), Some(end)) = (start, end) {
        if start.date_naive() == end.date_naive() {
            let day = start.date_naive();
            let cached = factory.day_sync_read().for_day(account_id, day)?;
            let action = decide_day_action(
                Utc::now(),
                day,
                cached,
                refresh,
                config.yesterday_refresh_minutes,
            );
            return match action {
                DayAction::CacheHit(record) => Ok(EnsureOutcome::DaySync(DaySyncReport {
                    trade_date: day,
                    cache_hit: true,
                    fetched_count: 0,
                    inserted_count: 0,
                    updated_count: 0,
                    status: record.sync_status,
                    truncated: false,
                })),
                DayAction::Fetch { allow_complete } => {
                    sync_trade_day(factory, provider, config, account_id, day, allow_complete)
                        .map(EnsureOutcome::DaySync)
                }
            };
        }
    }

    if refresh || !factory.trade_event_read().has_local_trades(account_id)? {
        return refresh_account_trades(factory, provider, config, account_id, start, end)
            .map(EnsureOutcome::Refreshed);
    }
    Ok(EnsureOutcome::CacheHit)
}

/// The day-sync decision table.
///
/// Today always fetches and may only mark partial. Yesterday serves from
/// cache while its complete record is younger than the refresh budget.
/// Older days serve from cache once complete. An explicit refresh forces
/// a fetch for any day.
fn decide_day_action(
    now: DateTime<Utc>,
    day: NaiveDate,
    cached: Option<TradeDaySync>,
    refresh: bool,
    refresh_minutes: i64,
) -> DayAction {
    let today = now.date_naive();
    if day == today {
        // Today is never complete: rows are still arriving.
        return DayAction::Fetch {
            allow_complete: false,
        };
    }
    if refresh {
        return DayAction::Fetch {
            allow_complete: true,
        };
    }

    match cached {
        Some(record) if record.sync_status == SyncStatus::Complete => {
            let is_yesterday = today.pred_opt() == Some(day);
            if is_yesterday
                && !record.is_fresh_complete(now, Duration::minutes(refresh_minutes))
            {
                DayAction::Fetch {
                    allow_complete: true,
                }
            } else {
                DayAction::CacheHit(record)
            }
        }
        _ => DayAction::Fetch {
            allow_complete: true,
        },
    }
}

/// Page one UTC day, upsert the result and record the day-sync row.
fn sync_trade_day(
    factory: &dyn DatabaseFactory,
    provider: &dyn TradeHistoryProvider,
    config: &SyncConfig,
    account_id: i64,
    day: NaiveDate,
    allow_complete: bool,
) -> Result<DaySyncReport, Box<dyn Error>> {
    let pages = match fetch_trade_day_all_pages(provider, account_id, day, config.day_sync_limit) {
        Ok(pages) => pages,
        Err(err) => {
            mark_partial_best_effort(factory, account_id, day);
            return Err(Box::new(err));
        }
    };

    let fetched_count = pages.events.len();
    let outcome = match factory.trade_event_write().store_events(&pages.events) {
        Ok(outcome) => outcome,
        Err(err) => {
            mark_partial_best_effort(factory, account_id, day);
            return Err(err);
        }
    };

    let row_count = factory.trade_event_read().count_for_day(account_id, day)?;
    let status = if allow_complete && !pages.truncated {
        SyncStatus::Complete
    } else {
        SyncStatus::Partial
    };
    let record = factory
        .day_sync_write()
        .upsert_day(account_id, day, status, row_count)?;

    Ok(DaySyncReport {
        trade_date: day,
        cache_hit: false,
        fetched_count,
        inserted_count: outcome.inserted,
        updated_count: outcome.updated,
        status: record.sync_status,
        truncated: pages.truncated,
    })
}

/// Page through one UTC day until the gateway runs dry or pagination
/// proves unstable.
///
/// The gateway has no opaque cursor; a full page at a non-zero offset
/// whose identity signature matches a page we already saw means offset
/// paging is returning the same rows under churn, so we stop and report
/// truncation rather than loop.
fn fetch_trade_day_all_pages(
    provider: &dyn TradeHistoryProvider,
    account_id: i64,
    day: NaiveDate,
    page_limit: u32,
) -> Result<DayPages, UpstreamError> {
    let day_start = day
        .and_hms_opt(0, 0, 0)
        .map(as_utc)
        .ok_or_else(|| UpstreamError::message("invalid trade date"))?;
    let day_end = day_start
        .checked_add_signed(Duration::days(1))
        .and_then(|next| next.checked_sub_signed(Duration::microseconds(1)))
        .ok_or_else(|| UpstreamError::message("invalid trade date"))?;

    let page_size = usize::try_from(page_limit).unwrap_or(usize::MAX);
    let mut seen_signatures: HashSet<Vec<String>> = HashSet::new();
    let mut collected: Vec<TradeEvent> = Vec::new();
    let mut truncated = false;
    let mut offset: u32 = 0;

    for page_index in 0..=MAX_DAY_SYNC_PAGES {
        if page_index == MAX_DAY_SYNC_PAGES {
            warn!(
                account_id,
                %day,
                "day sync hit the page ceiling; treating the day as truncated"
            );
            truncated = true;
            break;
        }

        let events = provider.fetch_trade_history(
            account_id,
            day_start,
            Some(day_end),
            Some(page_limit),
            Some(offset),
        )?;
        let page_len = events.len();
        let signature: Vec<String> = events.iter().map(TradeEvent::identity_key).collect();

        if page_len == page_size && offset > 0 && seen_signatures.contains(&signature) {
            warn!(
                account_id,
                %day,
                offset,
                "day sync pagination returned a repeated page; treating the day as truncated"
            );
            truncated = true;
            break;
        }
        seen_signatures.insert(signature);
        collected.extend(events);

        if page_len < page_size {
            break;
        }
        offset = offset.saturating_add(page_limit);
    }

    let mut seen_keys: HashSet<String> = HashSet::new();
    let events: Vec<TradeEvent> = collected
        .into_iter()
        .filter(|event| seen_keys.insert(event.identity_key()))
        .collect();

    Ok(DayPages { events, truncated })
}

fn mark_partial_best_effort(factory: &dyn DatabaseFactory, account_id: i64, day: NaiveDate) {
    let row_count = factory
        .trade_event_read()
        .count_for_day(account_id, day)
        .unwrap_or(0);
    if let Err(err) = factory
        .day_sync_write()
        .upsert_day(account_id, day, SyncStatus::Partial, row_count)
    {
        warn!(
            account_id,
            %day,
            "failed to record partial day sync after an aborted fetch: {err}"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use db_sqlite::SqliteDatabase;
    use model::{AccountSummary, TradePnl, TradeSide};
    use rust_decimal_macros::dec;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct StubProvider {
        pages: Mutex<VecDeque<Result<Vec<TradeEvent>, UpstreamError>>>,
        calls: Mutex<Vec<(DateTime<Utc>, Option<DateTime<Utc>>, Option<u32>, Option<u32>)>>,
    }

    impl StubProvider {
        fn new(pages: Vec<Result<Vec<TradeEvent>, UpstreamError>>) -> Self {
            StubProvider {
                pages: Mutex::new(pages.into_iter().collect()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        fn last_call(&self) -> (DateTime<Utc>, Option<DateTime<Utc>>, Option<u32>, Option<u32>) {
            self.calls.lock().unwrap().last().cloned().unwrap()
        }
    }

    impl TradeHistoryProvider for StubProvider {
        fn list_accounts(&self) -> Result<Vec<AccountSummary>, UpstreamError> {
            Ok(Vec::new())
        }

        fn fetch_trade_history(
            &self,
            _account_id: i64,
            start: DateTime<Utc>,
            end: Option<DateTime<Utc>>,
            limit: Option<u32>,
            offset: Option<u32>,
        ) -> Result<Vec<TradeEvent>, UpstreamError> {
            self.calls.lock().unwrap().push((start, end, limit, offset));
            self.pages
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    fn event(order_id: &str, source: &str, when: &str) -> TradeEvent {
        TradeEvent::new(
            123,
            "CON.F.US.MGC.Z25".to_string(),
            Some("MGC".to_string()),
            TradeSide::Buy,
            dec!(1),
            dec!(4245.8),
            model::time::parse_timestamp(when).unwrap(),
            dec!(4.65),
            TradePnl::Closed(dec!(825)),
            order_id.to_string(),
            Some(source.to_string()),
            None,
            None,
        )
    }

    fn small_config() -> SyncConfig {
        SyncConfig {
            day_sync_limit: 2,
            ..SyncConfig::default()
        }
    }

    fn yesterday_at(hour: u32) -> DateTime<Utc> {
        let now = Utc::now();
        let yesterday = now.date_naive().pred_opt().unwrap();
        as_utc(yesterday.and_hms_opt(hour, 0, 0).unwrap())
    }

    fn run_day(
        db: &SqliteDatabase,
        provider: &StubProvider,
        config: &SyncConfig,
        at: DateTime<Utc>,
        refresh: bool,
    ) -> EnsureOutcome {
        ensure_trade_cache_for_request(db, provider, config, 123, Some(at), Some(at), refresh)
            .unwrap()
    }

    #[test]
    fn today_fetches_and_only_marks_partial() {
        let db = SqliteDatabase::new_in_memory();
        let now = Utc::now();
        let today_event = event("o-1", "1", &model::time::iso_utc(now));
        let provider = StubProvider::new(vec![Ok(vec![today_event])]);

        let outcome = run_day(&db, &provider, &small_config(), now, false);

        let EnsureOutcome::DaySync(report) = outcome else {
            panic!("expected a day sync");
        };
        assert!(!report.cache_hit);
        assert_eq!(report.status, SyncStatus::Partial);
        assert_eq!(report.inserted_count, 1);
        assert!(!report.truncated);
        assert_eq!(provider.call_count(), 1);

        let record = db
            .day_sync_read()
            .for_day(123, now.date_naive())
            .unwrap()
            .unwrap();
        assert_eq!(record.sync_status, SyncStatus::Partial);
        assert_eq!(record.row_count, 1);
    }

    #[test]
    fn fresh_complete_yesterday_is_a_cache_hit() {
        let db = SqliteDatabase::new_in_memory();
        let at = yesterday_at(14);
        db.day_sync_write()
            .upsert_day(123, at.date_naive(), SyncStatus::Complete, 4)
            .unwrap();
        let provider = StubProvider::new(Vec::new());

        let outcome = run_day(&db, &provider, &small_config(), at, false);

        let EnsureOutcome::DaySync(report) = outcome else {
            panic!("expected a day sync");
        };
        assert!(report.cache_hit);
        assert_eq!(report.status, SyncStatus::Complete);
        assert_eq!(provider.call_count(), 0, "no upstream call on a cache hit");
    }

    #[test]
    fn stale_complete_yesterday_refetches_under_a_short_budget() {
        let db = SqliteDatabase::new_in_memory();
        let at = yesterday_at(14);
        db.day_sync_write()
            .upsert_day(123, at.date_naive(), SyncStatus::Complete, 4)
            .unwrap();
        let provider =
            StubProvider::new(vec![Ok(vec![event("o-1", "1", &model::time::iso_utc(at))])]);

        // Freshness budget of zero minutes: the record is already stale.
        let config = SyncConfig {
            yesterday_refresh_minutes: 0,
            ..small_config()
        };
        std::thread::sleep(std::time::Duration::from_millis(5));
        let outcome = run_day(&db, &provider, &config, at, false);

        let EnsureOutcome::DaySync(report) = outcome else {
            panic!("expected a day sync");
        };
        assert!(!report.cache_hit);
        assert_eq!(report.status, SyncStatus::Complete, "full page walk completes");
        assert_eq!(provider.call_count(), 1);
    }

    #[test]
    fn completed_earlier_day_stays_cached_unless_refresh_is_forced() {
        let db = SqliteDatabase::new_in_memory();
        let day = NaiveDate::from_ymd_opt(2025, 10, 20).unwrap();
        let at = as_utc(day.and_hms_opt(9, 0, 0).unwrap());
        db.day_sync_write()
            .upsert_day(123, day, SyncStatus::Complete, 4)
            .unwrap();

        let provider = StubProvider::new(Vec::new());
        let outcome = run_day(&db, &provider, &small_config(), at, false);
        assert!(matches!(
            outcome,
            EnsureOutcome::DaySync(DaySyncReport { cache_hit: true, .. })
        ));
        assert_eq!(provider.call_count(), 0);

        let provider = StubProvider::new(vec![Ok(vec![event(
            "o-1",
            "1",
            "2025-10-20T09:00:00Z",
        )])]);
        let outcome = run_day(&db, &provider, &small_config(), at, true);
        let EnsureOutcome::DaySync(report) = outcome else {
            panic!("expected a day sync");
        };
        assert!(!report.cache_hit);
        assert_eq!(provider.call_count(), 1);
    }

    #[test]
    fn partial_earlier_day_refetches_and_completes() {
        let db = SqliteDatabase::new_in_memory();
        let day = NaiveDate::from_ymd_opt(2025, 10, 20).unwrap();
        let at = as_utc(day.and_hms_opt(9, 0, 0).unwrap());
        db.day_sync_write()
            .upsert_day(123, day, SyncStatus::Partial, 0)
            .unwrap();

        let provider = StubProvider::new(vec![Ok(vec![event(
            "o-1",
            "1",
            "2025-10-20T09:00:00Z",
        )])]);
        let outcome = run_day(&db, &provider, &small_config(), at, false);

        let EnsureOutcome::DaySync(report) = outcome else {
            panic!("expected a day sync");
        };
        assert_eq!(report.status, SyncStatus::Complete);
        assert_eq!(
            db.day_sync_read()
                .for_day(123, day)
                .unwrap()
                .unwrap()
                .sync_status,
            SyncStatus::Complete
        );
    }

    #[test]
    fn repeated_full_pages_stop_as_truncation_and_stay_partial() {
        let db = SqliteDatabase::new_in_memory();
        let day = NaiveDate::from_ymd_opt(2025, 10, 20).unwrap();
        let at = as_utc(day.and_hms_opt(9, 0, 0).unwrap());

        let full_page = vec![
            event("o-1", "1", "2025-10-20T09:00:00Z"),
            event("o-2", "2", "2025-10-20T09:05:00Z"),
        ];
        // Offset paging keeps returning the same full page under churn.
        let provider = StubProvider::new(vec![Ok(full_page.clone()), Ok(full_page)]);

        let outcome = run_day(&db, &provider, &small_config(), at, false);

        let EnsureOutcome::DaySync(report) = outcome else {
            panic!("expected a day sync");
        };
        assert!(report.truncated);
        assert_eq!(report.status, SyncStatus::Partial);
        // Deduped to the two unique events.
        assert_eq!(report.inserted_count, 2);
        assert_eq!(provider.call_count(), 2);
        let (_, _, limit, offset) = provider.last_call();
        assert_eq!(limit, Some(2));
        assert_eq!(offset, Some(2));
    }

    #[test]
    fn provider_failure_marks_the_day_partial_and_propagates() {
        let db = SqliteDatabase::new_in_memory();
        let day = NaiveDate::from_ymd_opt(2025, 10, 20).unwrap();
        let at = as_utc(day.and_hms_opt(9, 0, 0).unwrap());
        let provider = StubProvider::new(vec![Err(UpstreamError::with_status(
            "ProjectX request failed (503): unavailable",
            503,
        ))]);

        let err = ensure_trade_cache_for_request(
            &db,
            &provider,
            &small_config(),
            123,
            Some(at),
            Some(at),
            false,
        )
        .unwrap_err();
        assert!(err.to_string().contains("503"));

        let record = db.day_sync_read().for_day(123, day).unwrap().unwrap();
        assert_eq!(record.sync_status, SyncStatus::Partial);
    }

    #[test]
    fn non_day_requests_fall_back_to_the_window_planner() {
        let db = SqliteDatabase::new_in_memory();
        let start = model::time::parse_timestamp("2025-10-19T09:00:00Z");
        let end = model::time::parse_timestamp("2025-10-21T09:00:00Z");

        // No local data: the planner path runs.
        let provider = StubProvider::new(vec![Ok(vec![event(
            "o-1",
            "1",
            "2025-10-20T09:00:00Z",
        )])]);
        let outcome = ensure_trade_cache_for_request(
            &db, &provider, &small_config(), 123, start, end, false,
        )
        .unwrap();
        assert!(matches!(outcome, EnsureOutcome::Refreshed(_)));
        assert!(provider.call_count() >= 1);

        // Local data present and no refresh flag: nothing to do.
        let quiet = StubProvider::new(Vec::new());
        let outcome = ensure_trade_cache_for_request(
            &db, &quiet, &small_config(), 123, start, end, false,
        )
        .unwrap();
        assert_eq!(outcome, EnsureOutcome::CacheHit);
        assert_eq!(quiet.call_count(), 0);
    }

    #[test]
    fn validation_failures_happen_before_any_io() {
        let db = SqliteDatabase::new_in_memory();
        let provider = StubProvider::new(Vec::new());

        let err = ensure_trade_cache_for_request(
            &db,
            &provider,
            &small_config(),
            0,
            None,
            None,
            true,
        )
        .unwrap_err();
        assert!(err.to_string().contains("positive"));

        let start = model::time::parse_timestamp("2025-10-21T09:00:00Z");
        let end = model::time::parse_timestamp("2025-10-19T09:00:00Z");
        let err = ensure_trade_cache_for_request(
            &db,
            &provider,
            &small_config(),
            123,
            start,
            end,
            true,
        )
        .unwrap_err();
        assert!(err.to_string().contains("start must be before end"));
        assert_eq!(provider.call_count(), 0);
    }
}
