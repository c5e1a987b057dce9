//! Daybook Core Crate - Sync Planning and Analytics
//!
//! This crate contains the sync planner, the day-sync orchestrator, the
//! metrics engine and the query surface for the Daybook trade-history
//! mirror.

// === FINANCIAL APPLICATION SAFETY LINTS ===
// These lint rules are critical for financial applications where precision,
// safety, and reliability are paramount. Violations can lead to financial losses.

#![deny(
    // Error handling safety - force proper error handling
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic,

    // Financial precision safety - prevent calculation errors
    clippy::float_arithmetic,
    clippy::arithmetic_side_effects,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,

    // Code quality enforcement
    clippy::cognitive_complexity,
    clippy::too_many_lines,
)]
// Allow unwrap and expect in test code only
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]
// Standard Rust lints for code quality
#![warn(missing_docs, rust_2018_idioms, missing_debug_implementations)]

/// Environment-tunable sync settings
pub mod config;
/// Metrics engine over execution samples
pub mod metrics;
mod query;
mod services;
/// Refresh window planning and chunking
pub mod sync_planner;
/// Request validation
pub mod validators;

use chrono::{DateTime, Utc};
use model::{AccountSummary, DatabaseFactory, TradeHistoryProvider, UpstreamError};
use std::error::Error;

pub use config::SyncConfig;
pub use metrics::{
    compute_daily_pnl_calendar, compute_trade_summary, normalized_trade_fees, DailyPnl,
    MetricSample, TradeSummary,
};
pub use query::TradeEventView;
pub use services::{DaySyncReport, EnsureOutcome, RefreshReport};
pub use validators::ValidationError;

/// The main facade for the Daybook trade-history mirror.
///
/// This struct provides a unified interface for sync and analytics over
/// one database and one upstream provider. It encapsulates the database
/// factory and provider implementations behind their traits so adapters
/// never touch either directly.
pub struct DaybookFacade {
    factory: Box<dyn DatabaseFactory>,
    provider: Box<dyn TradeHistoryProvider>,
    config: SyncConfig,
}

impl std::fmt::Debug for DaybookFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DaybookFacade")
            .field("factory", &"Box<dyn DatabaseFactory>")
            .field("provider", &"Box<dyn TradeHistoryProvider>")
            .field("config", &self.config)
            .finish()
    }
}

impl DaybookFacade {
    /// Create a new facade reading sync tuning from the environment.
    pub fn new(factory: Box<dyn DatabaseFactory>, provider: Box<dyn TradeHistoryProvider>) -> Self {
        Self::with_config(factory, provider, SyncConfig::from_env())
    }

    /// Create a new facade with explicit sync tuning.
    pub fn with_config(
        factory: Box<dyn DatabaseFactory>,
        provider: Box<dyn TradeHistoryProvider>,
        config: SyncConfig,
    ) -> Self {
        DaybookFacade {
            factory,
            provider,
            config,
        }
    }

    /// List active, tradeable upstream accounts.
    pub fn list_accounts(&self) -> Result<Vec<AccountSummary>, UpstreamError> {
        self.provider.list_accounts()
    }

    /// Refresh the local mirror for an account over an optional window.
    pub fn refresh_account_trades(
        &self,
        account_id: i64,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<RefreshReport, Box<dyn Error>> {
        services::refresh_account_trades(
            &*self.factory,
            &*self.provider,
            &self.config,
            account_id,
            start,
            end,
        )
    }

    /// Make sure the cache can answer a request, syncing what is missing.
    pub fn ensure_trade_cache_for_request(
        &self,
        account_id: i64,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        refresh: bool,
    ) -> Result<EnsureOutcome, Box<dyn Error>> {
        services::ensure_trade_cache_for_request(
            &*self.factory,
            &*self.provider,
            &self.config,
            account_id,
            start,
            end,
            refresh,
        )
    }

    /// Whether any non-voided local event exists for the account.
    pub fn has_local_trades(&self, account_id: i64) -> Result<bool, Box<dyn Error>> {
        validators::validate_account_id(account_id)?;
        self.factory.trade_event_read().has_local_trades(account_id)
    }

    /// Bounded listing of closed rows, newest first.
    pub fn list_trade_events(
        &self,
        account_id: i64,
        limit: i64,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        symbol_query: Option<&str>,
    ) -> Result<Vec<TradeEventView>, Box<dyn Error>> {
        query::list_trade_events(&*self.factory, account_id, limit, start, end, symbol_query)
    }

    /// Performance summary over the cached events in a range.
    pub fn summarize_trade_events(
        &self,
        account_id: i64,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<TradeSummary, Box<dyn Error>> {
        query::summarize_trade_events(&*self.factory, account_id, start, end)
    }

    /// Daily P&L calendar over the cached events in a range.
    pub fn trade_event_pnl_calendar(
        &self,
        account_id: i64,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<DailyPnl>, Box<dyn Error>> {
        query::trade_event_pnl_calendar(&*self.factory, account_id, start, end)
    }

    /// Earliest non-voided local trade timestamp for the account.
    pub fn earliest_trade_timestamp(
        &self,
        account_id: i64,
    ) -> Result<Option<DateTime<Utc>>, Box<dyn Error>> {
        validators::validate_account_id(account_id)?;
        self.factory
            .trade_event_read()
            .earliest_trade_timestamp(account_id)
    }
}
