//! Daybook Model Crate - Core Domain Models
//!
//! This crate defines the core domain models for the Daybook trade-history
//! mirror. All types and traits here enforce strict financial safety standards.

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

/// Upstream account summaries
pub mod account;
/// Database abstraction layer
pub mod database;
/// Per-day sync bookkeeping
pub mod day_sync;
/// Loosely-typed upstream payload coercion helpers
pub mod payload;
/// Upstream trade-history provider trait and error type
pub mod provider;
/// Timestamp normalization helpers
pub mod time;
/// Execution event primitives
pub mod trade_event;

// Re-export the types from the model crate.
pub use account::AccountSummary;
pub use database::{
    DatabaseFactory, DaySyncRead, DaySyncWrite, StoreOutcome, TradeEventQuery, TradeEventRead,
    TradeEventWrite,
};
pub use day_sync::{SyncStatus, SyncStatusParseError, TradeDaySync};
pub use provider::{TradeHistoryProvider, UpstreamError};
pub use trade_event::{TradeEvent, TradePnl, TradeSide, TradeSideParseError};
