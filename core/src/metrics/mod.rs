//! Metrics engine over timestamp-ordered execution samples.
//!
//! The accounting rule throughout: only closing rows (those with a
//! broker-reported realized P&L) contribute realized P&L, effective fees
//! and win/loss classification. Open-leg rows count as executions and
//! extend daily activity spans, nothing more.

mod calendar;
mod drawdown;
mod sample;
mod summary;

pub use calendar::{compute_daily_pnl_calendar, DailyPnl};
pub use sample::{normalized_trade_fees, MetricSample};
pub use summary::{compute_trade_summary, TradeSummary};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

pub(crate) fn round_money(value: Decimal) -> Decimal {
    value.round_dp(2)
}

pub(crate) fn mean(values: &[Decimal]) -> Decimal {
    if values.is_empty() {
        return Decimal::ZERO;
    }
    values
        .iter()
        .sum::<Decimal>()
        .checked_div(Decimal::from(values.len()))
        .unwrap_or(Decimal::ZERO)
}

pub(crate) fn duration_hours(start: DateTime<Utc>, end: DateTime<Utc>) -> Decimal {
    let seconds = end.signed_duration_since(start).num_seconds().max(0);
    Decimal::from(seconds)
        .checked_div(dec!(3600))
        .unwrap_or(Decimal::ZERO)
}
