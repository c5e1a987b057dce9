//! Read surface consumed by the adapters.

use crate::metrics::{
    compute_daily_pnl_calendar, compute_trade_summary, normalized_trade_fees, DailyPnl,
    MetricSample, TradeSummary,
};
use crate::validators::{validate_account_id, validate_time_range};
use chrono::{DateTime, Utc};
use model::{DatabaseFactory, TradeEvent, TradeEventQuery, TradeSide};
use rust_decimal::Decimal;
use serde::Serialize;
use std::error::Error;

/// Presentation shape of one closed trade event.
///
/// Fees are normalized the same way the metrics engine sees them, so a
/// listed row and the summary computed over it agree.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TradeEventView {
    /// Local surrogate id.
    pub id: i64,
    /// Account the event belongs to.
    pub account_id: i64,
    /// Gateway contract identifier.
    pub contract_id: String,
    /// Displayed symbol (contract id when the gateway sent none).
    pub symbol: String,
    /// Execution side.
    pub side: TradeSide,
    /// Filled quantity.
    pub size: Decimal,
    /// Executed price.
    pub price: Decimal,
    /// Execution instant (UTC).
    pub timestamp: DateTime<Utc>,
    /// Round-trip fees for closing rows, per-leg otherwise.
    pub fees: Decimal,
    /// Realized P&L when the row closed a position.
    pub pnl: Option<Decimal>,
    /// Gateway order id.
    pub order_id: String,
    /// Gateway trade id, when reported.
    pub source_trade_id: Option<String>,
}

impl From<&TradeEvent> for TradeEventView {
    fn from(event: &TradeEvent) -> Self {
        TradeEventView {
            id: event.id,
            account_id: event.account_id,
            contract_id: event.contract_id.clone(),
            symbol: event.display_symbol().to_string(),
            side: event.side,
            size: event.size,
            price: event.price,
            timestamp: event.trade_timestamp,
            fees: normalized_trade_fees(event),
            pnl: event.pnl.realized(),
            order_id: event.order_id.clone(),
            source_trade_id: event.source_trade_id.clone(),
        }
    }
}

pub(crate) fn list_trade_events(
    factory: &dyn DatabaseFactory,
    account_id: i64,
    limit: i64,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    symbol_query: Option<&str>,
) -> Result<Vec<TradeEventView>, Box<dyn Error>> {
    validate_account_id(account_id)?;
    validate_time_range(start, end)?;

    let rows = factory.trade_event_read().list_closed(&TradeEventQuery {
        account_id,
        limit,
        start,
        end,
        symbol_query: symbol_query.map(str::to_string),
    })?;
    Ok(rows.iter().map(TradeEventView::from).collect())
}

pub(crate) fn summarize_trade_events(
    factory: &dyn DatabaseFactory,
    account_id: i64,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Result<TradeSummary, Box<dyn Error>> {
    let samples = load_metric_samples(factory, account_id, start, end)?;
    Ok(compute_trade_summary(&samples))
}

pub(crate) fn trade_event_pnl_calendar(
    factory: &dyn DatabaseFactory,
    account_id: i64,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Result<Vec<DailyPnl>, Box<dyn Error>> {
    let samples = load_metric_samples(factory, account_id, start, end)?;
    Ok(compute_daily_pnl_calendar(&samples))
}

fn load_metric_samples(
    factory: &dyn DatabaseFactory,
    account_id: i64,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Result<Vec<MetricSample>, Box<dyn Error>> {
    validate_account_id(account_id)?;
    validate_time_range(start, end)?;

    let events = factory
        .trade_event_read()
        .for_metrics(account_id, start, end)?;
    Ok(events.iter().map(MetricSample::from_event).collect())
}
