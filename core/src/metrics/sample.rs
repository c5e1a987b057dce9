use chrono::{DateTime, Utc};
use model::{TradeEvent, TradeSide};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// One execution reduced to what the metrics engine needs.
#[derive(Clone, Debug, PartialEq)]
pub struct MetricSample {
    /// Execution instant (UTC).
    pub timestamp: DateTime<Utc>,
    /// Broker-reported realized P&L; `None` marks an open-leg row.
    pub pnl: Option<Decimal>,
    /// Effective fees: round-trip for closing rows, per-leg otherwise.
    pub fees: Decimal,
    /// Gateway order id, when known.
    pub order_id: Option<String>,
    /// Displayed symbol, when known.
    pub symbol: Option<String>,
    /// Execution side, when known.
    pub side: Option<TradeSide>,
    /// Filled quantity, when known.
    pub size: Option<Decimal>,
    /// Executed price, when known.
    pub price: Option<Decimal>,
}

impl MetricSample {
    /// A minimal sample; optional context fields stay empty.
    pub fn new(timestamp: DateTime<Utc>, pnl: Option<Decimal>, fees: Decimal) -> Self {
        MetricSample {
            timestamp,
            pnl,
            fees,
            order_id: None,
            symbol: None,
            side: None,
            size: None,
            price: None,
        }
    }

    /// Reduce a stored event to a sample, normalizing fees.
    pub fn from_event(event: &TradeEvent) -> Self {
        MetricSample {
            timestamp: event.trade_timestamp,
            pnl: event.pnl.realized(),
            fees: normalized_trade_fees(event),
            order_id: Some(event.order_id.clone()),
            symbol: Some(event.display_symbol().to_string()),
            side: Some(event.side),
            size: Some(event.size),
            price: Some(event.price),
        }
    }

    /// Whether this sample is a closing row.
    pub fn is_closed(&self) -> bool {
        self.pnl.is_some()
    }

    /// Realized P&L contribution: the reported figure, or zero for open legs.
    pub fn realized(&self) -> Decimal {
        self.pnl.unwrap_or(Decimal::ZERO)
    }

    /// Fee contribution: open-leg rows never reduce net P&L.
    pub fn effective_fee(&self) -> Decimal {
        if self.is_closed() {
            self.fees
        } else {
            Decimal::ZERO
        }
    }

    /// Net contribution to the equity curve.
    pub fn net(&self) -> Decimal {
        self.realized().saturating_sub(self.effective_fee())
    }
}

/// Fee figure to report for one stored event.
///
/// The gateway reports fees per fill leg. A closing row represents a round
/// trip whose entry leg's fee was already charged on a separate open-leg
/// event, so closing rows carry both sides.
pub fn normalized_trade_fees(event: &TradeEvent) -> Decimal {
    if event.pnl.is_closed() {
        event.fees.checked_mul(dec!(2)).unwrap_or(event.fees)
    } else {
        event.fees
    }
}
