use crate::payload;
use crate::time;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use std::str::FromStr;

/// Direction of an execution as reported by the gateway.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeSide {
    /// Buy-side fill.
    Buy,
    /// Sell-side fill.
    Sell,
    /// Direction the gateway did not report in a recognizable form.
    Unknown,
}

impl TradeSide {
    /// Normalize the gateway's side encodings.
    ///
    /// Strings BUY/LONG/BID and the numeric 0 map to Buy; SELL/SHORT/ASK
    /// and 1 map to Sell; everything else is Unknown.
    pub fn normalize(raw: &Value) -> TradeSide {
        match raw {
            Value::String(text) => match text.trim().to_uppercase().as_str() {
                "BUY" | "LONG" | "BID" => TradeSide::Buy,
                "SELL" | "SHORT" | "ASK" => TradeSide::Sell,
                _ => TradeSide::Unknown,
            },
            Value::Number(number) => match number.as_i64().or_else(|| {
                number.as_f64().and_then(|value| {
                    if value == 0.0 {
                        Some(0)
                    } else if value == 1.0 {
                        Some(1)
                    } else {
                        None
                    }
                })
            }) {
                Some(0) => TradeSide::Buy,
                Some(1) => TradeSide::Sell,
                _ => TradeSide::Unknown,
            },
            _ => TradeSide::Unknown,
        }
    }
}

impl std::fmt::Display for TradeSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeSide::Buy => write!(f, "BUY"),
            TradeSide::Sell => write!(f, "SELL"),
            TradeSide::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Error returned when parsing an invalid trade side.
#[derive(Debug, PartialEq)]
pub struct TradeSideParseError;

impl FromStr for TradeSide {
    type Err = TradeSideParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BUY" => Ok(TradeSide::Buy),
            "SELL" => Ok(TradeSide::Sell),
            "UNKNOWN" => Ok(TradeSide::Unknown),
            _ => Err(TradeSideParseError),
        }
    }
}

/// Broker-reported realized profit state for one execution row.
///
/// The gateway encodes "this execution closed a position" as the presence
/// of a realized P&L figure. Rows without one are open legs of a round
/// trip and never contribute realized P&L.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TradePnl {
    /// Open-leg row: no realized P&L reported.
    Open,
    /// Closing row carrying the broker-reported realized P&L.
    Closed(Decimal),
}

impl TradePnl {
    /// Whether this row closed a position.
    pub fn is_closed(&self) -> bool {
        matches!(self, TradePnl::Closed(_))
    }

    /// Realized P&L when present.
    pub fn realized(&self) -> Option<Decimal> {
        match self {
            TradePnl::Open => None,
            TradePnl::Closed(value) => Some(*value),
        }
    }
}

/// One execution event mirrored from the gateway.
///
/// Events are immutable after ingestion except through the upsert path,
/// which overwrites the mutable fields from the most recent upstream
/// observation.
#[derive(Clone, Debug, PartialEq)]
pub struct TradeEvent {
    /// Local surrogate id; zero until the row is stored.
    pub id: i64,
    /// Account the event belongs to.
    pub account_id: i64,
    /// Gateway contract identifier; `UNKNOWN` when the row carried none.
    pub contract_id: String,
    /// Human-facing symbol; presentation falls back to `contract_id`.
    pub symbol: Option<String>,
    /// Normalized execution side.
    pub side: TradeSide,
    /// Filled quantity.
    pub size: Decimal,
    /// Executed price.
    pub price: Decimal,
    /// When the execution happened (UTC).
    pub trade_timestamp: DateTime<Utc>,
    /// Per-leg fees as reported by the gateway.
    pub fees: Decimal,
    /// Realized P&L state; `Closed` marks a closing row.
    pub pnl: TradePnl,
    /// Gateway order id, synthesized when the row carried none.
    pub order_id: String,
    /// Gateway trade/execution id, the preferred dedupe key.
    pub source_trade_id: Option<String>,
    /// Gateway-reported row status.
    pub status: Option<String>,
    /// Raw upstream row, retained for audit and voided inspection.
    pub raw_payload: Option<Value>,
    /// When the row was first stored locally.
    pub created_at: DateTime<Utc>,
}

impl TradeEvent {
    /// Construct a normalized event that has not been stored yet.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        account_id: i64,
        contract_id: String,
        symbol: Option<String>,
        side: TradeSide,
        size: Decimal,
        price: Decimal,
        trade_timestamp: DateTime<Utc>,
        fees: Decimal,
        pnl: TradePnl,
        order_id: String,
        source_trade_id: Option<String>,
        status: Option<String>,
        raw_payload: Option<Value>,
    ) -> Self {
        Self {
            id: 0,
            account_id,
            contract_id,
            symbol,
            side,
            size,
            price,
            trade_timestamp,
            fees,
            pnl,
            order_id,
            source_trade_id,
            status,
            raw_payload,
            created_at: Utc::now(),
        }
    }

    /// Symbol to show users, falling back to the contract id.
    pub fn display_symbol(&self) -> &str {
        self.symbol.as_deref().unwrap_or(&self.contract_id)
    }

    /// Whether the raw payload marks this row voided upstream.
    ///
    /// Voided rows are retained for audit but never counted by any
    /// aggregate or listing.
    pub fn is_voided(&self) -> bool {
        self.raw_payload
            .as_ref()
            .and_then(|raw| raw.get("voided"))
            .map(payload::is_truthy)
            .unwrap_or(false)
    }

    /// Stable identity key used for cross-page dedupe and page signatures.
    ///
    /// The source trade id is preferred; rows without one fall back to the
    /// (order id, timestamp) pair.
    pub fn identity_key(&self) -> String {
        match &self.source_trade_id {
            Some(source) => format!("{}:source:{}", self.account_id, source),
            None => format!(
                "{}:fallback:{}:{}",
                self.account_id,
                self.order_id,
                time::iso_utc(self.trade_timestamp)
            ),
        }
    }
}
