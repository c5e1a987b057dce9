use rust_decimal::Decimal;
use serde::Serialize;

/// Tradeable account surfaced by the gateway's account search.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AccountSummary {
    /// Gateway account id.
    pub id: i64,
    /// Display name; falls back to `Account <id>` when the gateway sends none.
    pub name: String,
    /// Best-effort balance, zero when the gateway omits every balance field.
    pub balance: Decimal,
    /// Gateway-reported status.
    pub status: String,
}
