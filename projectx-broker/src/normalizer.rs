use model::payload::{first_value, is_truthy, safe_decimal, safe_int, string_or_none};
use model::time::parse_timestamp_value;
use model::{TradeEvent, TradePnl, TradeSide};
use rust_decimal::Decimal;
use serde_json::Value;

/// Map one upstream trade row into a canonical event.
///
/// Voided rows and rows without a parseable timestamp yield `None`; both
/// are skipped silently because the gateway interleaves them freely with
/// good rows.
pub(crate) fn normalize_trade_row(requested_account_id: i64, row: &Value) -> Option<TradeEvent> {
    if !row.is_object() {
        return None;
    }
    if first_value(row, &["voided", "isVoided", "is_voided"])
        .map(is_truthy)
        .unwrap_or(false)
    {
        // Voided/canceled executions should not affect local history or P&L.
        return None;
    }

    let timestamp = first_value(
        row,
        &["creationTimestamp", "timestamp", "createdAt", "updatedAt"],
    )
    .and_then(parse_timestamp_value)?;

    let account_id = first_value(row, &["accountId", "account_id"])
        .and_then(safe_int)
        .unwrap_or(requested_account_id);

    let contract_id = first_value(row, &["contractId", "contract_id", "symbolId", "symbol"])
        .and_then(string_or_none)
        .unwrap_or_else(|| "UNKNOWN".to_string());
    let symbol = first_value(row, &["symbol", "symbolId", "contractSymbol", "contractId"])
        .and_then(string_or_none)
        .unwrap_or_else(|| contract_id.clone());

    let source_trade_id =
        first_value(row, &["id", "tradeId", "executionId"]).and_then(string_or_none);
    // Keep dedupe stable even if orderId is omitted.
    let order_id = first_value(row, &["orderId", "order_id"])
        .and_then(string_or_none)
        .or_else(|| source_trade_id.clone())
        .unwrap_or_else(|| format!("fallback-{}", timestamp.timestamp_millis()));

    let side = first_value(row, &["side", "direction", "positionSide"])
        .map(TradeSide::normalize)
        .unwrap_or(TradeSide::Unknown);
    let size = first_value(row, &["size", "quantity", "qty"])
        .map(safe_decimal)
        .unwrap_or(Decimal::ZERO);
    let price = first_value(row, &["price", "fillPrice", "averagePrice"])
        .map(safe_decimal)
        .unwrap_or(Decimal::ZERO);
    let fees = first_value(row, &["fees", "commission", "totalFees"])
        .map(safe_decimal)
        .unwrap_or(Decimal::ZERO);

    let pnl = match first_value(row, &["profitAndLoss", "pnl", "realizedPnl"]) {
        Some(Value::Null) | None => TradePnl::Open,
        Some(value) => TradePnl::Closed(safe_decimal(value)),
    };

    let status = first_value(row, &["status", "tradeStatus", "state"]).and_then(string_or_none);

    Some(TradeEvent::new(
        account_id,
        contract_id,
        Some(symbol),
        side,
        size,
        price,
        timestamp,
        fees,
        pnl,
        order_id,
        source_trade_id,
        status,
        Some(row.clone()),
    ))
}
