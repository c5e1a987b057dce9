use super::drawdown::compute_drawdown_stats;
use super::{duration_hours, mean, round_money, MetricSample};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Performance summary over one account's cached execution events.
///
/// Money fields are rounded to two decimals at emission; rates to two and
/// the profit factor to four. Empty input yields the all-zero record.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TradeSummary {
    /// Sum of broker-reported realized P&L over closing rows.
    pub realized_pnl: Decimal,
    /// Alias of `realized_pnl` kept for consumers that chart gross vs net.
    pub gross_pnl: Decimal,
    /// Sum of effective fees (round-trip fees on closing rows).
    pub fees: Decimal,
    /// `gross_pnl` minus `fees`.
    pub net_pnl: Decimal,
    /// Winning share of closed trades, percent.
    pub win_rate: Decimal,
    /// Closed trades with positive net P&L.
    pub win_count: usize,
    /// Closed trades with negative net P&L.
    pub loss_count: usize,
    /// Closed trades that netted exactly zero.
    pub breakeven_count: usize,
    /// Gross profit over gross loss; zero when there are no losses.
    pub profit_factor: Decimal,
    /// Mean net P&L of winning trades.
    pub avg_win: Decimal,
    /// Mean net P&L of losing trades.
    pub avg_loss: Decimal,
    /// Mean net P&L per closed trade.
    pub expectancy_per_trade: Decimal,
    /// Mean of the worst 5% of closed trades, clipped to at most zero.
    pub tail_risk_5pct: Decimal,
    /// Deepest drawdown on the net equity curve.
    pub max_drawdown: Decimal,
    /// Mean trough across drawdown episodes.
    pub average_drawdown: Decimal,
    /// Deepest drawdown relative to its peak, percent.
    pub risk_drawdown_score: Decimal,
    /// Longest episode from first sample below peak to recovery or end.
    pub max_drawdown_length_hours: Decimal,
    /// Trough-to-recovery time of the deepest episode.
    pub recovery_time_hours: Decimal,
    /// Mean trough-to-recovery time over recovered episodes.
    pub average_recovery_length_hours: Decimal,
    /// Closing rows.
    pub trade_count: usize,
    /// Distinct order ids; falls back to executions when ids are absent.
    pub half_turn_count: usize,
    /// All samples, open legs included.
    pub execution_count: usize,
    /// Green share of active days, percent.
    pub day_win_rate: Decimal,
    /// Days that netted positive.
    pub green_days: usize,
    /// Days that netted negative.
    pub red_days: usize,
    /// Active days that netted exactly zero.
    pub flat_days: usize,
    /// Closed trades per active day.
    pub avg_trades_per_day: Decimal,
    /// Distinct UTC dates with at least one sample.
    pub active_days: usize,
    /// Net P&L per active hour (per-day first-to-last spans, 1 min floor).
    pub efficiency_per_hour: Decimal,
    /// Net P&L per active day.
    pub profit_per_day: Decimal,
}

/// Compute the full summary from an unordered sample set.
#[allow(clippy::too_many_lines)]
pub fn compute_trade_summary(samples: &[MetricSample]) -> TradeSummary {
    let mut trades: Vec<&MetricSample> = samples.iter().collect();
    trades.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    if trades.is_empty() {
        return TradeSummary::default();
    }

    let net_values: Vec<Decimal> = trades.iter().map(|sample| sample.net()).collect();
    let timestamps: Vec<chrono::DateTime<chrono::Utc>> =
        trades.iter().map(|sample| sample.timestamp).collect();
    let closed_net_values: Vec<Decimal> = trades
        .iter()
        .filter(|sample| sample.is_closed())
        .map(|sample| sample.net())
        .collect();
    let closed_pnls: Vec<Decimal> = trades.iter().filter_map(|sample| sample.pnl).collect();

    let wins: Vec<Decimal> = closed_net_values
        .iter()
        .filter(|value| **value > Decimal::ZERO)
        .copied()
        .collect();
    let losses: Vec<Decimal> = closed_net_values
        .iter()
        .filter(|value| **value < Decimal::ZERO)
        .copied()
        .collect();
    let breakeven_count = closed_net_values
        .len()
        .saturating_sub(wins.len())
        .saturating_sub(losses.len());

    let gross_profit: Decimal = closed_pnls
        .iter()
        .filter(|value| **value > Decimal::ZERO)
        .sum();
    let gross_loss_abs: Decimal = closed_pnls
        .iter()
        .filter(|value| **value < Decimal::ZERO)
        .sum::<Decimal>()
        .abs();

    let gross_pnl: Decimal = trades.iter().map(|sample| sample.realized()).sum();
    let total_fees: Decimal = trades.iter().map(|sample| sample.effective_fee()).sum();
    let net_pnl: Decimal = net_values.iter().sum();
    let trade_count = closed_net_values.len();
    let execution_count = trades.len();

    let order_ids: BTreeSet<&str> = trades
        .iter()
        .filter_map(|sample| sample.order_id.as_deref())
        .filter(|order_id| !order_id.is_empty())
        .collect();
    let half_turn_count = if order_ids.is_empty() {
        execution_count
    } else {
        order_ids.len()
    };

    let mut daily_net: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();
    for (sample, net) in trades.iter().zip(net_values.iter()) {
        let entry = daily_net
            .entry(sample.timestamp.date_naive())
            .or_insert(Decimal::ZERO);
        *entry = entry.saturating_add(*net);
    }
    let active_days = daily_net.len();
    let green_days = daily_net
        .values()
        .filter(|value| **value > Decimal::ZERO)
        .count();
    let red_days = daily_net
        .values()
        .filter(|value| **value < Decimal::ZERO)
        .count();
    let flat_days = active_days.saturating_sub(green_days).saturating_sub(red_days);

    let drawdown = compute_drawdown_stats(&timestamps, &net_values);
    let active_hours = compute_active_hours(&trades);

    TradeSummary {
        realized_pnl: round_money(gross_pnl),
        gross_pnl: round_money(gross_pnl),
        fees: round_money(total_fees),
        net_pnl: round_money(net_pnl),
        win_rate: percentage(wins.len(), trade_count),
        win_count: wins.len(),
        loss_count: losses.len(),
        breakeven_count,
        profit_factor: if gross_loss_abs > Decimal::ZERO {
            gross_profit
                .checked_div(gross_loss_abs)
                .unwrap_or(Decimal::ZERO)
                .round_dp(4)
        } else {
            Decimal::ZERO
        },
        avg_win: round_money(mean(&wins)),
        avg_loss: round_money(mean(&losses)),
        expectancy_per_trade: round_money(mean(&closed_net_values)),
        tail_risk_5pct: round_money(tail_risk_worst_5pct(&closed_net_values)),
        max_drawdown: round_money(drawdown.max_drawdown),
        average_drawdown: round_money(drawdown.average_drawdown),
        risk_drawdown_score: drawdown.risk_drawdown_score.round_dp(2),
        max_drawdown_length_hours: round_money(drawdown.max_drawdown_length_hours),
        recovery_time_hours: round_money(drawdown.recovery_time_hours),
        average_recovery_length_hours: round_money(drawdown.average_recovery_length_hours),
        trade_count,
        half_turn_count,
        execution_count,
        day_win_rate: percentage(green_days, active_days),
        green_days,
        red_days,
        flat_days,
        avg_trades_per_day: ratio(Decimal::from(trade_count), active_days),
        active_days,
        efficiency_per_hour: if active_hours > Decimal::ZERO {
            net_pnl
                .checked_div(active_hours)
                .unwrap_or(Decimal::ZERO)
                .round_dp(2)
        } else {
            Decimal::ZERO
        },
        profit_per_day: ratio(net_pnl, active_days),
    }
}

fn percentage(part: usize, whole: usize) -> Decimal {
    if whole == 0 {
        return Decimal::ZERO;
    }
    Decimal::from(part)
        .checked_div(Decimal::from(whole))
        .and_then(|share| share.checked_mul(dec!(100)))
        .unwrap_or(Decimal::ZERO)
        .round_dp(2)
}

fn ratio(value: Decimal, days: usize) -> Decimal {
    if days == 0 {
        return Decimal::ZERO;
    }
    value
        .checked_div(Decimal::from(days))
        .unwrap_or(Decimal::ZERO)
        .round_dp(2)
}

/// Mean of the worst `ceil(5%)` closed trades, never positive.
fn tail_risk_worst_5pct(values: &[Decimal]) -> Decimal {
    if values.is_empty() {
        return Decimal::ZERO;
    }

    let worst_count = values.len().saturating_mul(5).div_ceil(100).max(1);
    let mut sorted = values.to_vec();
    sorted.sort();
    let worst_slice: Vec<Decimal> = sorted.into_iter().take(worst_count).collect();
    mean(&worst_slice).min(Decimal::ZERO)
}

/// Sum of per-day activity spans, with a one-minute floor per active day.
fn compute_active_hours(trades: &[&MetricSample]) -> Decimal {
    let mut bounds: BTreeMap<NaiveDate, (chrono::DateTime<chrono::Utc>, chrono::DateTime<chrono::Utc>)> =
        BTreeMap::new();
    for sample in trades {
        let day = sample.timestamp.date_naive();
        bounds
            .entry(day)
            .and_modify(|(first, last)| {
                if sample.timestamp < *first {
                    *first = sample.timestamp;
                }
                if sample.timestamp > *last {
                    *last = sample.timestamp;
                }
            })
            .or_insert((sample.timestamp, sample.timestamp));
    }

    let floor = dec!(1)
        .checked_div(dec!(60))
        .unwrap_or(Decimal::ZERO);
    bounds
        .values()
        .map(|(first, last)| duration_hours(*first, *last).max(floor))
        .sum()
}
