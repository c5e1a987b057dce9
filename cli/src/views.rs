use daybook_core::{DailyPnl, TradeEventView, TradeSummary};
use model::time::iso_utc;
use model::{AccountSummary, TradeEvent};
use rust_decimal::Decimal;
use tabled::{Table, Tabled};

#[derive(Tabled)]
struct AccountRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Balance")]
    balance: Decimal,
    #[tabled(rename = "Status")]
    status: String,
}

pub fn accounts_table(accounts: &[AccountSummary]) -> Table {
    let rows: Vec<AccountRow> = accounts
        .iter()
        .map(|account| AccountRow {
            id: account.id,
            name: account.name.clone(),
            balance: account.balance,
            status: account.status.clone(),
        })
        .collect();
    Table::new(rows)
}

#[derive(Tabled)]
struct TradeRow {
    #[tabled(rename = "Time (UTC)")]
    time: String,
    #[tabled(rename = "Symbol")]
    symbol: String,
    #[tabled(rename = "Side")]
    side: String,
    #[tabled(rename = "Size")]
    size: Decimal,
    #[tabled(rename = "Price")]
    price: Decimal,
    #[tabled(rename = "Fees")]
    fees: Decimal,
    #[tabled(rename = "PnL")]
    pnl: String,
}

pub fn trades_table(trades: &[TradeEventView]) -> Table {
    let rows: Vec<TradeRow> = trades
        .iter()
        .map(|trade| TradeRow {
            time: trade.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            symbol: trade.symbol.clone(),
            side: trade.side.to_string(),
            size: trade.size,
            price: trade.price,
            fees: trade.fees,
            pnl: trade
                .pnl
                .map(|pnl| pnl.to_string())
                .unwrap_or_else(|| "-".to_string()),
        })
        .collect();
    Table::new(rows)
}

#[derive(Tabled)]
struct MetricRow {
    #[tabled(rename = "Metric")]
    metric: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

pub fn summary_table(summary: &TradeSummary) -> Table {
    let rows = vec![
        MetricRow {
            metric: "Net P&L",
            value: summary.net_pnl.to_string(),
        },
        MetricRow {
            metric: "Gross P&L",
            value: summary.gross_pnl.to_string(),
        },
        MetricRow {
            metric: "Fees",
            value: summary.fees.to_string(),
        },
        MetricRow {
            metric: "Trades (closed)",
            value: summary.trade_count.to_string(),
        },
        MetricRow {
            metric: "Executions",
            value: summary.execution_count.to_string(),
        },
        MetricRow {
            metric: "Half-turns",
            value: summary.half_turn_count.to_string(),
        },
        MetricRow {
            metric: "Win rate %",
            value: summary.win_rate.to_string(),
        },
        MetricRow {
            metric: "W / L / BE",
            value: format!(
                "{} / {} / {}",
                summary.win_count, summary.loss_count, summary.breakeven_count
            ),
        },
        MetricRow {
            metric: "Profit factor",
            value: summary.profit_factor.to_string(),
        },
        MetricRow {
            metric: "Avg win / loss",
            value: format!("{} / {}", summary.avg_win, summary.avg_loss),
        },
        MetricRow {
            metric: "Expectancy per trade",
            value: summary.expectancy_per_trade.to_string(),
        },
        MetricRow {
            metric: "Tail risk (worst 5%)",
            value: summary.tail_risk_5pct.to_string(),
        },
        MetricRow {
            metric: "Max drawdown",
            value: summary.max_drawdown.to_string(),
        },
        MetricRow {
            metric: "Risk drawdown score",
            value: summary.risk_drawdown_score.to_string(),
        },
        MetricRow {
            metric: "Recovery time (h)",
            value: summary.recovery_time_hours.to_string(),
        },
        MetricRow {
            metric: "Active days (G/R/F)",
            value: format!(
                "{} ({}/{}/{})",
                summary.active_days, summary.green_days, summary.red_days, summary.flat_days
            ),
        },
        MetricRow {
            metric: "Day win rate %",
            value: summary.day_win_rate.to_string(),
        },
        MetricRow {
            metric: "Profit per day",
            value: summary.profit_per_day.to_string(),
        },
        MetricRow {
            metric: "Efficiency per hour",
            value: summary.efficiency_per_hour.to_string(),
        },
    ];
    Table::new(rows)
}

#[derive(Tabled)]
struct CalendarRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Trades")]
    trades: usize,
    #[tabled(rename = "Gross")]
    gross: Decimal,
    #[tabled(rename = "Fees")]
    fees: Decimal,
    #[tabled(rename = "Net")]
    net: Decimal,
}

pub fn calendar_table(days: &[DailyPnl]) -> Table {
    let rows: Vec<CalendarRow> = days
        .iter()
        .map(|day| CalendarRow {
            date: day.date.to_string(),
            trades: day.trade_count,
            gross: day.gross_pnl,
            fees: day.fees,
            net: day.net_pnl,
        })
        .collect();
    Table::new(rows)
}

pub fn stream_line(event: &TradeEvent) -> String {
    let pnl = event
        .pnl
        .realized()
        .map(|value| value.to_string())
        .unwrap_or_else(|| "open".to_string());
    format!(
        "{} {} {} {} @ {} (pnl {}, order {})",
        iso_utc(event.trade_timestamp),
        event.side,
        event.size,
        event.display_symbol(),
        event.price,
        pnl,
        event.order_id
    )
}
