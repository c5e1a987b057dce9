use super::{round_money, MetricSample};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

/// One UTC day of closed-trade P&L.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DailyPnl {
    /// UTC calendar date.
    pub date: NaiveDate,
    /// Closing rows that day.
    pub trade_count: usize,
    /// Realized P&L that day.
    pub gross_pnl: Decimal,
    /// Effective fees that day.
    pub fees: Decimal,
    /// `gross_pnl` minus `fees`.
    pub net_pnl: Decimal,
}

/// Group closing rows by UTC date, ascending.
///
/// Open-leg rows are excluded entirely: calendar trade counts reflect
/// closed trades only.
pub fn compute_daily_pnl_calendar(samples: &[MetricSample]) -> Vec<DailyPnl> {
    let mut buckets: BTreeMap<NaiveDate, (usize, Decimal, Decimal)> = BTreeMap::new();

    for sample in samples {
        if !sample.is_closed() {
            continue;
        }
        let day = sample.timestamp.date_naive();
        let entry = buckets
            .entry(day)
            .or_insert((0, Decimal::ZERO, Decimal::ZERO));
        entry.0 = entry.0.saturating_add(1);
        entry.1 = entry.1.saturating_add(sample.realized());
        entry.2 = entry.2.saturating_add(sample.effective_fee());
    }

    buckets
        .into_iter()
        .map(|(date, (trade_count, gross_pnl, fees))| DailyPnl {
            date,
            trade_count,
            gross_pnl: round_money(gross_pnl),
            fees: round_money(fees),
            net_pnl: round_money(gross_pnl.saturating_sub(fees)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn sample(day: u32, hour: u32, pnl: Option<Decimal>, fees: Decimal) -> MetricSample {
        MetricSample::new(
            Utc.with_ymd_and_hms(2026, 2, day, hour, 0, 0).unwrap(),
            pnl,
            fees,
        )
    }

    #[test]
    fn empty_input_yields_an_empty_calendar() {
        assert!(compute_daily_pnl_calendar(&[]).is_empty());
    }

    #[test]
    fn groups_closing_rows_by_utc_date_ascending() {
        let samples = vec![
            sample(20, 9, Some(dec!(100)), dec!(10)),
            sample(19, 14, Some(dec!(-40)), dec!(4)),
            sample(20, 10, Some(dec!(60)), dec!(7)),
            sample(20, 11, None, dec!(1.5)),
        ];

        let calendar = compute_daily_pnl_calendar(&samples);
        assert_eq!(calendar.len(), 2);

        let first = calendar.first().unwrap();
        assert_eq!(first.date, chrono::NaiveDate::from_ymd_opt(2026, 2, 19).unwrap());
        assert_eq!(first.trade_count, 1);
        assert_eq!(first.gross_pnl, dec!(-40));
        assert_eq!(first.fees, dec!(4));
        assert_eq!(first.net_pnl, dec!(-44));

        let second = calendar.get(1).unwrap();
        assert_eq!(second.trade_count, 2);
        assert_eq!(second.gross_pnl, dec!(160));
        assert_eq!(second.fees, dec!(17));
        assert_eq!(second.net_pnl, dec!(143));
    }

    #[test]
    fn open_legs_never_appear_in_the_calendar() {
        let calendar = compute_daily_pnl_calendar(&[sample(20, 9, None, dec!(2))]);
        assert!(calendar.is_empty());
    }

    #[test]
    fn emitted_values_are_rounded_to_cents() {
        let calendar = compute_daily_pnl_calendar(&[sample(20, 9, Some(dec!(10.006)), dec!(0.0012))]);
        let day = calendar.first().unwrap();
        assert_eq!(day.gross_pnl, dec!(10.01));
        assert_eq!(day.fees, dec!(0.00));
        assert_eq!(day.net_pnl, dec!(10.00));
    }
}
