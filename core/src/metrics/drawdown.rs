//! Drawdown episode construction over the net equity curve.

use super::{duration_hours, mean};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// One contiguous interval where cumulative equity stayed below its prior
/// peak. An episode with no `end_ts` was still open at the last sample.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct DrawdownEpisode {
    pub peak_equity: Decimal,
    pub start_ts: DateTime<Utc>,
    pub trough_ts: DateTime<Utc>,
    pub end_ts: Option<DateTime<Utc>>,
    pub trough_drawdown: Decimal,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct DrawdownStats {
    pub max_drawdown: Decimal,
    pub average_drawdown: Decimal,
    pub risk_drawdown_score: Decimal,
    pub max_drawdown_length_hours: Decimal,
    pub recovery_time_hours: Decimal,
    pub average_recovery_length_hours: Decimal,
}

/// Walk the equity curve and collect drawdown episodes.
///
/// An episode starts at the first sample where equity falls below the
/// prior peak and ends at the first sample where equity reaches the peak
/// again. A trailing drawdown is emitted as an open episode.
pub(crate) fn build_drawdown_episodes(
    timestamps: &[DateTime<Utc>],
    net_values: &[Decimal],
) -> Vec<DrawdownEpisode> {
    let mut equity = Decimal::ZERO;
    let mut peak = Decimal::ZERO;

    let mut in_drawdown = false;
    let mut current_peak = Decimal::ZERO;
    let mut current_start: Option<DateTime<Utc>> = None;
    let mut current_trough = Decimal::ZERO;
    let mut current_trough_ts: Option<DateTime<Utc>> = None;
    let mut episodes: Vec<DrawdownEpisode> = Vec::new();

    for (ts, net) in timestamps.iter().zip(net_values.iter()) {
        equity = equity.saturating_add(*net);

        if equity >= peak {
            if in_drawdown {
                if let (Some(start_ts), Some(trough_ts)) = (current_start, current_trough_ts) {
                    episodes.push(DrawdownEpisode {
                        peak_equity: current_peak,
                        start_ts,
                        trough_ts,
                        end_ts: Some(*ts),
                        trough_drawdown: current_trough,
                    });
                }
            }
            peak = equity;
            in_drawdown = false;
            continue;
        }

        let drawdown = equity.saturating_sub(peak);
        if !in_drawdown {
            in_drawdown = true;
            current_peak = peak;
            current_start = Some(*ts);
            current_trough = drawdown;
            current_trough_ts = Some(*ts);
            continue;
        }

        if drawdown < current_trough {
            current_trough = drawdown;
            current_trough_ts = Some(*ts);
        }
    }

    if in_drawdown {
        if let (Some(start_ts), Some(trough_ts)) = (current_start, current_trough_ts) {
            episodes.push(DrawdownEpisode {
                peak_equity: current_peak,
                start_ts,
                trough_ts,
                end_ts: None,
                trough_drawdown: current_trough,
            });
        }
    }

    episodes
}

/// Aggregate episode records into the summary's drawdown fields.
pub(crate) fn compute_drawdown_stats(
    timestamps: &[DateTime<Utc>],
    net_values: &[Decimal],
) -> DrawdownStats {
    let Some(last_ts) = timestamps.last().copied() else {
        return DrawdownStats::default();
    };

    let episodes = build_drawdown_episodes(timestamps, net_values);
    let Some(max_episode) = episodes
        .iter()
        .min_by_key(|episode| episode.trough_drawdown)
    else {
        return DrawdownStats::default();
    };

    let drawdown_lengths: Vec<Decimal> = episodes
        .iter()
        .map(|episode| duration_hours(episode.start_ts, episode.end_ts.unwrap_or(last_ts)))
        .collect();
    let recovery_lengths: Vec<Decimal> = episodes
        .iter()
        .filter_map(|episode| {
            episode
                .end_ts
                .map(|end_ts| duration_hours(episode.trough_ts, end_ts))
        })
        .collect();

    let max_drawdown = max_episode.trough_drawdown;
    let denominator = max_episode
        .peak_equity
        .max(max_drawdown.abs())
        .max(dec!(1));
    let recovery_end = max_episode.end_ts.unwrap_or(last_ts);

    DrawdownStats {
        max_drawdown,
        average_drawdown: mean(
            &episodes
                .iter()
                .map(|episode| episode.trough_drawdown)
                .collect::<Vec<_>>(),
        ),
        risk_drawdown_score: max_drawdown
            .abs()
            .checked_div(denominator)
            .and_then(|ratio| ratio.checked_mul(dec!(100)))
            .unwrap_or(Decimal::ZERO),
        max_drawdown_length_hours: drawdown_lengths
            .iter()
            .max()
            .copied()
            .unwrap_or(Decimal::ZERO),
        recovery_time_hours: duration_hours(max_episode.trough_ts, recovery_end),
        average_recovery_length_hours: mean(&recovery_lengths),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn dt(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 20, hour, minute, 0).unwrap()
    }

    fn curve(values: &[(u32, u32, Decimal)]) -> (Vec<DateTime<Utc>>, Vec<Decimal>) {
        let timestamps = values.iter().map(|(h, m, _)| dt(*h, *m)).collect();
        let nets = values.iter().map(|(_, _, net)| *net).collect();
        (timestamps, nets)
    }

    #[test]
    fn no_episodes_when_equity_only_rises() {
        let (timestamps, nets) = curve(&[(10, 0, dec!(50)), (10, 1, dec!(25))]);
        assert!(build_drawdown_episodes(&timestamps, &nets).is_empty());
        assert_eq!(
            compute_drawdown_stats(&timestamps, &nets),
            DrawdownStats::default()
        );
    }

    #[test]
    fn trailing_drawdown_becomes_an_open_episode() {
        // Equity path: 50, 20, -5, 5. Never back to the 50 peak.
        let (timestamps, nets) = curve(&[
            (10, 0, dec!(50)),
            (10, 1, dec!(-30)),
            (10, 2, dec!(-25)),
            (10, 3, dec!(10)),
        ]);

        let episodes = build_drawdown_episodes(&timestamps, &nets);
        assert_eq!(episodes.len(), 1);
        let episode = episodes.first().unwrap();
        assert_eq!(episode.peak_equity, dec!(50));
        assert_eq!(episode.start_ts, dt(10, 1));
        assert_eq!(episode.trough_ts, dt(10, 2));
        assert_eq!(episode.end_ts, None);
        assert_eq!(episode.trough_drawdown, dec!(-55));

        let stats = compute_drawdown_stats(&timestamps, &nets);
        assert_eq!(stats.max_drawdown, dec!(-55));
        // Unrecovered: recovery runs to the last sample.
        assert_eq!(stats.recovery_time_hours, duration_hours(dt(10, 2), dt(10, 3)));
    }

    #[test]
    fn recovery_closes_the_episode_at_the_regaining_sample() {
        // Equity path: 100, 40, 160: drawdown starts at the second sample
        // and ends exactly when equity reaches a new peak.
        let (timestamps, nets) = curve(&[
            (9, 0, dec!(100)),
            (10, 0, dec!(-60)),
            (12, 0, dec!(120)),
        ]);

        let episodes = build_drawdown_episodes(&timestamps, &nets);
        assert_eq!(episodes.len(), 1);
        let episode = episodes.first().unwrap();
        assert_eq!(episode.start_ts, dt(10, 0));
        assert_eq!(episode.trough_ts, dt(10, 0));
        assert_eq!(episode.end_ts, Some(dt(12, 0)));
        assert_eq!(episode.trough_drawdown, dec!(-60));

        let stats = compute_drawdown_stats(&timestamps, &nets);
        assert_eq!(stats.max_drawdown, dec!(-60));
        assert_eq!(stats.recovery_time_hours, dec!(2));
        assert_eq!(stats.max_drawdown_length_hours, dec!(2));
        assert_eq!(stats.average_recovery_length_hours, dec!(2));
        // |max| / max(peak 100, |dd| 60, 1) * 100 = 60.
        assert_eq!(stats.risk_drawdown_score, dec!(60));
    }

    #[test]
    fn multiple_episodes_average_their_troughs() {
        // Equity: 100, 60, 110, 80, 120.
        let (timestamps, nets) = curve(&[
            (9, 0, dec!(100)),
            (9, 30, dec!(-40)),
            (10, 0, dec!(50)),
            (10, 30, dec!(-30)),
            (11, 0, dec!(40)),
        ]);

        let episodes = build_drawdown_episodes(&timestamps, &nets);
        assert_eq!(episodes.len(), 2);

        let stats = compute_drawdown_stats(&timestamps, &nets);
        assert_eq!(stats.max_drawdown, dec!(-40));
        assert_eq!(stats.average_drawdown, dec!(-35));
    }

    #[test]
    fn risk_score_floors_the_denominator_at_one() {
        // All-loss curve: peak stays 0, |max_dd| drives the denominator.
        let (timestamps, nets) = curve(&[(9, 0, dec!(-0.5))]);
        let stats = compute_drawdown_stats(&timestamps, &nets);
        assert_eq!(stats.max_drawdown, dec!(-0.5));
        assert_eq!(stats.risk_drawdown_score, dec!(50));
    }
}
