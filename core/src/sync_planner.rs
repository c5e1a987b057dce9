//! Window planning for account refreshes.
//!
//! A refresh pulls one or more time windows from the gateway: an explicit
//! window when the caller gave one, a lookback window on first sync, and
//! otherwise an optional backfill window plus an incremental tail. Windows
//! are then split into bounded chunks so each commit stays small.

use crate::validators::ValidationError;
use chrono::{DateTime, Duration, Utc};

/// Overlap applied to incremental windows so late-arriving rows with
/// timestamps at or before the previous latest are still picked up.
const INCREMENTAL_OVERLAP_MINUTES: i64 = 5;

/// Decide which windows a refresh must pull.
pub fn build_sync_windows(
    start: Option<DateTime<Utc>>,
    end: DateTime<Utc>,
    now: DateTime<Utc>,
    latest_local: Option<DateTime<Utc>>,
    earliest_local: Option<DateTime<Utc>>,
    lookback_days: i64,
) -> Result<Vec<(DateTime<Utc>, DateTime<Utc>)>, ValidationError> {
    let effective_lookback_days = lookback_days.max(1);

    if let Some(start) = start {
        if start > end {
            return Err(ValidationError::StartAfterEnd);
        }
        return Ok(vec![(start, end)]);
    }

    let history_floor = now
        .checked_sub_signed(Duration::days(effective_lookback_days))
        .unwrap_or(now);

    let Some(latest) = latest_local else {
        if history_floor > end {
            return Err(ValidationError::StartAfterEnd);
        }
        return Ok(vec![(history_floor, end)]);
    };

    let mut windows: Vec<(DateTime<Utc>, DateTime<Utc>)> = Vec::new();

    // Backfill older history if the earliest local event is newer than the
    // lookback floor.
    if let Some(earliest) = earliest_local {
        if earliest > history_floor {
            windows.push((history_floor, earliest));
        }
    }

    let overlap_start = latest
        .checked_sub_signed(Duration::minutes(INCREMENTAL_OVERLAP_MINUTES))
        .unwrap_or(latest);
    windows.push((overlap_start, end));

    Ok(windows
        .into_iter()
        .filter(|(window_start, window_end)| window_start <= window_end)
        .collect())
}

/// Split a window into contiguous half-open chunks.
///
/// Consecutive chunks are separated by one microsecond so no endpoint is
/// shared and re-fetching a boundary row is the upsert's problem, not the
/// planner's.
pub fn iter_time_chunks(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    chunk_days: i64,
) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
    if start > end {
        return Vec::new();
    }

    let span = Duration::days(chunk_days.max(1));
    let mut chunks: Vec<(DateTime<Utc>, DateTime<Utc>)> = Vec::new();
    let mut cursor = start;

    while cursor <= end {
        let chunk_end = cursor
            .checked_add_signed(span)
            .map(|tentative| tentative.min(end))
            .unwrap_or(end);
        chunks.push((cursor, chunk_end));
        if chunk_end >= end {
            break;
        }
        cursor = match chunk_end.checked_add_signed(Duration::microseconds(1)) {
            Some(next) => next,
            None => break,
        };
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn dt(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, day, hour, minute, 0).unwrap()
    }

    #[test]
    fn explicit_start_and_end_win() {
        let windows = build_sync_windows(
            Some(dt(3, 9, 30)),
            dt(5, 16, 0),
            dt(20, 0, 0),
            None,
            None,
            365,
        )
        .unwrap();

        assert_eq!(windows, vec![(dt(3, 9, 30), dt(5, 16, 0))]);
    }

    #[test]
    fn explicit_inverted_range_is_rejected() {
        let err = build_sync_windows(
            Some(dt(20, 12, 0)),
            dt(20, 11, 59),
            dt(20, 12, 0),
            None,
            None,
            30,
        )
        .unwrap_err();
        assert_eq!(err, ValidationError::StartAfterEnd);
    }

    #[test]
    fn first_sync_uses_the_lookback_floor() {
        let now = dt(20, 12, 0);
        let windows = build_sync_windows(None, now, now, None, None, 30).unwrap();
        assert_eq!(windows, vec![(now - Duration::days(30), now)]);
    }

    #[test]
    fn incremental_only_when_history_floor_is_covered() {
        let now = dt(20, 12, 0);
        let latest = dt(19, 14, 10);
        let earliest = dt(1, 8, 0);

        let windows = build_sync_windows(None, now, now, Some(latest), Some(earliest), 10).unwrap();
        assert_eq!(windows, vec![(latest - Duration::minutes(5), now)]);
    }

    #[test]
    fn partial_local_history_gets_a_backfill_window() {
        let now = dt(20, 12, 0);
        let latest = dt(19, 14, 10);
        let earliest = dt(18, 1, 0);
        let history_floor = now - Duration::days(30);

        let windows = build_sync_windows(None, now, now, Some(latest), Some(earliest), 30).unwrap();
        assert_eq!(
            windows,
            vec![
                (history_floor, earliest),
                (latest - Duration::minutes(5), now),
            ]
        );
    }

    #[test]
    fn moving_latest_forward_never_widens_the_incremental_window() {
        let now = dt(20, 12, 0);
        let earliest = dt(1, 8, 0);
        let mut previous_start = None;

        for hour in [8, 10, 11] {
            let latest = dt(19, hour, 0);
            let windows =
                build_sync_windows(None, now, now, Some(latest), Some(earliest), 10).unwrap();
            let (incremental_start, _) = *windows.last().unwrap();
            if let Some(previous) = previous_start {
                assert!(incremental_start > previous);
            }
            previous_start = Some(incremental_start);
        }
    }

    #[test]
    fn chunks_are_contiguous_and_never_share_endpoints() {
        let start = dt(1, 0, 0);
        let end = dt(3, 6, 0);

        let chunks = iter_time_chunks(start, end, 1);

        assert_eq!(chunks.len(), 3);
        assert_eq!(*chunks.first().unwrap(), (start, dt(2, 0, 0)));
        let second = *chunks.get(1).unwrap();
        assert_eq!(second.0, dt(2, 0, 0) + Duration::microseconds(1));
        assert_eq!(second.1, dt(3, 0, 0) + Duration::microseconds(1));
        let third = *chunks.get(2).unwrap();
        assert_eq!(third.0, dt(3, 0, 0) + Duration::microseconds(2));
        assert_eq!(third.1, end);
    }

    #[test]
    fn short_windows_yield_a_single_chunk() {
        let start = dt(1, 0, 0);
        let end = dt(1, 6, 0);
        assert_eq!(iter_time_chunks(start, end, 90), vec![(start, end)]);
        assert_eq!(iter_time_chunks(start, start, 90), vec![(start, start)]);
        assert!(iter_time_chunks(end, start, 90).is_empty());
    }
}
