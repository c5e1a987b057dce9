use crate::client::ProjectXClient;
use chrono::{DateTime, Duration, Utc};
use model::{TradeEvent, UpstreamError};
use std::collections::{HashSet, VecDeque};
use std::time::Duration as StdDuration;
use tracing::warn;

/// Lazy, infinite sequence of user trade events built on polling.
///
/// Each poll re-fetches from one second before the watermark so rows that
/// land on the watermark instant are not lost; the set of order ids
/// already emitted at that instant prevents double emission. Drop the
/// iterator to cancel the stream.
pub struct TradeStream<'a> {
    client: &'a ProjectXClient,
    account_id: i64,
    watermark: DateTime<Utc>,
    seen_at_watermark: HashSet<String>,
    poll_interval: StdDuration,
    buffer: VecDeque<TradeEvent>,
    primed: bool,
}

impl std::fmt::Debug for TradeStream<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TradeStream")
            .field("account_id", &self.account_id)
            .field("watermark", &self.watermark)
            .finish()
    }
}

impl<'a> TradeStream<'a> {
    pub(crate) fn new(
        client: &'a ProjectXClient,
        account_id: i64,
        start: Option<DateTime<Utc>>,
        poll_interval_seconds: u64,
    ) -> Self {
        let watermark = start.unwrap_or_else(|| {
            Utc::now()
                .checked_sub_signed(Duration::minutes(15))
                .unwrap_or_else(Utc::now)
        });
        TradeStream {
            client,
            account_id,
            watermark,
            seen_at_watermark: HashSet::new(),
            poll_interval: StdDuration::from_secs(poll_interval_seconds.max(1)),
            buffer: VecDeque::new(),
            primed: false,
        }
    }

    fn poll(&mut self) -> Result<(), UpstreamError> {
        let lookback = self
            .watermark
            .checked_sub_signed(Duration::seconds(1))
            .unwrap_or(self.watermark);
        let events = self
            .client
            .fetch_trade_history(self.account_id, lookback, None, None, None)?;

        for event in events {
            if event.trade_timestamp < self.watermark {
                continue;
            }
            if event.trade_timestamp == self.watermark
                && self.seen_at_watermark.contains(&event.order_id)
            {
                continue;
            }
            if event.trade_timestamp > self.watermark {
                self.watermark = event.trade_timestamp;
                self.seen_at_watermark.clear();
            }
            self.seen_at_watermark.insert(event.order_id.clone());
            self.buffer.push_back(event);
        }
        Ok(())
    }
}

impl Iterator for TradeStream<'_> {
    type Item = Result<TradeEvent, UpstreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(event) = self.buffer.pop_front() {
                return Some(Ok(event));
            }
            if self.primed {
                std::thread::sleep(self.poll_interval);
            } else {
                self.primed = true;
            }
            if let Err(err) = self.poll() {
                warn!("Trade stream poll failed: {err}");
                return Some(Err(err));
            }
        }
    }
}
