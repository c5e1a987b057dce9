use crate::{AccountSummary, TradeEvent};
use chrono::{DateTime, Utc};
use std::error::Error;
use std::fmt;

/// Error surfaced by the upstream trade provider.
///
/// `status` carries the HTTP status when the gateway answered; network
/// failures and configuration problems have none, which the adapter maps
/// to a 500-class condition instead of a gateway error.
#[derive(Clone, Debug, PartialEq)]
pub struct UpstreamError {
    message: String,
    status: Option<u16>,
}

impl UpstreamError {
    /// An error tied to an HTTP response status.
    pub fn with_status(message: impl Into<String>, status: u16) -> Self {
        UpstreamError {
            message: message.into(),
            status: Some(status),
        }
    }

    /// An error with no HTTP status (network, configuration, bad payload).
    pub fn message(message: impl Into<String>) -> Self {
        UpstreamError {
            message: message.into(),
            status: None,
        }
    }

    /// HTTP status of the failed response, when one was received.
    pub fn status(&self) -> Option<u16> {
        self.status
    }
}

impl fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for UpstreamError {}

/// Upstream trade-history source.
///
/// The gateway client implements this; sync and analytics code depends on
/// the trait so orchestration is testable against stubs.
pub trait TradeHistoryProvider {
    /// List active, tradeable accounts sorted ascending by id.
    fn list_accounts(&self) -> Result<Vec<AccountSummary>, UpstreamError>;

    /// Fetch normalized, non-voided trade events for a window, sorted
    /// ascending by timestamp.
    fn fetch_trade_history(
        &self,
        account_id: i64,
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<Vec<TradeEvent>, UpstreamError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_error_distinguishes_status() {
        let with_status = UpstreamError::with_status("ProjectX request failed (401): denied", 401);
        assert_eq!(with_status.status(), Some(401));
        assert!(with_status.to_string().contains("401"));

        let network = UpstreamError::message("ProjectX network error: refused");
        assert_eq!(network.status(), None);
    }
}
