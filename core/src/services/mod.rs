mod day_sync;
mod trade_sync;

pub use day_sync::{DaySyncReport, EnsureOutcome};
pub use trade_sync::RefreshReport;

pub(crate) use day_sync::ensure_trade_cache_for_request;
pub(crate) use trade_sync::refresh_account_trades;
