mod day_syncs;
mod trade_events;

pub use day_syncs::DaySyncDB;
pub use trade_events::TradeEventDB;
