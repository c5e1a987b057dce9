use crate::views;
use chrono::{DateTime, NaiveDate, Utc};
use clap::ArgMatches;
use daybook_core::{DaybookFacade, EnsureOutcome};
use db_sqlite::SqliteDatabase;
use model::time::{as_utc, parse_timestamp};
use projectx_broker::ProjectXClient;
use std::error::Error;

/// Routes parsed arguments onto the facade surface.
pub struct ArgDispatcher;

impl std::fmt::Debug for ArgDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArgDispatcher").finish()
    }
}

impl ArgDispatcher {
    /// Run the selected subcommand.
    pub fn dispatch(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
        match matches.subcommand() {
            Some(("accounts", _)) => Self::accounts(),
            Some(("refresh", sub)) => Self::refresh(matches, sub),
            Some(("trades", sub)) => Self::trades(matches, sub),
            Some(("summary", sub)) => Self::summary(matches, sub),
            Some(("calendar", sub)) => Self::calendar(matches, sub),
            Some(("day", sub)) => Self::day(matches, sub),
            Some(("stream", sub)) => Self::stream(sub),
            _ => Err("unknown command".into()),
        }
    }

    fn facade(matches: &ArgMatches) -> Result<DaybookFacade, Box<dyn Error>> {
        let raw_path: &String = matches
            .get_one("database")
            .ok_or("missing database path")?;
        let database_path = shellexpand::tilde(raw_path).to_string();
        if let Some(parent) = std::path::Path::new(&database_path).parent() {
            std::fs::create_dir_all(parent)?;
        }

        let factory = SqliteDatabase::new(&database_path);
        let client = ProjectXClient::from_env()?;
        Ok(DaybookFacade::new(Box::new(factory), Box::new(client)))
    }

    fn accounts() -> Result<(), Box<dyn Error>> {
        let client = ProjectXClient::from_env()?;
        let accounts = client.list_accounts()?;
        println!("{}", views::accounts_table(&accounts));
        Ok(())
    }

    fn refresh(matches: &ArgMatches, sub: &ArgMatches) -> Result<(), Box<dyn Error>> {
        let facade = Self::facade(matches)?;
        let account_id = required_account(sub)?;
        let report =
            facade.refresh_account_trades(account_id, parse_range(sub, "start")?, parse_range(sub, "end")?)?;
        println!(
            "Fetched {} events ({} inserted, {} updated).",
            report.fetched_count, report.inserted_count, report.updated_count
        );
        Ok(())
    }

    fn trades(matches: &ArgMatches, sub: &ArgMatches) -> Result<(), Box<dyn Error>> {
        let facade = Self::facade(matches)?;
        let account_id = required_account(sub)?;
        let start = parse_range(sub, "start")?;
        let end = parse_range(sub, "end")?;

        if sub.get_flag("refresh") || !facade.has_local_trades(account_id)? {
            facade.refresh_account_trades(account_id, start, end)?;
        }

        let limit: i64 = sub.get_one("limit").copied().ok_or("missing limit")?;
        let symbol = sub.get_one::<String>("symbol").map(String::as_str);
        let trades = facade.list_trade_events(account_id, limit, start, end, symbol)?;
        if sub.get_flag("json") {
            println!("{}", serde_json::to_string_pretty(&trades)?);
        } else {
            println!("{}", views::trades_table(&trades));
        }
        Ok(())
    }

    fn summary(matches: &ArgMatches, sub: &ArgMatches) -> Result<(), Box<dyn Error>> {
        let facade = Self::facade(matches)?;
        let account_id = required_account(sub)?;
        let start = parse_range(sub, "start")?;
        let end = parse_range(sub, "end")?;

        if sub.get_flag("refresh") || !facade.has_local_trades(account_id)? {
            facade.refresh_account_trades(account_id, start, end)?;
        }

        let summary = facade.summarize_trade_events(account_id, start, end)?;
        if sub.get_flag("json") {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        } else {
            println!("{}", views::summary_table(&summary));
        }
        Ok(())
    }

    fn calendar(matches: &ArgMatches, sub: &ArgMatches) -> Result<(), Box<dyn Error>> {
        let facade = Self::facade(matches)?;
        let account_id = required_account(sub)?;
        let start = parse_range(sub, "start")?;
        let end = parse_range(sub, "end")?;

        if sub.get_flag("refresh") || !facade.has_local_trades(account_id)? {
            facade.refresh_account_trades(account_id, start, end)?;
        }

        let calendar = facade.trade_event_pnl_calendar(account_id, start, end)?;
        if sub.get_flag("json") {
            println!("{}", serde_json::to_string_pretty(&calendar)?);
        } else {
            println!("{}", views::calendar_table(&calendar));
        }
        Ok(())
    }

    fn day(matches: &ArgMatches, sub: &ArgMatches) -> Result<(), Box<dyn Error>> {
        let facade = Self::facade(matches)?;
        let account_id = required_account(sub)?;
        let raw_date: &String = sub.get_one("date").ok_or("missing date")?;
        let date = NaiveDate::parse_from_str(raw_date, "%Y-%m-%d")
            .map_err(|_| format!("invalid date '{raw_date}', expected YYYY-MM-DD"))?;
        let day_start = date
            .and_hms_opt(0, 0, 0)
            .map(as_utc)
            .ok_or("invalid date")?;

        let outcome = facade.ensure_trade_cache_for_request(
            account_id,
            Some(day_start),
            Some(day_start),
            sub.get_flag("refresh"),
        )?;
        match outcome {
            EnsureOutcome::DaySync(report) if report.cache_hit => {
                println!("{}: cache hit ({}).", report.trade_date, report.status);
            }
            EnsureOutcome::DaySync(report) => {
                println!(
                    "{}: fetched {} events ({} inserted, {} updated), status {}{}.",
                    report.trade_date,
                    report.fetched_count,
                    report.inserted_count,
                    report.updated_count,
                    report.status,
                    if report.truncated { ", truncated" } else { "" }
                );
            }
            EnsureOutcome::Refreshed(report) => {
                println!(
                    "Refreshed: {} fetched, {} inserted.",
                    report.fetched_count, report.inserted_count
                );
            }
            EnsureOutcome::CacheHit => println!("Cache hit."),
        }
        Ok(())
    }

    fn stream(sub: &ArgMatches) -> Result<(), Box<dyn Error>> {
        let client = ProjectXClient::from_env()?;
        let account_id = required_account(sub)?;
        let from = parse_range(sub, "from")?;
        let poll_seconds: u64 = sub.get_one("poll-seconds").copied().ok_or("missing poll interval")?;

        for event in client.stream_user_trades(account_id, from, poll_seconds) {
            let event = event?;
            println!("{}", views::stream_line(&event));
        }
        Ok(())
    }
}

fn required_account(sub: &ArgMatches) -> Result<i64, Box<dyn Error>> {
    sub.get_one("account")
        .copied()
        .ok_or_else(|| "missing account id".into())
}

fn parse_range(sub: &ArgMatches, name: &str) -> Result<Option<DateTime<Utc>>, Box<dyn Error>> {
    let Some(raw) = sub.get_one::<String>(name) else {
        return Ok(None);
    };
    parse_timestamp(raw)
        .map(Some)
        .ok_or_else(|| format!("invalid timestamp '{raw}'").into())
}
