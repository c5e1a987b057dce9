//! Daybook CLI - Command Line Interface for the trade-history mirror
//!
//! This binary is the thin adapter over the Daybook core: it wires the
//! SQLite store and the ProjectX gateway client into the facade and maps
//! subcommands onto the facade surface.

// === FINANCIAL APPLICATION SAFETY LINTS ===
// These lint rules are critical for financial applications where precision,
// safety, and reliability are paramount. Violations can lead to financial losses.

#![deny(
    // Error handling safety - force proper error handling
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic,

    // Financial precision safety - prevent calculation errors
    clippy::float_arithmetic,
    clippy::arithmetic_side_effects,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,

    // Code quality enforcement
    clippy::cognitive_complexity,
    clippy::too_many_lines,
)]
// Allow unwrap and expect in test code only
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]
// Standard Rust lints for code quality
#![warn(missing_docs, rust_2018_idioms, missing_debug_implementations)]

use clap::{Arg, ArgAction, Command};

mod dispatcher;
mod views;

use dispatcher::ArgDispatcher;

const DEFAULT_DATABASE_PATH: &str = "~/.daybook/daybook.db";

fn account_arg() -> Arg {
    Arg::new("account")
        .help("Gateway account id")
        .required(true)
        .value_parser(clap::value_parser!(i64))
}

fn range_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("start")
                .long("start")
                .help("Inclusive UTC range start (ISO-8601)"),
        )
        .arg(
            Arg::new("end")
                .long("end")
                .help("Inclusive UTC range end (ISO-8601)"),
        )
}

fn refresh_arg() -> Arg {
    Arg::new("refresh")
        .long("refresh")
        .help("Force an upstream sync before reading")
        .action(ArgAction::SetTrue)
}

fn json_arg() -> Arg {
    Arg::new("json")
        .long("json")
        .help("Emit JSON instead of a table")
        .action(ArgAction::SetTrue)
}

fn build_cli() -> Command {
    Command::new("daybook")
        .about("Mirror broker trade history locally and compute performance analytics")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("database")
                .long("database")
                .global(true)
                .default_value(DEFAULT_DATABASE_PATH)
                .help("Path to the local SQLite database"),
        )
        .subcommand(Command::new("accounts").about("List tradeable gateway accounts"))
        .subcommand(range_args(
            Command::new("refresh")
                .about("Sync an account's trade history into the local mirror")
                .arg(account_arg()),
        ))
        .subcommand(
            range_args(
                Command::new("trades")
                    .about("List cached closed trades, newest first")
                    .arg(account_arg()),
            )
            .arg(
                Arg::new("limit")
                    .long("limit")
                    .default_value("200")
                    .value_parser(clap::value_parser!(i64))
                    .help("Maximum rows to list"),
            )
            .arg(
                Arg::new("symbol")
                    .long("symbol")
                    .help("Case-insensitive symbol filter"),
            )
            .arg(refresh_arg())
            .arg(json_arg()),
        )
        .subcommand(
            range_args(
                Command::new("summary")
                    .about("Compute the performance summary over cached trades")
                    .arg(account_arg()),
            )
            .arg(refresh_arg())
            .arg(json_arg()),
        )
        .subcommand(
            range_args(
                Command::new("calendar")
                    .about("Compute the daily P&L calendar over cached trades")
                    .arg(account_arg()),
            )
            .arg(refresh_arg())
            .arg(json_arg()),
        )
        .subcommand(
            Command::new("day")
                .about("Sync one UTC trade date through the day-sync hot path")
                .arg(account_arg())
                .arg(
                    Arg::new("date")
                        .help("UTC calendar date (YYYY-MM-DD)")
                        .required(true),
                )
                .arg(refresh_arg()),
        )
        .subcommand(
            Command::new("stream")
                .about("Poll the gateway and print trade events as they arrive")
                .arg(account_arg())
                .arg(
                    Arg::new("from")
                        .long("from")
                        .help("Watermark start (ISO-8601); defaults to 15 minutes ago"),
                )
                .arg(
                    Arg::new("poll-seconds")
                        .long("poll-seconds")
                        .default_value("5")
                        .value_parser(clap::value_parser!(u64))
                        .help("Seconds between polls (floor 1)"),
                ),
        )
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let matches = build_cli().get_matches();
    if let Err(error) = ArgDispatcher::dispatch(&matches) {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}
