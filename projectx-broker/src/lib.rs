//! Daybook ProjectX Broker Implementation
//!
//! This crate provides the ProjectX gateway integration for the Daybook
//! trade-history mirror: token-authenticated HTTP, event normalization and
//! a poll-based trade stream.

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

mod accounts;
mod client;
mod config;
mod normalizer;
mod stream;
mod token;

pub use client::ProjectXClient;
pub use config::ProjectXConfig;
pub use stream::TradeStream;
