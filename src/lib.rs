//! # Bybit Risk Analyzer
//!
//! Position and portfolio risk analysis for Bybit USDT perpetuals, served
//! through a CLI report, an HTTP dashboard and a Telegram bot.
//!
//! ## Architecture
//!
//! - `config`: Configuration loading and validation
//! - `exchange`: Bybit v5 REST client, private order stream, wire types
//! - `analysis`: Position metrics, portfolio aggregation, account summaries
//! - `advisor`: LLM-backed suggestions with a rule-based fallback
//! - `report`: Plain-text terminal report
//! - `server`: Dashboard JSON API and static assets
//! - `telegram`: Chat bot and order notifications
//! - `utils`: Decimal parsing and number formatting

pub mod advisor;
pub mod analysis;
pub mod config;
pub mod exchange;
pub mod report;
pub mod server;
pub mod telegram;
pub mod utils;

pub use config::Config;
