//! LNHELPER: Telegram helper bot for Bitcoin transactions and
//! Lightning liquidity.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod liquidity;
pub mod providers;
pub mod chart;
pub mod storage;
pub mod bot;
