//! AUTOSWAP: price-conditional token swap bot for EVM chains.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod units;
pub mod aggregator;
pub mod chain;
pub mod strategy;
pub mod engine;
pub mod storage;
pub mod dashboard;
