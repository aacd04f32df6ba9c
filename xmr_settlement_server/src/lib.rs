//! The settlement watcher daemon.
//!
//! This binary crate hosts the poll loop that drives the settlement engine: on a fixed interval
//! it expires stale invoices, asks the wallet for the chain height once, fetches the incoming
//! transfers for each open invoice's subaddress, and lets
//! [`xmr_settlement_engine::SettlementFlowApi`] advance each invoice. Everything is wired from
//! environment variables; a missing wallet RPC URL disables the watcher with a warning instead
//! of taking the process down.
pub mod config;
pub mod errors;
pub mod watcher;
