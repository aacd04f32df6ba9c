//! XMR Settlement Engine
//!
//! The settlement engine is the core of the Monero subscription gateway: it reconciles incoming
//! on-chain transfers against pending invoices and activates subscriptions exactly once per
//! confirmed invoice. The engine is deliberately split along two seams:
//!
//! 1. Storage. Backends implement the [`SettlementDatabase`] trait. A SQLite implementation
//!    ([`SqliteDatabase`]) ships with the crate; the invoice-creation API and admin tooling talk
//!    to the same tables but only the watcher transitions invoice state.
//! 2. Matching. The invoice matcher ([`mod@helpers::matcher`]) is a pure function over the
//!    transfer list and chain height, so the interesting settlement decisions are testable
//!    without a database or a wallet daemon.
//!
//! [`SettlementFlowApi`] ties the two together: given one invoice and the transfers visible for
//! its receiving subaddress, it advances the invoice through
//! `Pending → Paid → Confirmed` (or `Expired`), persisting each transition as a single
//! conditional update so that status only ever moves forward, and invokes the subscription
//! extender on the poll that crosses into `Confirmed`.
pub mod db_types;
pub mod helpers;
mod settlement_api;
#[cfg(feature = "sqlite")]
mod sqlite;
mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use settlement_api::{SettlementFlowApi, SettlementOutcome};
#[cfg(feature = "sqlite")]
pub use sqlite::{db_url, new_pool, run_migrations, SqliteDatabase};
pub use traits::{SettlementDatabase, SettlementError};
