//! Interface contracts for settlement storage backends.
//!
//! The engine never talks to a database directly; it goes through [`SettlementDatabase`]. The
//! trait is written so that every state transition is a conditional write: the backend only
//! applies a transition while the invoice is still in an open state, and reports back whether
//! anything changed. That property is what makes the settlement flow safe to re-run and is the
//! at-most-once guard for the subscription extender.
mod settlement_database;

pub use settlement_database::{SettlementDatabase, SettlementError};
