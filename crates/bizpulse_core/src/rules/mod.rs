//! Pure domain rules.
//!
//! # Responsibility
//! - Classify objective status from progress and calendar position.
//! - Resolve auto-linked metrics from lead/client snapshots.
//! - Aggregate progress ledgers and dashboard statistics.
//! - Derive dashboard alerts.
//!
//! # Invariants
//! - Nothing in this module performs I/O or reads the system clock; "now" is
//!   always an argument.
//! - Functions never fail: degenerate input short-circuits to a neutral value.

pub mod alerts;
pub mod auto_metric;
pub mod ledger;
pub mod stats;
pub mod status;
