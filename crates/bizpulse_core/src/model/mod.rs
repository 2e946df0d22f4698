//! Domain records for spaces, CRM and objectives.
//!
//! # Responsibility
//! - Define the canonical records shared by repositories, rules and services.
//! - Own write-path validation for every record.
//!
//! # Invariants
//! - Every record except `Space` carries the `SpaceId` it belongs to.
//! - Records are validated before persistence and after loading.

pub mod client;
pub mod lead;
pub mod objective;
pub mod space;
pub mod validation;
