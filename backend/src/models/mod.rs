//! Domain models for the depot ledger server
//!
//! Re-exports the models defined in the shared crate

pub use shared::models::*;
