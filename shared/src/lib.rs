//! Shared types and ledger core for the depot ledger
//!
//! This crate contains the domain models and the stock/ledger consistency rules shared
//! between the backend, the browser client (via WASM), and tests.

pub mod ledger;
pub mod models;
pub mod report;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
