//! Domain models for the depot ledger

mod catalog;
mod sale;
mod settlement;
mod stock;

pub use catalog::*;
pub use sale::*;
pub use settlement::*;
pub use stock::*;
