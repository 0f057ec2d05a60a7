//! HTTP handlers for the depot ledger API

mod catalog;
mod health;
mod reporting;
mod sales;
mod settlement;
mod stock;

pub use catalog::*;
pub use health::*;
pub use reporting::*;
pub use sales::*;
pub use settlement::*;
pub use stock::*;
