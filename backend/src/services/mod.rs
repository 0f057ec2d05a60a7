//! Business logic services for the depot ledger

pub mod catalog;
pub mod reporting;
pub mod sales;
pub mod settlement;
pub mod stock;

pub use catalog::CatalogService;
pub use reporting::ReportingService;
pub use sales::SalesService;
pub use settlement::SettlementService;
pub use stock::StockService;
