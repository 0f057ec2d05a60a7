//! Catalog reference data: depots and products

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A physical distribution point selling fertilizer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Depot {
    pub id: Uuid,
    /// Unique depot name (e.g., "MONZE")
    pub name: String,
    pub district: String,
    pub manager: String,
    pub phone: String,
    /// Manager's National Registration Card number
    pub nrc: String,
    pub created_at: DateTime<Utc>,
}

/// Depot fields supplied by setup or the API
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewDepot {
    pub name: String,
    pub district: String,
    pub manager: String,
    pub phone: String,
    pub nrc: String,
}

/// A fertilizer product sold by the bag
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: Uuid,
    /// Unique product name (e.g., "UREA")
    pub name: String,
    pub price_per_bag: Decimal,
    pub commission_per_bag: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Product fields supplied by setup or the API
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewProduct {
    pub name: String,
    #[serde(default = "default_price_per_bag")]
    pub price_per_bag: Decimal,
    #[serde(default = "default_commission_per_bag")]
    pub commission_per_bag: Decimal,
}

/// Default selling price of one bag
pub fn default_price_per_bag() -> Decimal {
    Decimal::new(120000, 2)
}

/// Default commission earned on one bag
pub fn default_commission_per_bag() -> Decimal {
    Decimal::new(5000, 2)
}

impl NewDepot {
    pub fn new(name: &str, district: &str, manager: &str, phone: &str, nrc: &str) -> Self {
        Self {
            name: name.to_string(),
            district: district.to_string(),
            manager: manager.to_string(),
            phone: phone.to_string(),
            nrc: nrc.to_string(),
        }
    }
}

impl NewProduct {
    /// Product at the default price and commission
    pub fn with_defaults(name: &str) -> Self {
        Self {
            name: name.to_string(),
            price_per_bag: default_price_per_bag(),
            commission_per_bag: default_commission_per_bag(),
        }
    }
}

/// Depots created by initial setup
pub fn initial_depots() -> Vec<NewDepot> {
    vec![
        NewDepot::new("MONZE", "MONZE", "Matimba Munang'andu", "0760382210", "198061/77/1"),
        NewDepot::new("PEMBA", "PEMBA", "Matimba Munang'andu", "0760382210", "198061/77/1"),
        NewDepot::new("KALOMO", "KALOMO", "Armin Halurka Scherrer", "0960110755", "214134/77/1"),
    ]
}

/// Products created by initial setup
pub fn initial_products() -> Vec<NewProduct> {
    vec![
        NewProduct::with_defaults("D-COMPOUND"),
        NewProduct::with_defaults("UREA"),
    ]
}

impl std::fmt::Display for Depot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {}", self.name, self.district)
    }
}

impl std::fmt::Display for Product {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}
