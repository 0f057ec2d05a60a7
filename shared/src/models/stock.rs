//! Stock levels and the stock audit trail

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Product;

/// Number of bags in one metric tonne. Every bag/tonne conversion goes through this.
pub const BAGS_PER_TONNE: i64 = 20;

/// Quantities and amounts are stored with two decimal places
pub const QUANTITY_SCALE: u32 = 2;

/// Current quantity on hand for one (depot, product) pair
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Stock {
    pub id: Uuid,
    pub depot_id: Uuid,
    pub product_id: Uuid,
    /// Quantity in metric tonnes, never negative
    pub quantity: Decimal,
    pub updated_at: DateTime<Utc>,
}

impl Stock {
    /// Whole bags that can be sold from this stock
    pub fn available_bags(&self) -> i64 {
        available_bags(self.quantity)
    }

    /// Whether `bags` can be sold without overdrawing
    pub fn can_sell(&self, bags: i64) -> bool {
        self.available_bags() >= bags
    }

    /// Value of the stock at the product's current bag price
    pub fn monetary_value(&self, product: &Product) -> Decimal {
        self.quantity
            .checked_mul(Decimal::from(BAGS_PER_TONNE))
            .and_then(|bags| bags.checked_mul(product.price_per_bag))
            .unwrap_or(Decimal::MAX)
    }
}

/// floor(quantity × BAGS_PER_TONNE); a missing or non-positive quantity has no bags
pub fn available_bags(quantity: Decimal) -> i64 {
    if quantity <= Decimal::ZERO {
        return 0;
    }
    quantity
        .checked_mul(Decimal::from(BAGS_PER_TONNE))
        .and_then(|bags| bags.floor().to_i64())
        .unwrap_or(i64::MAX)
}

/// Availability of a pair that may have no stock row yet
pub fn available_bags_for(stock: Option<&Stock>) -> i64 {
    stock.map(Stock::available_bags).unwrap_or(0)
}

/// Tonnes corresponding to a whole number of bags
pub fn bags_to_tonnes(bags: i64) -> Decimal {
    Decimal::from(bags) / Decimal::from(BAGS_PER_TONNE)
}

/// Classification of a stock mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockChangeType {
    Addition,
    Sale,
    Adjustment,
    Correction,
}

impl StockChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockChangeType::Addition => "addition",
            StockChangeType::Sale => "sale",
            StockChangeType::Adjustment => "adjustment",
            StockChangeType::Correction => "correction",
        }
    }

    /// Human readable label used in listings
    pub fn label(&self) -> &'static str {
        match self {
            StockChangeType::Addition => "Stock Addition",
            StockChangeType::Sale => "Stock Sale",
            StockChangeType::Adjustment => "Stock Adjustment",
            StockChangeType::Correction => "Stock Correction",
        }
    }

    /// Sale entries are written only by the sale recorder
    pub fn is_manual(&self) -> bool {
        !matches!(self, StockChangeType::Sale)
    }
}

impl std::fmt::Display for StockChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StockChangeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "addition" => Ok(StockChangeType::Addition),
            "sale" => Ok(StockChangeType::Sale),
            "adjustment" => Ok(StockChangeType::Adjustment),
            "correction" => Ok(StockChangeType::Correction),
            other => Err(format!("unknown stock change type: {other}")),
        }
    }
}

/// Immutable audit entry written for every stock mutation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StockHistory {
    pub id: Uuid,
    pub stock_id: Uuid,
    pub date: NaiveDate,
    pub previous_quantity: Decimal,
    pub new_quantity: Decimal,
    pub change_type: StockChangeType,
    /// Only set on sale entries
    pub bags_sold: Option<i64>,
    /// new_quantity - previous_quantity
    pub quantity_change: Decimal,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl StockHistory {
    /// Change expressed in bags, sign preserved
    pub fn change_in_bags(&self) -> i64 {
        (self.quantity_change * Decimal::from(BAGS_PER_TONNE))
            .trunc()
            .to_i64()
            .unwrap_or(0)
    }
}

/// Newest-first ordering used by every history listing
pub fn sort_newest_first(history: &mut [StockHistory]) {
    history.sort_by(|a, b| {
        b.date
            .cmp(&a.date)
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_available_bags_floors() {
        assert_eq!(available_bags(Decimal::from_str("2.03").unwrap()), 40);
        assert_eq!(available_bags(Decimal::from_str("-1").unwrap()), 0);
    }

    #[test]
    fn test_available_bags_saturates_instead_of_overflowing() {
        assert_eq!(available_bags(Decimal::MAX), i64::MAX);
    }
}
