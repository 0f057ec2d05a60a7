//! Daily sales records

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Product, StockHistory};

/// Bags sold for one (date, depot, product), with amounts fixed at sale time
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailySale {
    pub id: Uuid,
    pub date: NaiveDate,
    pub depot_id: Uuid,
    pub product_id: Uuid,
    pub bags_sold: i64,
    pub total_amount: Decimal,
    pub commission_earned: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Amounts snapshotted from the product price when a sale is recorded
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SaleAmounts {
    pub bags_sold: i64,
    pub total_amount: Decimal,
    pub commission_earned: Decimal,
}

impl SaleAmounts {
    pub fn from_product(product: &Product, bags_sold: i64) -> Self {
        let bags = Decimal::from(bags_sold);
        Self {
            bags_sold,
            total_amount: bags * product.price_per_bag,
            commission_earned: bags * product.commission_per_bag,
        }
    }
}

impl DailySale {
    /// Fold another sale of the same key into this row
    pub fn accumulate(&mut self, amounts: &SaleAmounts, at: DateTime<Utc>) {
        self.bags_sold += amounts.bags_sold;
        self.total_amount += amounts.total_amount;
        self.commission_earned += amounts.commission_earned;
        self.updated_at = at;
    }
}

/// Sale request handed to the sale recorder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordSale {
    pub date: NaiveDate,
    pub depot_id: Uuid,
    pub product_id: Uuid,
    pub bags_sold: i64,
    /// Fold into an existing row for the same day instead of rejecting it
    #[serde(default = "default_accumulate")]
    pub accumulate: bool,
}

fn default_accumulate() -> bool {
    true
}

/// Result of a committed sale
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleOutcome {
    /// The (possibly accumulated) daily sale row
    pub sale: DailySale,
    /// Amounts contributed by this sale alone
    pub amounts: SaleAmounts,
    pub history: StockHistory,
    pub available_bags_before: i64,
    pub available_bags_after: i64,
}

/// Aggregates over a set of sales
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SalesTotals {
    pub total_bags: i64,
    pub total_sales: Decimal,
    pub total_commissions: Decimal,
}

impl SalesTotals {
    pub fn from_sales<'a>(sales: impl IntoIterator<Item = &'a DailySale>) -> Self {
        sales.into_iter().fold(Self::default(), |mut acc, sale| {
            acc.total_bags += sale.bags_sold;
            acc.total_sales += sale.total_amount;
            acc.total_commissions += sale.commission_earned;
            acc
        })
    }
}
