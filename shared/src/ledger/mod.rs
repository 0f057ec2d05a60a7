//! Stock/ledger consistency core
//!
//! Every stock mutation is planned here first. A plan is a pure value describing the
//! new quantity and the audit entry that must be written with it; storage backends
//! (the PostgreSQL services and the in-memory [`Book`]) only persist plans inside a
//! single unit of work. Nothing is planned that would leave stock below zero.

mod book;
mod error;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    available_bags, bags_to_tonnes, Product, SaleAmounts, Stock, StockChangeType, StockHistory,
    BAGS_PER_TONNE,
};
use crate::validation::{validate_bags_sold, validate_quantity};

pub use book::{Book, HistoryFilter, UnitOfWork};
pub use error::{LedgerError, LedgerResult};

/// A validated, not yet persisted stock mutation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StockMutation {
    pub stock_id: Uuid,
    pub date: NaiveDate,
    pub previous_quantity: Decimal,
    pub new_quantity: Decimal,
    pub change_type: StockChangeType,
    pub bags_sold: Option<i64>,
    pub description: String,
}

impl StockMutation {
    pub fn quantity_change(&self) -> Decimal {
        self.new_quantity - self.previous_quantity
    }

    /// The audit entry recording this mutation
    pub fn to_history(&self, id: Uuid, created_at: DateTime<Utc>) -> StockHistory {
        StockHistory {
            id,
            stock_id: self.stock_id,
            date: self.date,
            previous_quantity: self.previous_quantity,
            new_quantity: self.new_quantity,
            change_type: self.change_type,
            bags_sold: self.bags_sold,
            quantity_change: self.quantity_change(),
            description: self.description.clone(),
            created_at,
        }
    }

    /// Stock row after the mutation is applied
    pub fn apply_to(&self, stock: &Stock, at: DateTime<Utc>) -> Stock {
        Stock {
            quantity: self.new_quantity,
            updated_at: at,
            ..stock.clone()
        }
    }
}

/// Plan a signed change of `delta` tonnes under any tag, including `Sale`.
///
/// Fails with `InsufficientStock` when the result would be negative; the requested bag
/// count is the delta rounded up to whole bags.
pub(crate) fn apply_delta(
    stock: &Stock,
    delta: Decimal,
    change_type: StockChangeType,
    description: Option<String>,
    date: NaiveDate,
) -> LedgerResult<StockMutation> {
    let new_quantity = stock
        .quantity
        .checked_add(delta)
        .ok_or_else(|| LedgerError::validation("delta", "Quantity change is out of range"))?;
    if new_quantity < Decimal::ZERO {
        let requested = (-delta)
            .checked_mul(Decimal::from(BAGS_PER_TONNE))
            .and_then(|bags| bags.ceil().to_i64())
            .unwrap_or(i64::MAX);
        return Err(LedgerError::InsufficientStock {
            available_bags: stock.available_bags(),
            requested_bags: requested,
        });
    }
    validate_quantity(new_quantity).map_err(|e| LedgerError::validation("quantity", e))?;

    Ok(StockMutation {
        stock_id: stock.id,
        date,
        previous_quantity: stock.quantity,
        new_quantity,
        change_type,
        bags_sold: None,
        description: description
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| describe_change(stock.quantity, new_quantity)),
    })
}

/// Plan a manual signed change of `delta` tonnes.
///
/// `Sale` is reserved for the sale recorder and is rejected here.
pub fn plan_adjustment(
    stock: &Stock,
    delta: Decimal,
    change_type: StockChangeType,
    description: Option<String>,
    date: NaiveDate,
) -> LedgerResult<StockMutation> {
    ensure_manual(change_type)?;
    apply_delta(stock, delta, change_type, description, date)
}

/// Plan a manual update that sets an absolute quantity.
///
/// `Sale` is reserved for the sale recorder and is rejected here.
pub fn set_quantity(
    stock: &Stock,
    new_quantity: Decimal,
    change_type: StockChangeType,
    description: Option<String>,
    date: NaiveDate,
) -> LedgerResult<StockMutation> {
    ensure_manual(change_type)?;
    validate_quantity(new_quantity).map_err(|e| LedgerError::validation("quantity", e))?;
    apply_delta(
        stock,
        new_quantity - stock.quantity,
        change_type,
        description,
        date,
    )
}

fn ensure_manual(change_type: StockChangeType) -> LedgerResult<()> {
    if change_type.is_manual() {
        Ok(())
    } else {
        Err(LedgerError::validation(
            "change_type",
            "sale entries can only be written by recording a sale",
        ))
    }
}

/// Everything a storage backend needs to commit a sale
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SalePlan {
    pub amounts: SaleAmounts,
    pub mutation: StockMutation,
    pub available_bags_before: i64,
    pub available_bags_after: i64,
}

/// Plan a sale of `bags_sold` bags against the stock row of the sold pair.
///
/// `stock` is `None` when the pair has no stock row, which is reported as
/// `NoStockRecord` rather than as zero availability.
pub fn plan_sale(
    stock: Option<&Stock>,
    depot_id: Uuid,
    product: &Product,
    date: NaiveDate,
    bags_sold: i64,
) -> LedgerResult<SalePlan> {
    validate_bags_sold(bags_sold).map_err(|e| LedgerError::validation("bags_sold", e))?;

    let stock = stock.ok_or(LedgerError::NoStockRecord {
        depot_id,
        product_id: product.id,
    })?;
    if stock.depot_id != depot_id || stock.product_id != product.id {
        return Err(LedgerError::validation(
            "stock",
            "stock row does not belong to the sold depot and product",
        ));
    }

    let available_bags_before = stock.available_bags();
    if !stock.can_sell(bags_sold) {
        return Err(LedgerError::InsufficientStock {
            available_bags: available_bags_before,
            requested_bags: bags_sold,
        });
    }

    let mut mutation = apply_delta(
        stock,
        -bags_to_tonnes(bags_sold),
        StockChangeType::Sale,
        Some(format!(
            "Stock reduced due to sale of {} bags on {}",
            bags_sold, date
        )),
        date,
    )?;
    mutation.bags_sold = Some(bags_sold);

    Ok(SalePlan {
        amounts: SaleAmounts::from_product(product, bags_sold),
        available_bags_after: available_bags(mutation.new_quantity),
        available_bags_before,
        mutation,
    })
}

/// Plan the initial addition recorded when a stock row is created with a quantity
pub fn plan_opening(stock: &Stock, date: NaiveDate) -> Option<StockMutation> {
    if stock.quantity <= Decimal::ZERO {
        return None;
    }
    Some(StockMutation {
        stock_id: stock.id,
        date,
        previous_quantity: Decimal::ZERO,
        new_quantity: stock.quantity,
        change_type: StockChangeType::Addition,
        bags_sold: None,
        description: format!("Opening stock of {} MT", stock.quantity),
    })
}

fn describe_change(old: Decimal, new: Decimal) -> String {
    format!("Stock updated from {} to {} MT", old, new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 11, 4).unwrap()
    }

    fn product() -> Product {
        Product {
            id: Uuid::new_v4(),
            name: "UREA".to_string(),
            price_per_bag: dec("1200.00"),
            commission_per_bag: dec("50.00"),
            created_at: Utc::now(),
        }
    }

    fn stock_of(product: &Product, quantity: &str) -> Stock {
        Stock {
            id: Uuid::new_v4(),
            depot_id: Uuid::new_v4(),
            product_id: product.id,
            quantity: dec(quantity),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_sale_plan_deducts_bags_as_tonnes() {
        let product = product();
        let stock = stock_of(&product, "2.00");
        let plan = plan_sale(Some(&stock), stock.depot_id, &product, day(), 10).unwrap();

        assert_eq!(plan.mutation.new_quantity, dec("1.50"));
        assert_eq!(plan.mutation.quantity_change(), dec("-0.50"));
        assert_eq!(plan.mutation.bags_sold, Some(10));
        assert_eq!(plan.mutation.change_type, StockChangeType::Sale);
        assert_eq!(plan.available_bags_before, 40);
        assert_eq!(plan.available_bags_after, 30);
        assert_eq!(plan.amounts.total_amount, dec("12000.00"));
        assert_eq!(plan.amounts.commission_earned, dec("500.00"));
    }

    #[test]
    fn test_sale_plan_insufficient_reports_shortfall() {
        let product = product();
        let stock = stock_of(&product, "1.00");
        let err = plan_sale(Some(&stock), stock.depot_id, &product, day(), 25).unwrap_err();

        assert_eq!(
            err,
            LedgerError::InsufficientStock {
                available_bags: 20,
                requested_bags: 25
            }
        );
        assert_eq!(err.shortfall(), Some(5));
        assert!(err.to_string().contains("short by 5 bags"));
    }

    #[test]
    fn test_sale_plan_without_stock_row() {
        let product = product();
        let depot_id = Uuid::new_v4();
        let err = plan_sale(None, depot_id, &product, day(), 1).unwrap_err();
        assert_eq!(
            err,
            LedgerError::NoStockRecord {
                depot_id,
                product_id: product.id
            }
        );
    }

    #[test]
    fn test_sale_plan_rejects_zero_and_negative_bags() {
        let product = product();
        let stock = stock_of(&product, "1.00");
        assert!(matches!(
            plan_sale(Some(&stock), stock.depot_id, &product, day(), 0),
            Err(LedgerError::Validation { .. })
        ));
        assert!(matches!(
            plan_sale(Some(&stock), stock.depot_id, &product, day(), -3),
            Err(LedgerError::Validation { .. })
        ));
    }

    #[test]
    fn test_sale_plan_rejects_foreign_stock_row() {
        let product = product();
        let stock = stock_of(&product, "1.00");
        let err = plan_sale(Some(&stock), Uuid::new_v4(), &product, day(), 1).unwrap_err();
        assert!(matches!(err, LedgerError::Validation { .. }));
    }

    #[test]
    fn test_fractional_bag_is_not_sellable() {
        let product = product();
        // 2.03 MT = 40.6 bags, only 40 whole bags
        let stock = stock_of(&product, "2.03");
        assert!(plan_sale(Some(&stock), stock.depot_id, &product, day(), 40).is_ok());
        assert!(plan_sale(Some(&stock), stock.depot_id, &product, day(), 41).is_err());
    }

    #[test]
    fn test_apply_delta_rejects_negative_result() {
        let product = product();
        let stock = stock_of(&product, "0.50");
        let err = apply_delta(
            &stock,
            dec("-0.52"),
            StockChangeType::Adjustment,
            None,
            day(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientStock {
                available_bags: 10,
                requested_bags: 11
            }
        );
    }

    #[test]
    fn test_apply_delta_addition() {
        let product = product();
        let stock = stock_of(&product, "0.50");
        let mutation = apply_delta(
            &stock,
            dec("3.25"),
            StockChangeType::Addition,
            Some("Delivery from UCF".to_string()),
            day(),
        )
        .unwrap();
        assert_eq!(mutation.new_quantity, dec("3.75"));
        assert_eq!(mutation.description, "Delivery from UCF");
        assert_eq!(mutation.bags_sold, None);
    }

    #[test]
    fn test_plan_adjustment_rejects_sale_tag() {
        let product = product();
        let stock = stock_of(&product, "2.00");
        let err = plan_adjustment(&stock, dec("-0.50"), StockChangeType::Sale, None, day())
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation { ref field, .. } if field == "change_type"));
    }

    #[test]
    fn test_plan_adjustment_overflowing_delta() {
        let product = product();
        let stock = stock_of(&product, "2.00");
        let err = plan_adjustment(&stock, Decimal::MAX, StockChangeType::Addition, None, day())
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation { ref field, .. } if field == "delta"));

        let err = plan_adjustment(&stock, Decimal::MIN, StockChangeType::Adjustment, None, day())
            .unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientStock {
                available_bags: 40,
                requested_bags: i64::MAX
            }
        );
    }

    #[test]
    fn test_quantity_above_storable_maximum() {
        let product = product();
        let stock = stock_of(&product, "2.00");
        let err = plan_adjustment(&stock, dec("100000000000000000000"), StockChangeType::Addition, None, day())
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation { ref field, .. } if field == "quantity"));
    }

    #[test]
    fn test_set_quantity_synthesizes_description() {
        let product = product();
        let stock = stock_of(&product, "5.00");
        let mutation = set_quantity(
            &stock,
            dec("4.25"),
            StockChangeType::Correction,
            Some("  ".to_string()),
            day(),
        )
        .unwrap();
        assert_eq!(mutation.description, "Stock updated from 5.00 to 4.25 MT");
        assert_eq!(mutation.quantity_change(), dec("-0.75"));
    }

    #[test]
    fn test_set_quantity_rejects_sale_tag() {
        let product = product();
        let stock = stock_of(&product, "5.00");
        let err = set_quantity(&stock, dec("4.00"), StockChangeType::Sale, None, day()).unwrap_err();
        assert!(matches!(err, LedgerError::Validation { ref field, .. } if field == "change_type"));
    }

    #[test]
    fn test_set_quantity_rejects_negative_and_excess_precision() {
        let product = product();
        let stock = stock_of(&product, "5.00");
        assert!(set_quantity(&stock, dec("-1"), StockChangeType::Adjustment, None, day()).is_err());
        assert!(set_quantity(&stock, dec("1.005"), StockChangeType::Adjustment, None, day()).is_err());
    }

    #[test]
    fn test_history_from_mutation() {
        let product = product();
        let stock = stock_of(&product, "1.00");
        let plan = plan_sale(Some(&stock), stock.depot_id, &product, day(), 5).unwrap();
        let history = plan.mutation.to_history(Uuid::new_v4(), Utc::now());
        assert_eq!(history.previous_quantity, dec("1.00"));
        assert_eq!(history.new_quantity, dec("0.75"));
        assert_eq!(history.quantity_change, dec("-0.25"));
        assert_eq!(history.change_in_bags(), -5);
    }

    #[test]
    fn test_opening_stock_mutation() {
        let product = product();
        assert!(plan_opening(&stock_of(&product, "0"), day()).is_none());
        let opening = plan_opening(&stock_of(&product, "12.5"), day()).unwrap();
        assert_eq!(opening.previous_quantity, Decimal::ZERO);
        assert_eq!(opening.change_type, StockChangeType::Addition);
    }
}
