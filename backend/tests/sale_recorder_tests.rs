//! Sale recorder tests
//!
//! Tests for recording sales including:
//! - Stock deduction by bags sold
//! - All-or-nothing failure with shortfall reporting
//! - Same-day accumulation and price snapshots

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::ledger::{self, Book, HistoryFilter, LedgerError};
use shared::{Depot, NewDepot, NewProduct, Product, RecordSale, Stock, StockChangeType};
use std::str::FromStr;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 11, d).unwrap()
}

fn catalog() -> (Book, Depot, Product) {
    let mut book = Book::new();
    let (depot, _) = book
        .upsert_depot(NewDepot::new("MONZE", "MONZE", "Matimba Munang'andu", "0760382210", "198061/77/1"))
        .unwrap();
    let (product, _) = book.upsert_product(NewProduct::with_defaults("UREA")).unwrap();
    (book, depot, product)
}

fn with_stock(quantity: &str) -> (Book, Depot, Product, Stock) {
    let (mut book, depot, product) = catalog();
    let stock = book
        .create_stock(depot.id, product.id, dec(quantity), day(1))
        .unwrap();
    (book, depot, product, stock)
}

fn sale(depot: &Depot, product: &Product, date: NaiveDate, bags: i64) -> RecordSale {
    RecordSale {
        date,
        depot_id: depot.id,
        product_id: product.id,
        bags_sold: bags,
        accumulate: true,
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Selling 25 bags out of 1.00 MT is short by 5 and changes nothing
    #[test]
    fn test_insufficient_stock_has_no_side_effects() {
        let (mut book, depot, product, stock) = with_stock("1.00");
        let history_before = book.history(&HistoryFilter::default()).len();

        let err = book
            .record_sale(&sale(&depot, &product, day(4), 25))
            .unwrap_err();

        assert_eq!(
            err,
            LedgerError::InsufficientStock {
                available_bags: 20,
                requested_bags: 25,
            }
        );
        assert_eq!(err.shortfall(), Some(5));
        assert!(err.to_string().contains("short by 5 bags"));
        assert_eq!(book.stock(stock.id).unwrap().quantity, dec("1.00"));
        assert!(book.sales().is_empty());
        assert_eq!(book.history(&HistoryFilter::default()).len(), history_before);
    }

    /// Selling against a pair with no stock row is reported as such
    #[test]
    fn test_missing_stock_row() {
        let (mut book, depot, product) = catalog();

        let err = book
            .record_sale(&sale(&depot, &product, day(4), 1))
            .unwrap_err();

        assert!(matches!(err, LedgerError::NoStockRecord { .. }));
        assert!(book.stocks().is_empty());
        assert!(book.sales().is_empty());
        assert!(book.history(&HistoryFilter::default()).is_empty());
    }

    /// A successful sale deducts bags / 20 tonnes and writes the sale entry
    #[test]
    fn test_sale_deducts_stock() {
        let (mut book, depot, product, stock) = with_stock("2.03");

        let outcome = book
            .record_sale(&sale(&depot, &product, day(4), 40))
            .unwrap();

        assert_eq!(outcome.available_bags_before, 40);
        assert_eq!(outcome.available_bags_after, 0);
        assert_eq!(book.stock(stock.id).unwrap().quantity, dec("0.03"));
        assert_eq!(outcome.history.change_type, StockChangeType::Sale);
        assert_eq!(outcome.history.bags_sold, Some(40));
        assert_eq!(
            outcome.history.description,
            "Stock reduced due to sale of 40 bags on 2024-11-04"
        );
        assert_eq!(outcome.sale.total_amount, dec("48000"));
        assert_eq!(outcome.sale.commission_earned, dec("2000"));
    }

    /// Zero bags is malformed input
    #[test]
    fn test_zero_bags_rejected() {
        let (mut book, depot, product, _) = with_stock("2.00");
        let err = book
            .record_sale(&sale(&depot, &product, day(4), 0))
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation { ref field, .. } if field == "bags_sold"));
        assert!(book.sales().is_empty());
    }

    /// Two sales on the same day fold into one row
    #[test]
    fn test_same_day_sales_accumulate() {
        let (mut book, depot, product, _) = with_stock("5.00");
        book.record_sale(&sale(&depot, &product, day(4), 10)).unwrap();
        let outcome = book.record_sale(&sale(&depot, &product, day(4), 5)).unwrap();

        assert_eq!(book.sales().len(), 1);
        assert_eq!(outcome.sale.bags_sold, 15);
        assert_eq!(outcome.sale.total_amount, dec("18000"));
        assert_eq!(outcome.amounts.bags_sold, 5);
        assert_eq!(outcome.available_bags_after, 85);
    }

    /// Opting out of accumulation turns a second same-day sale into a conflict
    #[test]
    fn test_duplicate_when_not_accumulating() {
        let (mut book, depot, product, stock) = with_stock("5.00");
        book.record_sale(&sale(&depot, &product, day(4), 10)).unwrap();

        let second = RecordSale {
            accumulate: false,
            ..sale(&depot, &product, day(4), 5)
        };
        let err = book.record_sale(&second).unwrap_err();

        assert!(matches!(err, LedgerError::DuplicateKey(_)));
        assert_eq!(book.stock(stock.id).unwrap().quantity, dec("4.50"));
        assert_eq!(book.sales()[0].bags_sold, 10);
    }

    /// Amounts stay at the price in force when the sale was recorded
    #[test]
    fn test_amounts_are_snapshotted() {
        let (mut book, depot, product, _) = with_stock("5.00");
        book.record_sale(&sale(&depot, &product, day(4), 2)).unwrap();

        let mut uow = book.begin();
        uow.set_product_price(product.id, dec("1500.00"), dec("75.00"))
            .unwrap();
        uow.commit();

        assert_eq!(book.sales()[0].total_amount, dec("2400"));
        assert_eq!(book.sales()[0].commission_earned, dec("100"));

        let later = book.record_sale(&sale(&depot, &product, day(5), 2)).unwrap();
        assert_eq!(later.sale.total_amount, dec("3000"));
    }

    /// A sale plan reports bag counts before and after
    #[test]
    fn test_plan_sale_bag_counts() {
        let (_, depot, product, stock) = with_stock("1.00");
        let plan = ledger::plan_sale(Some(&stock), depot.id, &product, day(4), 7).unwrap();

        assert_eq!(plan.available_bags_before, 20);
        assert_eq!(plan.available_bags_after, 13);
        assert_eq!(plan.mutation.new_quantity, dec("0.65"));
    }
}

// ============================================================================
// Property Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn quantity_strategy() -> impl Strategy<Value = Decimal> {
        (0i64..5_000).prop_map(|cents| Decimal::new(cents, 2))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// A committed sale removes exactly the bags sold; a rejected one removes nothing
        #[test]
        fn prop_sale_conserves_bags(
            quantity in quantity_strategy(),
            bags in 1i64..1_200
        ) {
            let (mut book, depot, product, stock) = with_stock(&quantity.to_string());
            let before = book.stock(stock.id).unwrap().available_bags();
            let entries_before = book.history(&HistoryFilter::default()).len();

            match book.record_sale(&sale(&depot, &product, day(4), bags)) {
                Ok(outcome) => {
                    prop_assert!(bags <= before);
                    prop_assert_eq!(outcome.available_bags_before, before);
                    prop_assert_eq!(outcome.available_bags_after, before - bags);
                    prop_assert_eq!(book.stock(stock.id).unwrap().available_bags(), before - bags);
                    prop_assert_eq!(book.history(&HistoryFilter::default()).len(), entries_before + 1);
                }
                Err(err) => {
                    prop_assert!(bags > before);
                    prop_assert_eq!(err.shortfall(), Some(bags - before));
                    prop_assert_eq!(book.stock(stock.id).unwrap().quantity, quantity);
                    prop_assert!(book.sales().is_empty());
                    prop_assert_eq!(book.history(&HistoryFilter::default()).len(), entries_before);
                }
            }
            prop_assert!(book.stock(stock.id).unwrap().quantity >= Decimal::ZERO);
        }
    }
}
