//! Settlement ledger tests
//!
//! Tests for UCF settlement including:
//! - Daily balance rollup
//! - Balance owed to UCF
//! - Materialized balances are replaced, never duplicated

use chrono::{NaiveDate, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::ledger::{Book, LedgerError};
use shared::{
    CounterpartyBalance, DailyBalance, DailySale, NewDepot, NewProduct, PaymentType,
    RecordPayment, RecordSale, UcfPayment,
};
use std::str::FromStr;
use uuid::Uuid;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 11, d).unwrap()
}

fn payment(date: NaiveDate, payment_type: PaymentType, amount: &str) -> RecordPayment {
    RecordPayment {
        date,
        payment_type,
        amount: dec(amount),
        description: format!("{} of K{}", payment_type.label(), amount),
        reference_number: None,
    }
}

fn sale_row(date: NaiveDate, total: &str, commission: &str) -> DailySale {
    DailySale {
        id: Uuid::new_v4(),
        date,
        depot_id: Uuid::new_v4(),
        product_id: Uuid::new_v4(),
        bags_sold: 1,
        total_amount: dec(total),
        commission_earned: dec(commission),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn payment_row(date: NaiveDate, payment_type: PaymentType, amount: &str) -> UcfPayment {
    UcfPayment {
        id: Uuid::new_v4(),
        date,
        payment_type,
        amount: dec(amount),
        description: "Bank transfer".to_string(),
        reference_number: Some("TRX-001".to_string()),
        created_at: Utc::now(),
    }
}

/// Book with MONZE/UREA stock of 10 MT at the default price
fn trading_book() -> (Book, RecordSale) {
    let mut book = Book::new();
    let (depot, _) = book
        .upsert_depot(NewDepot::new("MONZE", "MONZE", "Matimba Munang'andu", "0760382210", "198061/77/1"))
        .unwrap();
    let (product, _) = book.upsert_product(NewProduct::with_defaults("UREA")).unwrap();
    book.create_stock(depot.id, product.id, dec("10.00"), day(1))
        .unwrap();
    let sale = RecordSale {
        date: day(4),
        depot_id: depot.id,
        product_id: product.id,
        bags_sold: 1,
        accumulate: true,
    };
    (book, sale)
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// closing = opening + sales + commissions - payments
    #[test]
    fn test_rollup_two_sales() {
        let (mut book, sale) = trading_book();
        book.record_sale(&sale).unwrap();
        book.record_sale(&sale).unwrap();

        let balance = book.daily_balance(day(4), Some(Decimal::ZERO));

        assert_eq!(balance.total_sales, dec("2400"));
        assert_eq!(balance.total_commissions, dec("100"));
        assert_eq!(balance.total_payments, Decimal::ZERO);
        assert_eq!(balance.closing_balance, dec("2500"));
    }

    /// Receipts and other dates do not enter the day's rollup
    #[test]
    fn test_rollup_ignores_receipts_and_other_days() {
        let sales = vec![sale_row(day(4), "1200", "50"), sale_row(day(5), "2400", "100")];
        let payments = vec![
            payment_row(day(4), PaymentType::Payment, "300"),
            payment_row(day(4), PaymentType::Receipt, "1000"),
            payment_row(day(3), PaymentType::Payment, "999"),
        ];

        let balance = DailyBalance::calculate(day(4), dec("100"), &sales, &payments);

        assert_eq!(balance.total_sales, dec("1200"));
        assert_eq!(balance.total_payments, dec("300"));
        assert_eq!(balance.closing_balance, dec("1050"));
    }

    /// Balance owed = sales - payments + receipts
    #[test]
    fn test_counterparty_balance() {
        let sales = vec![sale_row(day(1), "6000", "250"), sale_row(day(2), "4000", "150")];
        let payments = vec![
            payment_row(day(3), PaymentType::Payment, "3000"),
            payment_row(day(3), PaymentType::Receipt, "500"),
        ];

        let balance = CounterpartyBalance::calculate(&sales, &payments);

        assert_eq!(balance.total_sales, dec("10000"));
        assert_eq!(balance.total_payments, dec("3000"));
        assert_eq!(balance.total_receipts, dec("500"));
        assert_eq!(balance.balance_owed, dec("7500"));
    }

    /// Saving a date twice replaces its row with freshly derived totals
    #[test]
    fn test_saved_balance_is_recomputed() {
        let (mut book, sale) = trading_book();
        book.record_sale(&sale).unwrap();
        let first = book.save_daily_balance(day(4), None).unwrap();
        assert_eq!(first.closing_balance, dec("1250"));

        book.record_payment(payment(day(4), PaymentType::Payment, "250"))
            .unwrap();
        let second = book.save_daily_balance(day(4), None).unwrap();

        assert_eq!(second.total_payments, dec("250"));
        assert_eq!(second.closing_balance, dec("1000"));
        assert_eq!(book.saved_daily_balance(day(4)), Some(&second));
    }

    /// Without an opening balance the previous saved closing balance carries forward
    #[test]
    fn test_opening_balance_carries_forward() {
        let (mut book, sale) = trading_book();
        book.record_sale(&sale).unwrap();
        book.save_daily_balance(day(4), Some(dec("500"))).unwrap();

        let next = book.daily_balance(day(6), None);
        assert_eq!(next.opening_balance, dec("1750"));
        assert_eq!(next.closing_balance, dec("1750"));
    }

    /// Payments must be positive with a description
    #[test]
    fn test_payment_validation() {
        let mut book = Book::new();

        let err = book
            .record_payment(payment(day(4), PaymentType::Payment, "0"))
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation { ref field, .. } if field == "amount"));

        let blank = RecordPayment {
            description: "  ".to_string(),
            ..payment(day(4), PaymentType::Receipt, "10")
        };
        let err = book.record_payment(blank).unwrap_err();
        assert!(matches!(err, LedgerError::Validation { ref field, .. } if field == "description"));
        assert!(book.payments().is_empty());
    }

    /// Payments list newest first
    #[test]
    fn test_payments_newest_first() {
        let mut book = Book::new();
        for d in [3, 9, 6] {
            book.record_payment(payment(day(d), PaymentType::Payment, "100"))
                .unwrap();
        }
        let dates: Vec<NaiveDate> = book.payments().iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![day(9), day(6), day(3)]);
    }

    /// Payment types round-trip through their stored names
    #[test]
    fn test_payment_type_names() {
        for payment_type in [PaymentType::Payment, PaymentType::Receipt] {
            assert_eq!(PaymentType::from_str(payment_type.as_str()), Ok(payment_type));
        }
        assert!(PaymentType::from_str("refund").is_err());
    }
}

// ============================================================================
// Property Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn amount_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..10_000_000).prop_map(|cents| Decimal::new(cents, 2))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Closing balance always follows the rollup identity
        #[test]
        fn prop_closing_balance_identity(
            opening in amount_strategy(),
            sales in prop::collection::vec((amount_strategy(), amount_strategy()), 0..10),
            paid in prop::collection::vec(amount_strategy(), 0..10)
        ) {
            let sale_rows: Vec<DailySale> = sales
                .iter()
                .map(|(total, commission)| sale_row(day(4), &total.to_string(), &commission.to_string()))
                .collect();
            let payment_rows: Vec<UcfPayment> = paid
                .iter()
                .map(|amount| payment_row(day(4), PaymentType::Payment, &amount.to_string()))
                .collect();

            let balance = DailyBalance::calculate(day(4), opening, &sale_rows, &payment_rows);

            let expected_sales: Decimal = sales.iter().map(|(t, _)| *t).sum();
            let expected_commissions: Decimal = sales.iter().map(|(_, c)| *c).sum();
            let expected_payments: Decimal = paid.iter().sum();
            prop_assert_eq!(
                balance.closing_balance,
                opening + expected_sales + expected_commissions - expected_payments
            );
        }

        /// Receipts raise and payments lower the amount owed
        #[test]
        fn prop_balance_owed(
            sales in amount_strategy(),
            paid in amount_strategy(),
            received in amount_strategy()
        ) {
            let balance = CounterpartyBalance::new(sales, paid, received);
            prop_assert_eq!(balance.balance_owed, sales - paid + received);
            prop_assert!(CounterpartyBalance::new(sales, paid, Decimal::ZERO).balance_owed < balance.balance_owed);
        }
    }
}
