//! Catalog and report export tests
//!
//! Tests for:
//! - Idempotent catalog seeding by name
//! - Zambian contact detail validation
//! - Sales report layout and file naming

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::ledger::Book;
use shared::report::{SalesReport, SalesReportRow};
use shared::{
    initial_depots, initial_products, validate_nrc, validate_zambian_phone, DateRange, NewProduct,
    RecordSale,
};
use std::str::FromStr;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 11, d).unwrap()
}

fn seed(book: &mut Book) -> (usize, usize) {
    let depots = initial_depots()
        .into_iter()
        .filter(|d| book.upsert_depot(d.clone()).unwrap().1)
        .count();
    let products = initial_products()
        .into_iter()
        .filter(|p| book.upsert_product(p.clone()).unwrap().1)
        .count();
    (depots, products)
}

/// Rows for a report over the book's sales, names resolved from the catalog
fn report_rows(book: &Book, range: DateRange) -> Vec<SalesReportRow> {
    book.sales_between(range)
        .into_iter()
        .map(|sale| SalesReportRow {
            date: sale.date,
            depot: book
                .depots()
                .iter()
                .find(|d| d.id == sale.depot_id)
                .unwrap()
                .name
                .clone(),
            product: book
                .products()
                .iter()
                .find(|p| p.id == sale.product_id)
                .unwrap()
                .name
                .clone(),
            bags_sold: sale.bags_sold,
            total_amount: sale.total_amount,
            commission_earned: sale.commission_earned,
        })
        .collect()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// The initial catalog
    #[test]
    fn test_initial_catalog() {
        let names: Vec<String> = initial_depots().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["MONZE", "PEMBA", "KALOMO"]);

        for product in initial_products() {
            assert_eq!(product.price_per_bag, dec("1200.00"));
            assert_eq!(product.commission_per_bag, dec("50.00"));
        }
    }

    /// Replaying the seed creates nothing
    #[test]
    fn test_seed_is_idempotent() {
        let mut book = Book::new();

        assert_eq!(seed(&mut book), (3, 2));
        assert_eq!(seed(&mut book), (0, 0));
        assert_eq!(book.depots().len(), 3);
        assert_eq!(book.products().len(), 2);
    }

    /// Upsert by name returns the stored row untouched
    #[test]
    fn test_upsert_keeps_existing_product() {
        let mut book = Book::new();
        let (first, created) = book.upsert_product(NewProduct::with_defaults("UREA")).unwrap();
        assert!(created);

        let again = NewProduct {
            price_per_bag: dec("999.00"),
            ..NewProduct::with_defaults("UREA")
        };
        let (second, created) = book.upsert_product(again).unwrap();
        assert!(!created);
        assert_eq!(second.id, first.id);
        assert_eq!(second.price_per_bag, dec("1200.00"));
    }

    /// Seeded managers have valid contact details
    #[test]
    fn test_seed_contacts_are_valid() {
        for depot in initial_depots() {
            assert!(validate_zambian_phone(&depot.phone).is_ok(), "{}", depot.phone);
            assert!(validate_nrc(&depot.nrc).is_ok(), "{}", depot.nrc);
        }
    }

    /// Phone numbers in national and international form
    #[test]
    fn test_zambian_phone_formats() {
        assert!(validate_zambian_phone("0760382210").is_ok());
        assert!(validate_zambian_phone("076-038-2210").is_ok());
        assert!(validate_zambian_phone("+260760382210").is_ok());
        assert!(validate_zambian_phone("760382210").is_err());
        assert!(validate_zambian_phone("+27760382210").is_err());
    }

    /// Text report over recorded sales
    #[test]
    fn test_text_report_from_sales() {
        let mut book = Book::new();
        seed(&mut book);
        let depot = book.depots()[0].clone();
        let product = book.products()[1].clone();
        book.create_stock(depot.id, product.id, dec("5.00"), day(1))
            .unwrap();
        for (d, bags) in [(4, 2), (4, 1), (6, 5)] {
            book.record_sale(&RecordSale {
                date: day(d),
                depot_id: depot.id,
                product_id: product.id,
                bags_sold: bags,
                accumulate: true,
            })
            .unwrap();
        }

        let range = DateRange::new(day(1), day(30)).unwrap();
        let report = SalesReport::new(range, report_rows(&book, range));
        let text = report.render_text("CMM Chronos Ltd", "K");
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(report.filename("txt"), "sales_report_2024-11-01_to_2024-11-30.txt");
        assert_eq!(lines[0], "CMM Chronos Ltd - Sales Report (2024-11-01 to 2024-11-30)");
        assert_eq!(lines[1], "=".repeat(60));
        assert!(lines[2].starts_with("Date         Depot"));
        assert_eq!(lines.len(), 2 + 2 + 2 + 2);
        assert!(lines[4].starts_with("2024-11-04   MONZE"));
        assert!(lines[4].contains("K3600.00"));
        assert!(lines[5].contains("K6000.00"));
        assert!(lines[7].starts_with("TOTAL"));
        assert!(lines[7].contains("K9600.00"));
        assert!(lines[7].ends_with("K400.00"));
    }

    /// Sales outside the range are left out
    #[test]
    fn test_report_range_is_inclusive() {
        let mut book = Book::new();
        seed(&mut book);
        let depot = book.depots()[0].clone();
        let product = book.products()[0].clone();
        book.create_stock(depot.id, product.id, dec("5.00"), day(1))
            .unwrap();
        for d in [3, 4, 5, 6] {
            book.record_sale(&RecordSale {
                date: day(d),
                depot_id: depot.id,
                product_id: product.id,
                bags_sold: 1,
                accumulate: true,
            })
            .unwrap();
        }

        let range = DateRange::new(day(4), day(5)).unwrap();
        let report = SalesReport::new(range, report_rows(&book, range));
        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.totals.total_bags, 2);
        assert_eq!(report.totals.total_sales, dec("2400"));
    }
}

// ============================================================================
// Property Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Any well-formed NRC passes
        #[test]
        fn prop_valid_nrc(nrc in "[0-9]{6}/[0-9]{2}/[0-9]") {
            prop_assert!(validate_nrc(&nrc).is_ok());
        }

        /// Any national mobile number passes
        #[test]
        fn prop_valid_phone(phone in "0[79][5-7][0-9]{7}") {
            prop_assert!(validate_zambian_phone(&phone).is_ok());
        }

        /// Seeding any number of times leaves one row per name
        #[test]
        fn prop_seed_replays(replays in 1usize..5) {
            let mut book = Book::new();
            for _ in 0..replays {
                seed(&mut book);
            }
            prop_assert_eq!(book.depots().len(), 3);
            prop_assert_eq!(book.products().len(), 2);
        }
    }
}
