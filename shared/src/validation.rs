//! Validation utilities for the depot ledger
//!
//! Includes Zambia-specific checks for depot manager contact details.

use rust_decimal::Decimal;

use crate::models::QUANTITY_SCALE;

/// Largest quantity, per-bag price or commission that fits a `NUMERIC(12, 2)` column
pub const MAX_QUANTITY: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);

/// Largest payment amount that fits a `NUMERIC(14, 2)` column
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(276_447_231, 23_283, 0, false, 2);

// ============================================================================
// Ledger Validations
// ============================================================================

/// Validate a stock quantity in tonnes (non-negative, at most two decimal places)
pub fn validate_quantity(quantity: Decimal) -> Result<(), &'static str> {
    if quantity < Decimal::ZERO {
        return Err("Quantity cannot be negative");
    }
    if quantity > MAX_QUANTITY {
        return Err("Quantity is too large");
    }
    if quantity.round_dp(QUANTITY_SCALE) != quantity {
        return Err("Quantity supports at most two decimal places");
    }
    Ok(())
}

/// Validate the number of bags in a sale.
///
/// Zero is rejected even though a bag count may be any non-negative integer: a recorded
/// sale always deducts at least one bag and writes a priced sale row.
pub fn validate_bags_sold(bags: i64) -> Result<(), &'static str> {
    if bags < 0 {
        return Err("Bags sold cannot be negative");
    }
    if bags == 0 {
        return Err("At least one bag must be sold");
    }
    Ok(())
}

/// Validate a money amount (positive, at most two decimal places)
pub fn validate_amount(amount: Decimal) -> Result<(), &'static str> {
    if amount <= Decimal::ZERO {
        return Err("Amount must be positive");
    }
    if amount > MAX_AMOUNT {
        return Err("Amount is too large");
    }
    if amount.round_dp(QUANTITY_SCALE) != amount {
        return Err("Amount supports at most two decimal places");
    }
    Ok(())
}

/// Validate a per-bag price or commission (non-negative, at most two decimal places)
pub fn validate_unit_price(price: Decimal) -> Result<(), &'static str> {
    if price < Decimal::ZERO {
        return Err("Price cannot be negative");
    }
    if price > MAX_QUANTITY {
        return Err("Price is too large");
    }
    if price.round_dp(QUANTITY_SCALE) != price {
        return Err("Price supports at most two decimal places");
    }
    Ok(())
}

// ============================================================================
// General Validations
// ============================================================================

/// Validate a required name (1-100 characters after trimming)
pub fn validate_name(name: &str) -> Result<(), &'static str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("Name is required");
    }
    if trimmed.chars().count() > 100 {
        return Err("Name must be at most 100 characters");
    }
    Ok(())
}

/// Validate a required free-text description
pub fn validate_description(description: &str) -> Result<(), &'static str> {
    if description.trim().is_empty() {
        return Err("Description is required");
    }
    Ok(())
}

// ============================================================================
// Zambia-Specific Validations
// ============================================================================

/// Validate Zambian phone number format
/// Accepts: 0760382210, 076-038-2210, +260760382210
pub fn validate_zambian_phone(phone: &str) -> Result<(), &'static str> {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();

    // National format: 10 digits starting with 0
    if digits.len() == 10 && digits.starts_with('0') {
        return Ok(());
    }
    // International format with country code: 12 digits starting with 260
    if digits.len() == 12 && digits.starts_with("260") {
        return Ok(());
    }

    Err("Invalid Zambian phone number format")
}

/// Validate Zambian National Registration Card number
/// Format: NNNNNN/NN/N (e.g., 198061/77/1)
pub fn validate_nrc(nrc: &str) -> Result<(), &'static str> {
    let parts: Vec<&str> = nrc.split('/').collect();
    if parts.len() != 3 {
        return Err("NRC must be in format NNNNNN/NN/N");
    }

    let expected = [6, 2, 1];
    for (part, len) in parts.iter().zip(expected) {
        if part.len() != len || !part.chars().all(|c| c.is_ascii_digit()) {
            return Err("NRC must be in format NNNNNN/NN/N");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(dec("0")).is_ok());
        assert!(validate_quantity(dec("12.50")).is_ok());
        assert!(validate_quantity(dec("1.500")).is_ok());
        assert!(validate_quantity(dec("-0.01")).is_err());
        assert!(validate_quantity(dec("1.005")).is_err());
        assert!(validate_quantity(dec("9999999999.99")).is_ok());
        assert!(validate_quantity(dec("10000000000.00")).is_err());
    }

    #[test]
    fn test_validate_bags_sold() {
        assert!(validate_bags_sold(1).is_ok());
        assert!(validate_bags_sold(0).is_err());
        assert!(validate_bags_sold(-5).is_err());
    }

    #[test]
    fn test_validate_amount() {
        assert!(validate_amount(dec("3000.00")).is_ok());
        assert!(validate_amount(dec("0")).is_err());
        assert!(validate_amount(dec("-10")).is_err());
        assert!(validate_amount(dec("10.001")).is_err());
        assert!(validate_amount(dec("999999999999.99")).is_ok());
        assert!(validate_amount(Decimal::MAX).is_err());
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("MONZE").is_ok());
        assert!(validate_name("   ").is_err());
        assert!(validate_name(&"X".repeat(101)).is_err());
    }

    #[test]
    fn test_validate_zambian_phone() {
        assert!(validate_zambian_phone("0760382210").is_ok());
        assert!(validate_zambian_phone("076-038-2210").is_ok());
        assert!(validate_zambian_phone("+260760382210").is_ok());
        assert!(validate_zambian_phone("12345").is_err());
    }

    #[test]
    fn test_validate_nrc() {
        assert!(validate_nrc("198061/77/1").is_ok());
        assert!(validate_nrc("214134/77/1").is_ok());
        assert!(validate_nrc("198061-77-1").is_err());
        assert!(validate_nrc("19806/77/1").is_err());
        assert!(validate_nrc("198061/7a/1").is_err());
    }
}
