//! Counterparty (UCF) payments and balance rollups

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{DailySale, SalesTotals};

/// Direction of a money movement with UCF
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentType {
    /// Paid to UCF
    Payment,
    /// Received from UCF
    Receipt,
}

impl PaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentType::Payment => "payment",
            PaymentType::Receipt => "receipt",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PaymentType::Payment => "Payment to UCF",
            PaymentType::Receipt => "Receipt from UCF",
        }
    }
}

impl std::fmt::Display for PaymentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PaymentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "payment" => Ok(PaymentType::Payment),
            "receipt" => Ok(PaymentType::Receipt),
            other => Err(format!("unknown payment type: {other}")),
        }
    }
}

/// A payment to or receipt from UCF
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UcfPayment {
    pub id: Uuid,
    pub date: NaiveDate,
    pub payment_type: PaymentType,
    pub amount: Decimal,
    pub description: String,
    pub reference_number: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Payment request handed to the settlement ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordPayment {
    pub date: NaiveDate,
    pub payment_type: PaymentType,
    pub amount: Decimal,
    pub description: String,
    pub reference_number: Option<String>,
}

/// Per-date rollup. A projection of sales and payments, recomputed on every save.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyBalance {
    pub date: NaiveDate,
    pub opening_balance: Decimal,
    pub total_sales: Decimal,
    pub total_commissions: Decimal,
    pub total_payments: Decimal,
    pub closing_balance: Decimal,
}

impl DailyBalance {
    /// closing = opening + sales + commissions - payments
    pub fn from_totals(
        date: NaiveDate,
        opening_balance: Decimal,
        total_sales: Decimal,
        total_commissions: Decimal,
        total_payments: Decimal,
    ) -> Self {
        Self {
            date,
            opening_balance,
            total_sales,
            total_commissions,
            total_payments,
            closing_balance: opening_balance + total_sales + total_commissions - total_payments,
        }
    }

    /// Derive the rollup for `date` from source records. Records on other dates and
    /// receipts are ignored.
    pub fn calculate<'a>(
        date: NaiveDate,
        opening_balance: Decimal,
        sales: impl IntoIterator<Item = &'a DailySale>,
        payments: impl IntoIterator<Item = &'a UcfPayment>,
    ) -> Self {
        let sales = SalesTotals::from_sales(sales.into_iter().filter(|s| s.date == date));
        let total_payments = payments
            .into_iter()
            .filter(|p| p.date == date && p.payment_type == PaymentType::Payment)
            .map(|p| p.amount)
            .sum();
        Self::from_totals(
            date,
            opening_balance,
            sales.total_sales,
            sales.total_commissions,
            total_payments,
        )
    }
}

/// System-wide amount owed to UCF
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CounterpartyBalance {
    pub total_sales: Decimal,
    pub total_payments: Decimal,
    pub total_receipts: Decimal,
    /// sales - payments + receipts
    pub balance_owed: Decimal,
}

impl CounterpartyBalance {
    pub fn new(total_sales: Decimal, total_payments: Decimal, total_receipts: Decimal) -> Self {
        Self {
            total_sales,
            total_payments,
            total_receipts,
            balance_owed: total_sales - total_payments + total_receipts,
        }
    }

    pub fn calculate<'a>(
        sales: impl IntoIterator<Item = &'a DailySale>,
        payments: impl IntoIterator<Item = &'a UcfPayment>,
    ) -> Self {
        let total_sales = sales.into_iter().map(|s| s.total_amount).sum();
        let (total_payments, total_receipts) = payments.into_iter().fold(
            (Decimal::ZERO, Decimal::ZERO),
            |(paid, received), p| match p.payment_type {
                PaymentType::Payment => (paid + p.amount, received),
                PaymentType::Receipt => (paid, received + p.amount),
            },
        );
        Self::new(total_sales, total_payments, total_receipts)
    }
}
