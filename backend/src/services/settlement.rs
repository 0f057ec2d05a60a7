//! Settlement ledger: UCF payments and receipts, daily balances and the amount owed

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{CounterpartyBalance, DailyBalance, PaymentType, RecordPayment, UcfPayment};
use shared::DateRange;

/// Settlement service
#[derive(Clone)]
pub struct SettlementService {
    db: PgPool,
}

#[derive(Debug, FromRow)]
struct PaymentRow {
    id: Uuid,
    payment_date: NaiveDate,
    payment_type: String,
    amount: Decimal,
    description: String,
    reference_number: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for UcfPayment {
    type Error = AppError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        Ok(UcfPayment {
            id: row.id,
            date: row.payment_date,
            payment_type: row.payment_type.parse().map_err(AppError::Internal)?,
            amount: row.amount,
            description: row.description,
            reference_number: row.reference_number,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct BalanceRow {
    balance_date: NaiveDate,
    opening_balance: Decimal,
    total_sales: Decimal,
    total_commissions: Decimal,
    total_payments: Decimal,
    closing_balance: Decimal,
}

impl From<BalanceRow> for DailyBalance {
    fn from(row: BalanceRow) -> Self {
        DailyBalance {
            date: row.balance_date,
            opening_balance: row.opening_balance,
            total_sales: row.total_sales,
            total_commissions: row.total_commissions,
            total_payments: row.total_payments,
            closing_balance: row.closing_balance,
        }
    }
}

/// Optional filters for listing payments
#[derive(Debug, Default, Deserialize)]
pub struct PaymentFilter {
    pub payment_type: Option<PaymentType>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Request to materialize the rollup of one date
#[derive(Debug, Deserialize)]
pub struct SaveBalanceInput {
    pub date: NaiveDate,
    pub opening_balance: Option<Decimal>,
}

/// Amount owed to UCF with the totals behind it and the payments, newest first
#[derive(Debug, Clone, Serialize)]
pub struct BalanceReport {
    pub range: Option<DateRange>,
    pub total_sales: Decimal,
    pub total_commissions: Decimal,
    pub total_payments: Decimal,
    pub total_receipts: Decimal,
    pub balance_owed: Decimal,
    pub payments: Vec<UcfPayment>,
}

const PAYMENT_COLUMNS: &str =
    "id, payment_date, payment_type, amount, description, reference_number, created_at";

impl SettlementService {
    /// Create a new SettlementService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Record a payment to or receipt from UCF
    pub async fn record_payment(&self, input: RecordPayment) -> AppResult<UcfPayment> {
        shared::validate_amount(input.amount).map_err(|msg| AppError::Validation {
            field: "amount".to_string(),
            message: msg.to_string(),
        })?;
        shared::validate_description(&input.description).map_err(|msg| AppError::Validation {
            field: "description".to_string(),
            message: msg.to_string(),
        })?;
        let reference_number = input.reference_number.filter(|r| !r.trim().is_empty());

        let row = sqlx::query_as::<_, PaymentRow>(&format!(
            r#"
            INSERT INTO ucf_payments (payment_date, payment_type, amount, description, reference_number)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(input.date)
        .bind(input.payment_type.as_str())
        .bind(input.amount)
        .bind(input.description.trim())
        .bind(reference_number)
        .fetch_one(&self.db)
        .await?;

        let payment = UcfPayment::try_from(row)?;

        tracing::info!(
            payment_id = %payment.id,
            payment_type = %payment.payment_type,
            amount = %payment.amount,
            "UCF payment recorded"
        );

        Ok(payment)
    }

    /// Payments newest first
    pub async fn list_payments(&self, filter: &PaymentFilter) -> AppResult<Vec<UcfPayment>> {
        let rows = sqlx::query_as::<_, PaymentRow>(&format!(
            r#"
            SELECT {PAYMENT_COLUMNS}
            FROM ucf_payments
            WHERE ($1::text IS NULL OR payment_type = $1)
              AND ($2::date IS NULL OR payment_date >= $2)
              AND ($3::date IS NULL OR payment_date <= $3)
            ORDER BY payment_date DESC, created_at DESC
            "#
        ))
        .bind(filter.payment_type.map(|t| t.as_str()))
        .bind(filter.start_date)
        .bind(filter.end_date)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(UcfPayment::try_from).collect()
    }

    /// The most recent payments
    pub async fn recent_payments(&self, limit: i64) -> AppResult<Vec<UcfPayment>> {
        let rows = sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM ucf_payments \
             ORDER BY payment_date DESC, created_at DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(UcfPayment::try_from).collect()
    }

    /// System-wide balance owed: sales - payments + receipts
    pub async fn counterparty_balance(&self) -> AppResult<CounterpartyBalance> {
        let (sales, payments, receipts) = self.totals(None).await?;
        Ok(CounterpartyBalance::new(sales, payments, receipts))
    }

    /// Totals, balance owed and payments, over all time or a date range
    pub async fn balance_report(&self, range: Option<DateRange>) -> AppResult<BalanceReport> {
        let (total_sales, total_payments, total_receipts) = self.totals(range).await?;
        let total_commissions = sqlx::query_scalar::<_, Decimal>(
            r#"
            SELECT COALESCE(SUM(commission_earned), 0) FROM daily_sales
            WHERE ($1::date IS NULL OR sale_date >= $1)
              AND ($2::date IS NULL OR sale_date <= $2)
            "#,
        )
        .bind(range.map(|r| r.start))
        .bind(range.map(|r| r.end))
        .fetch_one(&self.db)
        .await?;

        let payments = self
            .list_payments(&PaymentFilter {
                payment_type: None,
                start_date: range.map(|r| r.start),
                end_date: range.map(|r| r.end),
            })
            .await?;

        let balance = CounterpartyBalance::new(total_sales, total_payments, total_receipts);

        Ok(BalanceReport {
            range,
            total_sales,
            total_commissions,
            total_payments,
            total_receipts,
            balance_owed: balance.balance_owed,
            payments,
        })
    }

    /// Live rollup for `date`, derived from the sales and payments recorded on it.
    ///
    /// Without an explicit opening balance the closing balance of the latest saved
    /// rollup before `date` is carried forward.
    pub async fn daily_balance(
        &self,
        date: NaiveDate,
        opening_balance: Option<Decimal>,
    ) -> AppResult<DailyBalance> {
        let opening = match opening_balance {
            Some(opening) => opening,
            None => self.carried_opening(date).await?,
        };

        let (total_sales, total_commissions) = sqlx::query_as::<_, (Decimal, Decimal)>(
            r#"
            SELECT COALESCE(SUM(total_amount), 0), COALESCE(SUM(commission_earned), 0)
            FROM daily_sales
            WHERE sale_date = $1
            "#,
        )
        .bind(date)
        .fetch_one(&self.db)
        .await?;

        let total_payments = sqlx::query_scalar::<_, Decimal>(
            "SELECT COALESCE(SUM(amount), 0) FROM ucf_payments \
             WHERE payment_date = $1 AND payment_type = 'payment'",
        )
        .bind(date)
        .fetch_one(&self.db)
        .await?;

        Ok(DailyBalance::from_totals(
            date,
            opening,
            total_sales,
            total_commissions,
            total_payments,
        ))
    }

    /// Recompute the rollup for a date and store it, replacing any earlier row
    pub async fn save_daily_balance(&self, input: SaveBalanceInput) -> AppResult<DailyBalance> {
        let balance = self.daily_balance(input.date, input.opening_balance).await?;

        let row = sqlx::query_as::<_, BalanceRow>(
            r#"
            INSERT INTO daily_balances (
                balance_date, opening_balance, total_sales, total_commissions,
                total_payments, closing_balance
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (balance_date) DO UPDATE SET
                opening_balance = EXCLUDED.opening_balance,
                total_sales = EXCLUDED.total_sales,
                total_commissions = EXCLUDED.total_commissions,
                total_payments = EXCLUDED.total_payments,
                closing_balance = EXCLUDED.closing_balance,
                updated_at = NOW()
            RETURNING balance_date, opening_balance, total_sales, total_commissions,
                      total_payments, closing_balance
            "#,
        )
        .bind(balance.date)
        .bind(balance.opening_balance)
        .bind(balance.total_sales)
        .bind(balance.total_commissions)
        .bind(balance.total_payments)
        .bind(balance.closing_balance)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(
            date = %balance.date,
            closing_balance = %balance.closing_balance,
            "Daily balance saved"
        );

        Ok(row.into())
    }

    /// The rollup as it was last saved for `date`
    pub async fn saved_daily_balance(&self, date: NaiveDate) -> AppResult<DailyBalance> {
        let row = sqlx::query_as::<_, BalanceRow>(
            r#"
            SELECT balance_date, opening_balance, total_sales, total_commissions,
                   total_payments, closing_balance
            FROM daily_balances
            WHERE balance_date = $1
            "#,
        )
        .bind(date)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Daily balance".to_string()))?;

        Ok(row.into())
    }

    async fn carried_opening(&self, date: NaiveDate) -> AppResult<Decimal> {
        let closing = sqlx::query_scalar::<_, Decimal>(
            r#"
            SELECT closing_balance FROM daily_balances
            WHERE balance_date < $1
            ORDER BY balance_date DESC
            LIMIT 1
            "#,
        )
        .bind(date)
        .fetch_optional(&self.db)
        .await?;

        Ok(closing.unwrap_or(Decimal::ZERO))
    }

    /// (sales, payments, receipts) over all time or a date range
    async fn totals(&self, range: Option<DateRange>) -> AppResult<(Decimal, Decimal, Decimal)> {
        let start = range.map(|r| r.start);
        let end = range.map(|r| r.end);

        let total_sales = sqlx::query_scalar::<_, Decimal>(
            r#"
            SELECT COALESCE(SUM(total_amount), 0) FROM daily_sales
            WHERE ($1::date IS NULL OR sale_date >= $1)
              AND ($2::date IS NULL OR sale_date <= $2)
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_one(&self.db)
        .await?;

        let (total_payments, total_receipts) = sqlx::query_as::<_, (Decimal, Decimal)>(
            r#"
            SELECT
                COALESCE(SUM(amount) FILTER (WHERE payment_type = 'payment'), 0),
                COALESCE(SUM(amount) FILTER (WHERE payment_type = 'receipt'), 0)
            FROM ucf_payments
            WHERE ($1::date IS NULL OR payment_date >= $1)
              AND ($2::date IS NULL OR payment_date <= $2)
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_one(&self.db)
        .await?;

        Ok((total_sales, total_payments, total_receipts))
    }
}
