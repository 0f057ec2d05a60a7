//! Sale recorder: turns bags sold into a daily sale row and a stock reduction
//!
//! A sale is committed in one transaction that locks the stock row of the sold pair,
//! so two concurrent sales can never both pass the availability check.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::catalog::fetch_product;
use super::stock::{lock_stock_for, persist_mutation};
use crate::error::{AppError, AppResult};
use crate::models::{DailySale, RecordSale, SaleOutcome, SalesTotals};
use shared::ledger;
use shared::report::{SalesReport, SalesReportRow};
use shared::DateRange;

/// Sale recorder service
#[derive(Clone)]
pub struct SalesService {
    db: PgPool,
}

#[derive(Debug, FromRow)]
pub(crate) struct DailySaleRow {
    id: Uuid,
    sale_date: NaiveDate,
    depot_id: Uuid,
    product_id: Uuid,
    bags_sold: i64,
    total_amount: Decimal,
    commission_earned: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<DailySaleRow> for DailySale {
    fn from(row: DailySaleRow) -> Self {
        DailySale {
            id: row.id,
            date: row.sale_date,
            depot_id: row.depot_id,
            product_id: row.product_id,
            bags_sold: row.bags_sold,
            total_amount: row.total_amount,
            commission_earned: row.commission_earned,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Daily sale with catalog names, as listed to operators
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DailySaleView {
    pub id: Uuid,
    #[serde(rename = "date")]
    pub sale_date: NaiveDate,
    pub depot_id: Uuid,
    pub depot_name: String,
    pub product_id: Uuid,
    pub product_name: String,
    pub bags_sold: i64,
    pub total_amount: Decimal,
    pub commission_earned: Decimal,
}

/// Sales in a date range with their totals
#[derive(Debug, Clone, Serialize)]
pub struct SalesListing {
    pub range: DateRange,
    pub sales: Vec<DailySaleView>,
    pub totals: SalesTotals,
}

const SALE_COLUMNS: &str = "id, sale_date, depot_id, product_id, bags_sold, total_amount, \
     commission_earned, created_at, updated_at";

impl SalesService {
    /// Create a new SalesService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Record a sale.
    ///
    /// Fails with `NoStockRecord` when the pair has no stock row and with
    /// `InsufficientStock` when fewer whole bags are available than requested. On
    /// failure nothing is written.
    pub async fn record_sale(&self, input: RecordSale) -> AppResult<SaleOutcome> {
        let mut tx = self.db.begin().await?;

        let depot_exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM depots WHERE id = $1)")
                .bind(input.depot_id)
                .fetch_one(&mut *tx)
                .await?;
        if !depot_exists {
            return Err(AppError::NotFound("Depot".to_string()));
        }

        let product = fetch_product(&mut tx, input.product_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        let stock = lock_stock_for(&mut tx, input.depot_id, input.product_id).await?;

        let plan = match ledger::plan_sale(
            stock.as_ref(),
            input.depot_id,
            &product,
            input.date,
            input.bags_sold,
        ) {
            Ok(plan) => plan,
            Err(e) => {
                tracing::warn!(
                    depot_id = %input.depot_id,
                    product_id = %input.product_id,
                    bags_sold = input.bags_sold,
                    "Sale rejected: {}",
                    e
                );
                return Err(e.into());
            }
        };

        if !input.accumulate {
            let exists = sqlx::query_scalar::<_, bool>(
                r#"
                SELECT EXISTS(
                    SELECT 1 FROM daily_sales
                    WHERE sale_date = $1 AND depot_id = $2 AND product_id = $3
                )
                "#,
            )
            .bind(input.date)
            .bind(input.depot_id)
            .bind(input.product_id)
            .fetch_one(&mut *tx)
            .await?;
            if exists {
                return Err(AppError::DuplicateEntry(
                    "sale for this date, depot and product".to_string(),
                ));
            }
        }

        // Amounts are the snapshot taken now; later price changes never touch this row
        let sale: DailySale = sqlx::query_as::<_, DailySaleRow>(&format!(
            r#"
            INSERT INTO daily_sales (
                sale_date, depot_id, product_id, bags_sold, total_amount, commission_earned
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (sale_date, depot_id, product_id) DO UPDATE SET
                bags_sold = daily_sales.bags_sold + EXCLUDED.bags_sold,
                total_amount = daily_sales.total_amount + EXCLUDED.total_amount,
                commission_earned = daily_sales.commission_earned + EXCLUDED.commission_earned,
                updated_at = NOW()
            RETURNING {SALE_COLUMNS}
            "#
        ))
        .bind(input.date)
        .bind(input.depot_id)
        .bind(input.product_id)
        .bind(plan.amounts.bags_sold)
        .bind(plan.amounts.total_amount)
        .bind(plan.amounts.commission_earned)
        .fetch_one(&mut *tx)
        .await?
        .into();

        let (_, history) = persist_mutation(&mut tx, &plan.mutation).await?;

        tx.commit().await?;

        tracing::info!(
            sale_id = %sale.id,
            bags_sold = plan.amounts.bags_sold,
            total_amount = %plan.amounts.total_amount,
            available_bags = plan.available_bags_after,
            "Sale recorded"
        );

        Ok(SaleOutcome {
            sale,
            amounts: plan.amounts,
            history,
            available_bags_before: plan.available_bags_before,
            available_bags_after: plan.available_bags_after,
        })
    }

    /// Get a daily sale row by ID
    pub async fn get_sale(&self, sale_id: Uuid) -> AppResult<DailySale> {
        let row = sqlx::query_as::<_, DailySaleRow>(&format!(
            "SELECT {SALE_COLUMNS} FROM daily_sales WHERE id = $1"
        ))
        .bind(sale_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Sale".to_string()))?;

        Ok(row.into())
    }

    /// Sales in the range, oldest first, with totals
    pub async fn list_sales(&self, range: DateRange) -> AppResult<SalesListing> {
        let sales = self.sales_with_names(range).await?;

        let totals = SalesTotals {
            total_bags: sales.iter().map(|s| s.bags_sold).sum(),
            total_sales: sales.iter().map(|s| s.total_amount).sum(),
            total_commissions: sales.iter().map(|s| s.commission_earned).sum(),
        };

        Ok(SalesListing {
            range,
            sales,
            totals,
        })
    }

    /// Sales report over the range
    pub async fn sales_report(&self, range: DateRange) -> AppResult<SalesReport> {
        let rows = self
            .sales_with_names(range)
            .await?
            .into_iter()
            .map(|s| SalesReportRow {
                date: s.sale_date,
                depot: s.depot_name,
                product: s.product_name,
                bags_sold: s.bags_sold,
                total_amount: s.total_amount,
                commission_earned: s.commission_earned,
            })
            .collect();

        Ok(SalesReport::new(range, rows))
    }

    async fn sales_with_names(&self, range: DateRange) -> AppResult<Vec<DailySaleView>> {
        let sales = sqlx::query_as::<_, DailySaleView>(
            r#"
            SELECT s.id, s.sale_date, s.depot_id, d.name AS depot_name,
                   s.product_id, p.name AS product_name,
                   s.bags_sold, s.total_amount, s.commission_earned
            FROM daily_sales s
            JOIN depots d ON d.id = s.depot_id
            JOIN products p ON p.id = s.product_id
            WHERE s.sale_date BETWEEN $1 AND $2
            ORDER BY s.sale_date, d.name, p.name
            "#,
        )
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.db)
        .await?;

        Ok(sales)
    }
}
