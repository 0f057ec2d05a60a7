//! Stock ledger service: stock rows, manual updates and the stock audit trail

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Stock, StockChangeType, StockHistory, BAGS_PER_TONNE};
use shared::ledger::{self, HistoryFilter, StockMutation};

/// Stock ledger service
#[derive(Clone)]
pub struct StockService {
    db: PgPool,
}

/// Stock row as stored
#[derive(Debug, FromRow)]
pub(crate) struct StockRow {
    id: Uuid,
    depot_id: Uuid,
    product_id: Uuid,
    quantity: Decimal,
    updated_at: DateTime<Utc>,
}

impl From<StockRow> for Stock {
    fn from(row: StockRow) -> Self {
        Stock {
            id: row.id,
            depot_id: row.depot_id,
            product_id: row.product_id,
            quantity: row.quantity,
            updated_at: row.updated_at,
        }
    }
}

/// Stock history row as stored
#[derive(Debug, FromRow)]
pub(crate) struct StockHistoryRow {
    id: Uuid,
    stock_id: Uuid,
    entry_date: NaiveDate,
    previous_quantity: Decimal,
    new_quantity: Decimal,
    change_type: String,
    bags_sold: Option<i64>,
    quantity_change: Decimal,
    description: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<StockHistoryRow> for StockHistory {
    type Error = AppError;

    fn try_from(row: StockHistoryRow) -> Result<Self, Self::Error> {
        Ok(StockHistory {
            id: row.id,
            stock_id: row.stock_id,
            date: row.entry_date,
            previous_quantity: row.previous_quantity,
            new_quantity: row.new_quantity,
            change_type: row.change_type.parse().map_err(AppError::Internal)?,
            bags_sold: row.bags_sold,
            quantity_change: row.quantity_change,
            description: row.description,
            created_at: row.created_at,
        })
    }
}

/// Stock level with catalog names and derived figures
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StockView {
    pub id: Uuid,
    pub depot_id: Uuid,
    pub depot_name: String,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: Decimal,
    pub price_per_bag: Decimal,
    #[sqlx(default)]
    pub available_bags: i64,
    #[sqlx(default)]
    pub monetary_value: Decimal,
    pub updated_at: DateTime<Utc>,
}

impl StockView {
    fn with_derived(mut self) -> Self {
        self.available_bags = shared::available_bags(self.quantity);
        self.monetary_value = self.quantity * Decimal::from(BAGS_PER_TONNE) * self.price_per_bag;
        self
    }
}

/// History entry with the depot and product it belongs to
#[derive(Debug, Clone, Serialize)]
pub struct StockHistoryView {
    #[serde(flatten)]
    pub entry: StockHistory,
    pub depot_name: String,
    pub product_name: String,
    pub change_label: &'static str,
    pub change_in_bags: i64,
}

#[derive(Debug, FromRow)]
struct StockHistoryViewRow {
    #[sqlx(flatten)]
    entry: StockHistoryRow,
    depot_name: String,
    product_name: String,
}

/// Input for creating the stock row of a depot/product pair
#[derive(Debug, Deserialize)]
pub struct CreateStockInput {
    pub depot_id: Uuid,
    pub product_id: Uuid,
    #[serde(default)]
    pub quantity: Decimal,
    pub date: Option<NaiveDate>,
}

/// Input for setting an absolute quantity
#[derive(Debug, Deserialize)]
pub struct UpdateStockInput {
    pub quantity: Decimal,
    pub change_type: StockChangeType,
    pub description: Option<String>,
    pub date: Option<NaiveDate>,
}

/// Input for a signed quantity change
#[derive(Debug, Deserialize)]
pub struct AdjustStockInput {
    pub delta: Decimal,
    pub change_type: StockChangeType,
    pub description: Option<String>,
    pub date: Option<NaiveDate>,
}

/// A newly created stock row and its opening entry, if any
#[derive(Debug, Clone, Serialize)]
pub struct StockCreated {
    pub stock: Stock,
    pub opening: Option<StockHistory>,
    pub available_bags: i64,
}

/// Result of a committed stock change
#[derive(Debug, Clone, Serialize)]
pub struct StockUpdateOutcome {
    pub stock: Stock,
    pub history: StockHistory,
    pub available_bags: i64,
}

const STOCK_COLUMNS: &str = "id, depot_id, product_id, quantity, updated_at";

const HISTORY_COLUMNS: &str = "h.id, h.stock_id, h.entry_date, h.previous_quantity, h.new_quantity, \
     h.change_type, h.bags_sold, h.quantity_change, h.description, h.created_at";

impl StockService {
    /// Create a new StockService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List every stock row with depot/product names, available bags and value
    pub async fn list_stocks(&self) -> AppResult<Vec<StockView>> {
        let rows = sqlx::query_as::<_, StockView>(
            r#"
            SELECT s.id, s.depot_id, d.name AS depot_name, s.product_id, p.name AS product_name,
                   s.quantity, p.price_per_bag, s.updated_at
            FROM stocks s
            JOIN depots d ON d.id = s.depot_id
            JOIN products p ON p.id = s.product_id
            ORDER BY d.name, p.name
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(StockView::with_derived).collect())
    }

    /// Get a stock row by ID
    pub async fn get_stock(&self, stock_id: Uuid) -> AppResult<Stock> {
        let row = sqlx::query_as::<_, StockRow>(&format!(
            "SELECT {STOCK_COLUMNS} FROM stocks WHERE id = $1"
        ))
        .bind(stock_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Stock".to_string()))?;

        Ok(row.into())
    }

    /// Create the stock row for a depot/product pair.
    ///
    /// A positive opening quantity is recorded as an addition in the same transaction.
    pub async fn create_stock(&self, input: CreateStockInput) -> AppResult<StockCreated> {
        shared::validate_quantity(input.quantity).map_err(|e| AppError::Validation {
            field: "quantity".to_string(),
            message: e.to_string(),
        })?;
        let date = input.date.unwrap_or_else(|| Utc::now().date_naive());

        let mut tx = self.db.begin().await?;

        let stock: Stock = sqlx::query_as::<_, StockRow>(&format!(
            r#"
            INSERT INTO stocks (depot_id, product_id, quantity)
            VALUES ($1, $2, $3)
            RETURNING {STOCK_COLUMNS}
            "#
        ))
        .bind(input.depot_id)
        .bind(input.product_id)
        .bind(input.quantity)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                AppError::NotFound("Depot or product".to_string())
            }
            _ => AppError::from_unique_violation(e, "stock record for this depot and product"),
        })?
        .into();

        let opening = match ledger::plan_opening(&stock, date) {
            Some(mutation) => Some(insert_history(&mut tx, &mutation).await?),
            None => None,
        };

        tx.commit().await?;

        tracing::info!(stock_id = %stock.id, quantity = %stock.quantity, "Stock record created");

        Ok(StockCreated {
            available_bags: stock.available_bags(),
            stock,
            opening,
        })
    }

    /// Set an absolute quantity (addition, adjustment or correction)
    pub async fn update_stock(
        &self,
        stock_id: Uuid,
        input: UpdateStockInput,
    ) -> AppResult<StockUpdateOutcome> {
        let date = input.date.unwrap_or_else(|| Utc::now().date_naive());

        let mut tx = self.db.begin().await?;
        let stock = lock_stock(&mut tx, stock_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Stock".to_string()))?;

        let mutation = ledger::set_quantity(
            &stock,
            input.quantity,
            input.change_type,
            input.description,
            date,
        )?;
        let (stock, history) = persist_mutation(&mut tx, &mutation).await?;

        tx.commit().await?;

        tracing::info!(
            stock_id = %stock.id,
            change_type = %history.change_type,
            previous = %history.previous_quantity,
            new = %history.new_quantity,
            "Stock updated"
        );

        Ok(StockUpdateOutcome {
            available_bags: stock.available_bags(),
            stock,
            history,
        })
    }

    /// Apply a signed quantity change, rejecting anything that would go below zero
    pub async fn adjust_stock(
        &self,
        stock_id: Uuid,
        input: AdjustStockInput,
    ) -> AppResult<StockUpdateOutcome> {
        let date = input.date.unwrap_or_else(|| Utc::now().date_naive());

        let mut tx = self.db.begin().await?;
        let stock = lock_stock(&mut tx, stock_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Stock".to_string()))?;

        let mutation = ledger::plan_adjustment(
            &stock,
            input.delta,
            input.change_type,
            input.description,
            date,
        )?;
        let (stock, history) = persist_mutation(&mut tx, &mutation).await?;

        tx.commit().await?;

        tracing::info!(stock_id = %stock.id, delta = %history.quantity_change, "Stock adjusted");

        Ok(StockUpdateOutcome {
            available_bags: stock.available_bags(),
            stock,
            history,
        })
    }

    /// Stock history newest first, optionally filtered by stock and date range
    pub async fn get_history(&self, filter: &HistoryFilter) -> AppResult<Vec<StockHistoryView>> {
        if let Some(stock_id) = filter.stock_id {
            self.get_stock(stock_id).await?;
        }

        let rows = sqlx::query_as::<_, StockHistoryViewRow>(&format!(
            r#"
            SELECT {HISTORY_COLUMNS}, d.name AS depot_name, p.name AS product_name
            FROM stock_history h
            JOIN stocks s ON s.id = h.stock_id
            JOIN depots d ON d.id = s.depot_id
            JOIN products p ON p.id = s.product_id
            WHERE ($1::uuid IS NULL OR h.stock_id = $1)
              AND ($2::date IS NULL OR h.entry_date >= $2)
              AND ($3::date IS NULL OR h.entry_date <= $3)
            ORDER BY h.entry_date DESC, h.created_at DESC
            "#
        ))
        .bind(filter.stock_id)
        .bind(filter.start_date)
        .bind(filter.end_date)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(StockHistoryView::try_from).collect()
    }

    /// The most recent history entries across all stock
    pub async fn recent_history(&self, limit: i64) -> AppResult<Vec<StockHistoryView>> {
        let rows = sqlx::query_as::<_, StockHistoryViewRow>(&format!(
            r#"
            SELECT {HISTORY_COLUMNS}, d.name AS depot_name, p.name AS product_name
            FROM stock_history h
            JOIN stocks s ON s.id = h.stock_id
            JOIN depots d ON d.id = s.depot_id
            JOIN products p ON p.id = s.product_id
            ORDER BY h.entry_date DESC, h.created_at DESC
            LIMIT $1
            "#
        ))
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(StockHistoryView::try_from).collect()
    }
}

impl TryFrom<StockHistoryViewRow> for StockHistoryView {
    type Error = AppError;

    fn try_from(row: StockHistoryViewRow) -> Result<Self, Self::Error> {
        let entry = StockHistory::try_from(row.entry)?;
        Ok(StockHistoryView {
            change_label: entry.change_type.label(),
            change_in_bags: entry.change_in_bags(),
            entry,
            depot_name: row.depot_name,
            product_name: row.product_name,
        })
    }
}

/// Lock a stock row by ID for the rest of the transaction
pub(crate) async fn lock_stock(conn: &mut PgConnection, stock_id: Uuid) -> AppResult<Option<Stock>> {
    let row = sqlx::query_as::<_, StockRow>(&format!(
        "SELECT {STOCK_COLUMNS} FROM stocks WHERE id = $1 FOR UPDATE"
    ))
    .bind(stock_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(Into::into))
}

/// Lock the stock row of a depot/product pair for the rest of the transaction
pub(crate) async fn lock_stock_for(
    conn: &mut PgConnection,
    depot_id: Uuid,
    product_id: Uuid,
) -> AppResult<Option<Stock>> {
    let row = sqlx::query_as::<_, StockRow>(&format!(
        "SELECT {STOCK_COLUMNS} FROM stocks WHERE depot_id = $1 AND product_id = $2 FOR UPDATE"
    ))
    .bind(depot_id)
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(Into::into))
}

/// Write a planned mutation and its audit entry. Must run inside the transaction
/// holding the stock row lock.
pub(crate) async fn persist_mutation(
    conn: &mut PgConnection,
    mutation: &StockMutation,
) -> AppResult<(Stock, StockHistory)> {
    let stock: Stock = sqlx::query_as::<_, StockRow>(&format!(
        r#"
        UPDATE stocks
        SET quantity = $1, updated_at = NOW()
        WHERE id = $2 AND quantity = $3
        RETURNING {STOCK_COLUMNS}
        "#
    ))
    .bind(mutation.new_quantity)
    .bind(mutation.stock_id)
    .bind(mutation.previous_quantity)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::Internal("stock changed since the mutation was planned".to_string()))?
    .into();

    let history = insert_history(conn, mutation).await?;
    Ok((stock, history))
}

async fn insert_history(conn: &mut PgConnection, mutation: &StockMutation) -> AppResult<StockHistory> {
    let row = sqlx::query_as::<_, StockHistoryRow>(
        r#"
        INSERT INTO stock_history (
            stock_id, entry_date, previous_quantity, new_quantity, change_type,
            bags_sold, quantity_change, description
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id, stock_id, entry_date, previous_quantity, new_quantity, change_type,
                  bags_sold, quantity_change, description, created_at
        "#,
    )
    .bind(mutation.stock_id)
    .bind(mutation.date)
    .bind(mutation.previous_quantity)
    .bind(mutation.new_quantity)
    .bind(mutation.change_type.as_str())
    .bind(mutation.bags_sold)
    .bind(mutation.quantity_change())
    .bind(&mutation.description)
    .fetch_one(&mut *conn)
    .await?;

    row.try_into()
}
