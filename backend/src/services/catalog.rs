//! Catalog service: depots, products and the initial catalog seed

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::error::{AppError, AppResult};
use crate::models::{initial_depots, initial_products, Depot, NewDepot, NewProduct, Product};

/// Catalog service
#[derive(Clone)]
pub struct CatalogService {
    db: PgPool,
}

#[derive(Debug, FromRow)]
struct DepotRow {
    id: Uuid,
    name: String,
    district: String,
    manager: String,
    phone: String,
    nrc: String,
    created_at: DateTime<Utc>,
}

impl From<DepotRow> for Depot {
    fn from(row: DepotRow) -> Self {
        Depot {
            id: row.id,
            name: row.name,
            district: row.district,
            manager: row.manager,
            phone: row.phone,
            nrc: row.nrc,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    price_per_bag: Decimal,
    commission_per_bag: Decimal,
    created_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            name: row.name,
            price_per_bag: row.price_per_bag,
            commission_per_bag: row.commission_per_bag,
            created_at: row.created_at,
        }
    }
}

/// Depot fields accepted by the API
#[derive(Debug, Deserialize, Validate)]
pub struct DepotInput {
    #[validate(length(min = 1, max = 100, message = "Depot name must be 1-100 characters"))]
    pub name: String,
    #[validate(length(min = 1, max = 100, message = "District must be 1-100 characters"))]
    pub district: String,
    #[validate(length(min = 1, max = 100, message = "Manager name must be 1-100 characters"))]
    pub manager: String,
    #[validate(custom = "zambian_phone")]
    pub phone: String,
    #[validate(custom = "nrc_number")]
    pub nrc: String,
}

impl From<DepotInput> for NewDepot {
    fn from(input: DepotInput) -> Self {
        NewDepot {
            name: input.name.trim().to_uppercase(),
            district: input.district.trim().to_string(),
            manager: input.manager.trim().to_string(),
            phone: input.phone.trim().to_string(),
            nrc: input.nrc.trim().to_string(),
        }
    }
}

/// Product fields accepted by the API
#[derive(Debug, Deserialize, Validate)]
pub struct ProductInput {
    #[validate(length(min = 1, max = 100, message = "Product name must be 1-100 characters"))]
    pub name: String,
    pub price_per_bag: Option<Decimal>,
    pub commission_per_bag: Option<Decimal>,
}

impl From<ProductInput> for NewProduct {
    fn from(input: ProductInput) -> Self {
        let defaults = NewProduct::with_defaults(input.name.trim());
        NewProduct {
            name: defaults.name.to_uppercase(),
            price_per_bag: input.price_per_bag.unwrap_or(defaults.price_per_bag),
            commission_per_bag: input.commission_per_bag.unwrap_or(defaults.commission_per_bag),
        }
    }
}

/// New price and commission for an existing product. Recorded sales keep their amounts.
#[derive(Debug, Deserialize)]
pub struct SetPriceInput {
    pub price_per_bag: Decimal,
    pub commission_per_bag: Decimal,
}

/// Upsert result: the stored record and whether this call created it
#[derive(Debug, Clone, Serialize)]
pub struct Upserted<T> {
    #[serde(flatten)]
    pub record: T,
    pub created: bool,
}

/// Outcome of seeding the initial catalog
#[derive(Debug, Clone, Default, Serialize)]
pub struct SeedSummary {
    pub depots_created: usize,
    pub products_created: usize,
}

fn zambian_phone(phone: &str) -> Result<(), ValidationError> {
    shared::validate_zambian_phone(phone.trim()).map_err(|msg| {
        let mut err = ValidationError::new("phone");
        err.message = Some(msg.into());
        err
    })
}

fn nrc_number(nrc: &str) -> Result<(), ValidationError> {
    shared::validate_nrc(nrc.trim()).map_err(|msg| {
        let mut err = ValidationError::new("nrc");
        err.message = Some(msg.into());
        err
    })
}

fn check_money(field: &str, value: Decimal) -> AppResult<()> {
    shared::validate_unit_price(value).map_err(|msg| AppError::Validation {
        field: field.to_string(),
        message: msg.to_string(),
    })
}

const DEPOT_COLUMNS: &str = "id, name, district, manager, phone, nrc, created_at";
const PRODUCT_COLUMNS: &str = "id, name, price_per_bag, commission_per_bag, created_at";

impl CatalogService {
    /// Create a new CatalogService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List depots by name
    pub async fn list_depots(&self) -> AppResult<Vec<Depot>> {
        let rows = sqlx::query_as::<_, DepotRow>(&format!(
            "SELECT {DEPOT_COLUMNS} FROM depots ORDER BY name"
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Get a depot by ID
    pub async fn get_depot(&self, depot_id: Uuid) -> AppResult<Depot> {
        let row = sqlx::query_as::<_, DepotRow>(&format!(
            "SELECT {DEPOT_COLUMNS} FROM depots WHERE id = $1"
        ))
        .bind(depot_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Depot".to_string()))?;

        Ok(row.into())
    }

    /// List products by name
    pub async fn list_products(&self) -> AppResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY name"
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Get a product by ID
    pub async fn get_product(&self, product_id: Uuid) -> AppResult<Product> {
        let mut conn = self.db.acquire().await?;
        fetch_product(&mut conn, product_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Product".to_string()))
    }

    /// Validate and upsert a depot submitted through the API
    pub async fn create_depot(&self, input: DepotInput) -> AppResult<Upserted<Depot>> {
        input.validate()?;
        self.upsert_depot(input.into()).await
    }

    /// Validate and upsert a product submitted through the API
    pub async fn create_product(&self, input: ProductInput) -> AppResult<Upserted<Product>> {
        input.validate()?;
        let product: NewProduct = input.into();
        check_money("price_per_bag", product.price_per_bag)?;
        check_money("commission_per_bag", product.commission_per_bag)?;
        self.upsert_product(product).await
    }

    /// Insert a depot unless one with the same name exists; the existing row is
    /// returned unchanged in that case.
    pub async fn upsert_depot(&self, depot: NewDepot) -> AppResult<Upserted<Depot>> {
        let inserted = sqlx::query_as::<_, DepotRow>(&format!(
            r#"
            INSERT INTO depots (name, district, manager, phone, nrc)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (name) DO NOTHING
            RETURNING {DEPOT_COLUMNS}
            "#
        ))
        .bind(&depot.name)
        .bind(&depot.district)
        .bind(&depot.manager)
        .bind(&depot.phone)
        .bind(&depot.nrc)
        .fetch_optional(&self.db)
        .await?;

        if let Some(row) = inserted {
            tracing::info!(depot = %row.name, "Depot created");
            return Ok(Upserted {
                record: row.into(),
                created: true,
            });
        }

        let existing = sqlx::query_as::<_, DepotRow>(&format!(
            "SELECT {DEPOT_COLUMNS} FROM depots WHERE name = $1"
        ))
        .bind(&depot.name)
        .fetch_one(&self.db)
        .await?;

        Ok(Upserted {
            record: existing.into(),
            created: false,
        })
    }

    /// Insert a product unless one with the same name exists
    pub async fn upsert_product(&self, product: NewProduct) -> AppResult<Upserted<Product>> {
        let inserted = sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            INSERT INTO products (name, price_per_bag, commission_per_bag)
            VALUES ($1, $2, $3)
            ON CONFLICT (name) DO NOTHING
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(&product.name)
        .bind(product.price_per_bag)
        .bind(product.commission_per_bag)
        .fetch_optional(&self.db)
        .await?;

        if let Some(row) = inserted {
            tracing::info!(product = %row.name, "Product created");
            return Ok(Upserted {
                record: row.into(),
                created: true,
            });
        }

        let existing = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE name = $1"
        ))
        .bind(&product.name)
        .fetch_one(&self.db)
        .await?;

        Ok(Upserted {
            record: existing.into(),
            created: false,
        })
    }

    /// Change the price and commission of a product for future sales
    pub async fn set_product_price(
        &self,
        product_id: Uuid,
        input: SetPriceInput,
    ) -> AppResult<Product> {
        check_money("price_per_bag", input.price_per_bag)?;
        check_money("commission_per_bag", input.commission_per_bag)?;

        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            UPDATE products
            SET price_per_bag = $1, commission_per_bag = $2
            WHERE id = $3
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(input.price_per_bag)
        .bind(input.commission_per_bag)
        .bind(product_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        tracing::info!(product = %row.name, price = %row.price_per_bag, "Product price changed");

        Ok(row.into())
    }

    /// Upsert the initial depots and products. Running it again creates nothing.
    pub async fn seed_initial_data(&self) -> AppResult<SeedSummary> {
        let mut summary = SeedSummary::default();

        for depot in initial_depots() {
            if self.upsert_depot(depot).await?.created {
                summary.depots_created += 1;
            }
        }
        for product in initial_products() {
            if self.upsert_product(product).await?.created {
                summary.products_created += 1;
            }
        }

        tracing::info!(
            depots_created = summary.depots_created,
            products_created = summary.products_created,
            "Catalog seeded"
        );

        Ok(summary)
    }
}

/// Load a product on an existing connection or transaction
pub(crate) async fn fetch_product(
    conn: &mut PgConnection,
    product_id: Uuid,
) -> AppResult<Option<Product>> {
    let row = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
    ))
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(Into::into))
}
