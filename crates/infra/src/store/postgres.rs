//! Postgres-backed stock store.
//!
//! Persists the product catalog and the append-only movement log in
//! PostgreSQL (schema under `migrations/`). The movement check-then-act
//! sequence runs inside one transaction with a `SELECT … FOR UPDATE` row
//! lock on the product, so concurrent movements against the same product
//! serialize at the database while different products proceed in parallel.
//!
//! SQLx errors are mapped to [`StoreError`] as follows:
//!
//! | PostgreSQL error code | StoreError | Scenario |
//! |---|---|---|
//! | `23505` (unique violation) | `DuplicateSku` | SKU already taken |
//! | `23503` (foreign key violation) | `MovementsReferenced` | delete of a referenced product raced past the explicit check |
//! | anything else | `Backend` | connection, timeout, other constraint |

use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::instrument;
use uuid::Uuid;

use async_trait::async_trait;

use stockroom_catalog::{Product, ProductDraft, ProductUpdate};
use stockroom_core::{MovementId, ProductId};
use stockroom_ledger::{ExitReason, MovementDraft, MovementType, StockMovement, next_balance};

use super::r#trait::{MovementFilter, StockStore, StoreError};

/// Postgres-backed store. Clone-cheap; the pool handles connection
/// management.
#[derive(Debug, Clone)]
pub struct PostgresStockStore {
    pool: PgPool,
}

impl PostgresStockStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }
}

const PRODUCT_COLUMNS: &str = "id, sku, name, stock_quantity, min_stock, price_cost, \
                               price_sale, category_id, supplier_ids, created_at, updated_at";

const MOVEMENT_COLUMNS: &str = "id, product_id, user_id, movement_type, quantity, reason, \
                                unit_price, notes, created_at";

#[async_trait]
impl StockStore for PostgresStockStore {
    #[instrument(skip(self, draft), fields(sku = %draft.sku), err)]
    async fn insert_product(&self, draft: ProductDraft) -> Result<Product, StoreError> {
        let product = draft.into_product(ProductId::new(), Utc::now());
        let supplier_ids: Vec<Uuid> = product
            .supplier_ids
            .iter()
            .map(|s| *s.as_uuid())
            .collect();

        sqlx::query(
            r#"
            INSERT INTO products (
                id, sku, name, stock_quantity, min_stock, price_cost,
                price_sale, category_id, supplier_ids, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(&product.sku)
        .bind(&product.name)
        .bind(product.stock_quantity)
        .bind(product.min_stock)
        .bind(product.price_cost)
        .bind(product.price_sale)
        .bind(product.category_id.map(|c| *c.as_uuid()))
        .bind(&supplier_ids)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::DuplicateSku(product.sku.clone())
            } else {
                map_sqlx_error("insert_product", e)
            }
        })?;

        Ok(product)
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_product", e))?;

        row.as_ref().map(product_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY name, sku"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_products", e))?;

        rows.iter().map(product_from_row).collect()
    }

    #[instrument(skip(self, update), fields(product_id = %id), err)]
    async fn update_product(
        &self,
        id: ProductId,
        update: ProductUpdate,
    ) -> Result<Product, StoreError> {
        let supplier_ids: Vec<Uuid> = update.supplier_ids.iter().map(|s| *s.as_uuid()).collect();
        let sku = update.sku.clone();

        let row = sqlx::query(&format!(
            r#"
            UPDATE products
            SET sku = $2, name = $3, min_stock = $4, price_cost = $5,
                price_sale = $6, category_id = $7, supplier_ids = $8,
                updated_at = $9
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(id.as_uuid())
        .bind(&update.sku)
        .bind(&update.name)
        .bind(update.min_stock)
        .bind(update.price_cost)
        .bind(update.price_sale)
        .bind(update.category_id.map(|c| *c.as_uuid()))
        .bind(&supplier_ids)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::DuplicateSku(sku)
            } else {
                map_sqlx_error("update_product", e)
            }
        })?;

        match row {
            Some(row) => product_from_row(&row),
            None => Err(StoreError::NotFound),
        }
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn delete_product(&self, id: ProductId) -> Result<(), StoreError> {
        let mut tx = begin(&self.pool).await?;

        // Lock the product row first so a concurrent movement insert (which
        // also locks it) cannot slip in between the reference check and the
        // delete.
        let locked = sqlx::query("SELECT id FROM products WHERE id = $1 FOR UPDATE")
            .bind(id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("lock_product", e))?;
        if locked.is_none() {
            return Err(StoreError::NotFound);
        }

        let referenced: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM stock_movements WHERE product_id = $1)",
        )
        .bind(id.as_uuid())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("check_movement_references", e))?;
        if referenced {
            return Err(StoreError::MovementsReferenced);
        }

        sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    StoreError::MovementsReferenced
                } else {
                    map_sqlx_error("delete_product", e)
                }
            })?;

        commit(tx).await
    }

    #[instrument(
        skip(self, draft),
        fields(
            product_id = %draft.product_id,
            movement_type = draft.movement_type.as_str(),
            quantity = draft.quantity,
        ),
        err
    )]
    async fn apply_movement(&self, draft: MovementDraft) -> Result<StockMovement, StoreError> {
        let mut tx = begin(&self.pool).await?;

        // Row lock scopes the check-then-act to this product; concurrent
        // movements for the same product queue behind it.
        let balance: Option<i64> =
            sqlx::query_scalar("SELECT stock_quantity FROM products WHERE id = $1 FOR UPDATE")
                .bind(draft.product_id.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("lock_product", e))?;
        let Some(balance) = balance else {
            return Err(StoreError::NotFound);
        };

        let new_balance = next_balance(draft.movement_type, draft.quantity, balance)
            .map_err(StoreError::Rejected)?;

        let movement = draft.accept(MovementId::new(), Utc::now());

        sqlx::query(
            r#"
            INSERT INTO stock_movements (
                id, product_id, user_id, movement_type, quantity, reason,
                unit_price, notes, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(movement.id.as_uuid())
        .bind(movement.product_id.as_uuid())
        .bind(movement.user_id.as_uuid())
        .bind(movement.movement_type.as_str())
        .bind(movement.quantity)
        .bind(movement.reason.map(|r| r.as_str()))
        .bind(movement.unit_price)
        .bind(&movement.notes)
        .bind(movement.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_movement", e))?;

        sqlx::query("UPDATE products SET stock_quantity = $2, updated_at = $3 WHERE id = $1")
            .bind(movement.product_id.as_uuid())
            .bind(new_balance)
            .bind(movement.created_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_balance", e))?;

        commit(tx).await?;
        Ok(movement)
    }

    #[instrument(skip(self, filter), err)]
    async fn query_movements(
        &self,
        filter: &MovementFilter,
    ) -> Result<Vec<StockMovement>, StoreError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {MOVEMENT_COLUMNS}
            FROM stock_movements
            WHERE ($1::uuid IS NULL OR product_id = $1)
              AND ($2::uuid IS NULL OR user_id = $2)
              AND ($3::text IS NULL OR movement_type = $3)
              AND ($4::timestamptz IS NULL OR created_at >= $4)
              AND ($5::timestamptz IS NULL OR created_at <= $5)
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(filter.product_id.map(|p| *p.as_uuid()))
        .bind(filter.user_id.map(|u| *u.as_uuid()))
        .bind(filter.movement_type.map(|t| t.as_str()))
        .bind(filter.created_from)
        .bind(filter.created_to)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("query_movements", e))?;

        rows.iter().map(movement_from_row).collect()
    }
}

async fn begin(pool: &PgPool) -> Result<Transaction<'_, Postgres>, StoreError> {
    pool.begin()
        .await
        .map_err(|e| map_sqlx_error("begin_transaction", e))
}

async fn commit(tx: Transaction<'_, Postgres>) -> Result<(), StoreError> {
    tx.commit()
        .await
        .map_err(|e| map_sqlx_error("commit_transaction", e))
}

fn product_from_row(row: &PgRow) -> Result<Product, StoreError> {
    let supplier_ids: Vec<Uuid> = column(row, "supplier_ids")?;
    Ok(Product {
        id: ProductId::from_uuid(column(row, "id")?),
        sku: column(row, "sku")?,
        name: column(row, "name")?,
        stock_quantity: column(row, "stock_quantity")?,
        min_stock: column(row, "min_stock")?,
        price_cost: column(row, "price_cost")?,
        price_sale: column(row, "price_sale")?,
        category_id: column::<Option<Uuid>>(row, "category_id")?.map(Into::into),
        supplier_ids: supplier_ids.into_iter().map(Into::into).collect(),
        created_at: column(row, "created_at")?,
        updated_at: column(row, "updated_at")?,
    })
}

fn movement_from_row(row: &PgRow) -> Result<StockMovement, StoreError> {
    let movement_type: String = column(row, "movement_type")?;
    let reason: Option<String> = column(row, "reason")?;

    Ok(StockMovement {
        id: MovementId::from_uuid(column(row, "id")?),
        product_id: ProductId::from_uuid(column(row, "product_id")?),
        user_id: stockroom_core::UserId::from_uuid(column(row, "user_id")?),
        movement_type: MovementType::parse(&movement_type)
            .map_err(|e| StoreError::Backend(format!("corrupt movement row: {e}")))?,
        quantity: column(row, "quantity")?,
        reason: reason
            .map(|r| ExitReason::parse(&r))
            .transpose()
            .map_err(|e| StoreError::Backend(format!("corrupt movement row: {e}")))?,
        unit_price: column(row, "unit_price")?,
        notes: column(row, "notes")?,
        created_at: column(row, "created_at")?,
    })
}

fn column<'r, T>(row: &'r PgRow, name: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(name)
        .map_err(|e| StoreError::Backend(format!("failed to read column '{name}': {e}")))
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => StoreError::Backend(format!(
            "database error in {}: {}",
            operation,
            db_err.message()
        )),
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {operation}"))
        }
        other => StoreError::Backend(format!("sqlx error in {operation}: {other}")),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    has_code(err, "23505")
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    has_code(err, "23503")
}

fn has_code(err: &sqlx::Error, code: &str) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        if let Some(c) = db_err.code() {
            return c.as_ref() == code;
        }
    }
    false
}
