use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::ReservationId;
use domain::{InventoryItem, ItemPatch, Reservation, ReservationStatus, Sku};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use uuid::Uuid;

use crate::{
    Result, StoreError,
    store::{InventoryStore, ReservationStore, Store, StoreTx},
};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS inventory_items (
    sku                TEXT PRIMARY KEY,
    product_name       TEXT NOT NULL,
    total_quantity     BIGINT NOT NULL CHECK (total_quantity >= 0),
    available_quantity BIGINT NOT NULL CHECK (available_quantity >= 0)
);

CREATE TABLE IF NOT EXISTS reservations (
    reservation_id  UUID PRIMARY KEY,
    sku             TEXT NOT NULL,
    user_id         TEXT NOT NULL,
    quantity        BIGINT NOT NULL CHECK (quantity > 0),
    status          TEXT NOT NULL,
    expires_at      TIMESTAMPTZ NOT NULL,
    idempotency_key TEXT NOT NULL,
    created_at      TIMESTAMPTZ NOT NULL,
    CONSTRAINT reservations_idempotency_key_key UNIQUE (idempotency_key)
);

CREATE INDEX IF NOT EXISTS reservations_status_expires_at_idx
    ON reservations (status, expires_at);
"#;

/// PostgreSQL-backed storage implementation.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Creates the tables and indexes if they do not exist yet.
    pub async fn init_schema(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }
}

fn row_to_item(row: PgRow) -> Result<InventoryItem> {
    Ok(InventoryItem {
        sku: Sku::new(row.try_get::<String, _>("sku")?),
        product_name: row.try_get("product_name")?,
        total_quantity: quantity_from_row(&row, "total_quantity")?,
        available_quantity: quantity_from_row(&row, "available_quantity")?,
    })
}

fn row_to_reservation(row: PgRow) -> Result<Reservation> {
    let status: String = row.try_get("status")?;
    let status = status
        .parse::<ReservationStatus>()
        .map_err(StoreError::InvalidRecord)?;

    Ok(Reservation {
        reservation_id: ReservationId::from_uuid(row.try_get::<Uuid, _>("reservation_id")?),
        sku: Sku::new(row.try_get::<String, _>("sku")?),
        user_id: row.try_get("user_id")?,
        quantity: quantity_from_row(&row, "quantity")?,
        status,
        expires_at: row.try_get("expires_at")?,
        idempotency_key: row.try_get("idempotency_key")?,
        created_at: row.try_get("created_at")?,
    })
}

fn quantity_from_row(row: &PgRow, column: &str) -> Result<u32> {
    let value: i64 = row.try_get(column)?;
    u32::try_from(value)
        .map_err(|_| StoreError::InvalidRecord(format!("{column} out of range: {value}")))
}

const ITEM_COLUMNS: &str = "sku, product_name, total_quantity, available_quantity";
const RESERVATION_COLUMNS: &str =
    "reservation_id, sku, user_id, quantity, status, expires_at, idempotency_key, created_at";

#[async_trait]
impl InventoryStore for PostgresStore {
    async fn insert_item(&self, item: InventoryItem) -> Result<InventoryItem> {
        sqlx::query(
            "INSERT INTO inventory_items (sku, product_name, total_quantity, available_quantity)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(item.sku.as_str())
        .bind(&item.product_name)
        .bind(i64::from(item.total_quantity))
        .bind(i64::from(item.available_quantity))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("inventory_items_pkey")
            {
                return StoreError::DuplicateSku(item.sku.clone());
            }
            StoreError::Database(e)
        })?;

        Ok(item)
    }

    async fn find_item(&self, sku: &Sku) -> Result<Option<InventoryItem>> {
        let row = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM inventory_items WHERE sku = $1"
        ))
        .bind(sku.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_item).transpose()
    }

    async fn list_items(&self) -> Result<Vec<InventoryItem>> {
        let rows = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM inventory_items ORDER BY sku ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_item).collect()
    }

    async fn update_item(&self, sku: &Sku, patch: &ItemPatch) -> Result<InventoryItem> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM inventory_items WHERE sku = $1 FOR UPDATE"
        ))
        .bind(sku.as_str())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StoreError::SkuNotFound(sku.clone()))?;

        let updated = row_to_item(row)?.apply(patch)?;

        sqlx::query(
            "UPDATE inventory_items
             SET product_name = $2, total_quantity = $3, available_quantity = $4
             WHERE sku = $1",
        )
        .bind(sku.as_str())
        .bind(&updated.product_name)
        .bind(i64::from(updated.total_quantity))
        .bind(i64::from(updated.available_quantity))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    async fn remove_item(&self, sku: &Sku) -> Result<()> {
        let result = sqlx::query("DELETE FROM inventory_items WHERE sku = $1")
            .bind(sku.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::SkuNotFound(sku.clone()));
        }
        Ok(())
    }
}

#[async_trait]
impl ReservationStore for PostgresStore {
    async fn find_reservation(&self, id: &ReservationId) -> Result<Option<Reservation>> {
        let row = sqlx::query(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE reservation_id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_reservation).transpose()
    }

    async fn find_by_idempotency_key(&self, key: &str) -> Result<Option<Reservation>> {
        let row = sqlx::query(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE idempotency_key = $1"
        ))
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_reservation).transpose()
    }

    async fn find_expired(&self, cutoff: DateTime<Utc>) -> Result<Vec<Reservation>> {
        let rows = sqlx::query(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations
             WHERE status = $1 AND expires_at <= $2
             ORDER BY expires_at ASC"
        ))
        .bind(ReservationStatus::Reserved.as_str())
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_reservation).collect()
    }
}

#[async_trait]
impl Store for PostgresStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PostgresStoreTx { tx }))
    }
}

/// Transaction over the PostgreSQL store.
///
/// Wraps a sqlx transaction; dropping it without commit rolls back.
struct PostgresStoreTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTx for PostgresStoreTx {
    async fn try_debit(&mut self, sku: &Sku, quantity: u32) -> Result<InventoryItem> {
        let row = sqlx::query(&format!(
            "UPDATE inventory_items
             SET available_quantity = available_quantity - $2
             WHERE sku = $1 AND available_quantity >= $2
             RETURNING {ITEM_COLUMNS}"
        ))
        .bind(sku.as_str())
        .bind(i64::from(quantity))
        .fetch_optional(&mut *self.tx)
        .await?;

        if let Some(row) = row {
            return row_to_item(row);
        }

        // The conditional update matched nothing: missing item or not
        // enough stock. Distinguish for the caller.
        let current =
            sqlx::query("SELECT available_quantity FROM inventory_items WHERE sku = $1")
                .bind(sku.as_str())
                .fetch_optional(&mut *self.tx)
                .await?;

        match current {
            None => Err(StoreError::SkuNotFound(sku.clone())),
            Some(row) => Err(StoreError::InsufficientStock {
                sku: sku.clone(),
                requested: quantity,
                available: quantity_from_row(&row, "available_quantity")?,
            }),
        }
    }

    async fn credit(&mut self, sku: &Sku, quantity: u32) -> Result<InventoryItem> {
        let row = sqlx::query(&format!(
            "UPDATE inventory_items
             SET available_quantity = available_quantity + $2
             WHERE sku = $1
             RETURNING {ITEM_COLUMNS}"
        ))
        .bind(sku.as_str())
        .bind(i64::from(quantity))
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or_else(|| StoreError::SkuNotFound(sku.clone()))?;

        row_to_item(row)
    }

    async fn insert_reservation(&mut self, reservation: Reservation) -> Result<Reservation> {
        sqlx::query(
            "INSERT INTO reservations
                 (reservation_id, sku, user_id, quantity, status, expires_at, idempotency_key, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(reservation.reservation_id.as_uuid())
        .bind(reservation.sku.as_str())
        .bind(&reservation.user_id)
        .bind(i64::from(reservation.quantity))
        .bind(reservation.status.as_str())
        .bind(reservation.expires_at)
        .bind(&reservation.idempotency_key)
        .bind(reservation.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e {
                if db_err.constraint() == Some("reservations_idempotency_key_key") {
                    return StoreError::DuplicateIdempotencyKey(
                        reservation.idempotency_key.clone(),
                    );
                }
                if db_err.constraint() == Some("reservations_pkey") {
                    return StoreError::DuplicateReservationId(reservation.reservation_id);
                }
            }
            StoreError::Database(e)
        })?;

        Ok(reservation)
    }

    async fn find_reservation(&mut self, id: &ReservationId) -> Result<Option<Reservation>> {
        let row = sqlx::query(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE reservation_id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(row_to_reservation).transpose()
    }

    async fn transition(
        &mut self,
        id: &ReservationId,
        expected: ReservationStatus,
        next: ReservationStatus,
    ) -> Result<Option<Reservation>> {
        let row = sqlx::query(&format!(
            "UPDATE reservations
             SET status = $3
             WHERE reservation_id = $1 AND status = $2
             RETURNING {RESERVATION_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(expected.as_str())
        .bind(next.as_str())
        .fetch_optional(&mut *self.tx)
        .await?;

        if let Some(row) = row {
            return Ok(Some(row_to_reservation(row)?));
        }

        let exists = sqlx::query("SELECT 1 FROM reservations WHERE reservation_id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?;

        if exists.is_none() {
            return Err(StoreError::ReservationNotFound(*id));
        }
        Ok(None)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
