//! Local materialization of the warehouse stock table.
//!
//! Written by the `warehouse sync` command; one row per warehouse record,
//! keyed on the warehouse's own ID. Reconciliation always reads the live
//! API, so this table is reporting data, not a source of truth.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use stockbridge_core::WarehouseStockRecord;

use super::RepositoryError;

/// Repository for the `warehouse_variants` cache table.
pub struct WarehouseCacheRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> WarehouseCacheRepository<'a> {
    /// Create a new warehouse cache repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert or update one warehouse record.
    ///
    /// The Shopify linkage and SKU are denormalized out of the shop-code
    /// table at write time so reporting queries never re-parse it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert(
        &self,
        record: &WarehouseStockRecord,
        synced_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO warehouse_variants (
                warehouse_id,
                shopify_variant_id,
                variant_name,
                sku,
                stock,
                cost_price,
                selling_price,
                synced_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (warehouse_id) DO UPDATE SET
                shopify_variant_id = EXCLUDED.shopify_variant_id,
                variant_name = EXCLUDED.variant_name,
                sku = EXCLUDED.sku,
                stock = EXCLUDED.stock,
                cost_price = EXCLUDED.cost_price,
                selling_price = EXCLUDED.selling_price,
                synced_at = EXCLUDED.synced_at,
                updated_at = (CURRENT_TIMESTAMP AT TIME ZONE 'utc')
            ",
        )
        .bind(record.warehouse_id)
        .bind(record.shopify_variant_id())
        .bind(&record.variant_name)
        .bind(record.sku_code().or(record.sku.as_deref()))
        .bind(record.stock)
        .bind(record.cost_price)
        .bind(record.selling_price)
        .bind(synced_at)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Drop all cached rows. Used by `warehouse sync --fresh`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn truncate(&self) -> Result<(), RepositoryError> {
        sqlx::query("TRUNCATE warehouse_variants")
            .execute(self.pool)
            .await?;

        Ok(())
    }

    /// Number of cached rows.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM warehouse_variants")
            .fetch_one(self.pool)
            .await?;

        Ok(count)
    }
}
