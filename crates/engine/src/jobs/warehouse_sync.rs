//! Warehouse catalog snapshot into the local cache table.
//!
//! Pulls the full stock listing from the warehouse API and upserts it
//! row by row. The cache feeds reporting queries only; reconciliation
//! reads the live API.

use chrono::Utc;
use sqlx::PgPool;
use thiserror::Error;

use crate::db::{RepositoryError, WarehouseCacheRepository};
use crate::warehouse::{WarehouseClient, WarehouseError};

/// What a finished snapshot did.
#[derive(Debug, Default)]
pub struct WarehouseSyncReport {
    /// Records returned by the warehouse scan.
    pub scanned: usize,
    /// Rows written to the cache table.
    pub upserted: usize,
    /// Records carrying neither a variant ID nor a SKU shop code.
    pub without_linkage: usize,
    /// Pages the scan gave up on.
    pub failed_pages: Vec<u32>,
    /// Total record count the warehouse reported for the listing.
    pub total_reported: i64,
}

/// Errors that abort a snapshot.
#[derive(Debug, Error)]
pub enum WarehouseSyncError {
    /// The warehouse scan failed outright.
    #[error(transparent)]
    Warehouse(#[from] WarehouseError),

    /// A cache write failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Snapshot the warehouse catalog into the cache table.
///
/// With `fresh` the table is truncated first, so rows the warehouse no
/// longer returns disappear; without it stale rows linger and only
/// still-existing records are refreshed.
///
/// # Errors
///
/// Returns an error when the scan fails on its first page or any cache
/// write fails. Pages the scan skipped are listed in the report instead.
pub async fn run(
    warehouse: &WarehouseClient,
    pool: &PgPool,
    fresh: bool,
) -> Result<WarehouseSyncReport, WarehouseSyncError> {
    let repository = WarehouseCacheRepository::new(pool);
    if fresh {
        tracing::info!("clearing warehouse cache before sync");
        repository.truncate().await?;
    }

    let scan = warehouse.fetch_all().await?;
    let synced_at = Utc::now();

    let mut report = WarehouseSyncReport {
        scanned: scan.records.len(),
        failed_pages: scan.failed_pages,
        total_reported: scan.total_reported,
        ..Default::default()
    };

    for record in &scan.records {
        repository.upsert(record, synced_at).await?;
        report.upserted += 1;
        if !record.has_shopify_linkage() {
            report.without_linkage += 1;
        }
    }

    if !report.failed_pages.is_empty() {
        tracing::warn!(
            pages = ?report.failed_pages,
            "warehouse scan skipped pages; cached rows for them may be stale"
        );
    }
    tracing::info!(
        scanned = report.scanned,
        upserted = report.upserted,
        without_linkage = report.without_linkage,
        total_reported = report.total_reported,
        "warehouse sync finished"
    );

    Ok(report)
}
