//! Warehouse snapshot command.
//!
//! # Usage
//!
//! ```bash
//! # Refresh the local cache in place
//! stockbridge warehouse sync
//!
//! # Drop the cache and rebuild it from scratch
//! stockbridge warehouse sync --fresh
//! ```

use stockbridge_engine::jobs::warehouse_sync::{self, WarehouseSyncError};
use thiserror::Error;

use super::{Context, SetupError};

/// Errors from the `warehouse sync` command.
#[derive(Debug, Error)]
pub enum WarehouseCommandError {
    /// Setup failed before the sync started.
    #[error(transparent)]
    Setup(#[from] SetupError),

    /// The sync itself failed.
    #[error(transparent)]
    Sync(#[from] WarehouseSyncError),
}

/// Snapshot the warehouse catalog into the local cache table.
///
/// # Errors
///
/// Returns an error if setup fails, the warehouse scan fails on its first
/// page, or a cache write fails.
pub async fn sync(fresh: bool) -> Result<(), WarehouseCommandError> {
    let context = Context::init().await?;
    let warehouse = context.warehouse_client().await?;

    let report = warehouse_sync::run(&warehouse, &context.pool, fresh).await?;

    if !report.failed_pages.is_empty() {
        tracing::warn!(
            skipped = report.failed_pages.len(),
            "some warehouse pages could not be fetched; re-run to fill the gaps"
        );
    }

    Ok(())
}
