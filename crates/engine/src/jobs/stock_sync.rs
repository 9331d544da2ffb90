//! Full-catalog stock reconciliation.
//!
//! Walks every sync-flagged Shopify variant, resolves warehouse stock by
//! SKU in one batch scan, and pushes the decided targets. One variant is
//! read, decided, and written before the next is touched.

use stockbridge_core::{SyncAction, SyncDecision, SyncFlag};
use thiserror::Error;

use crate::db::RepositoryError;
use crate::executor::SyncExecutor;
use crate::settings::SettingsStore;
use crate::shopify::types::VariantFeedRequest;
use crate::shopify::{ShopifyClient, ShopifyError};
use crate::warehouse::{WarehouseClient, WarehouseError};

/// Backend page size for the whole-catalog walk.
const CATALOG_PAGE_SIZE: u32 = 100;
/// Log running counters every this many processed variants.
const PROGRESS_EVERY: usize = 50;

/// Caller-facing knobs for one reconciliation run.
#[derive(Debug, Clone, Copy, Default)]
pub struct StockSyncOptions {
    /// Location override; the settings store provides the default.
    pub location_id: Option<i64>,
    /// Compute and report decisions without writing to Shopify.
    pub dry_run: bool,
}

/// Fully resolved inputs for one run.
#[derive(Debug, Clone, Copy)]
pub struct StockSyncPlan {
    /// Warehouse stocks at or below this force a zero target.
    pub threshold: i64,
    /// Location whose availability is read and written.
    pub location_id: i64,
    /// Skip all Shopify writes.
    pub dry_run: bool,
}

/// What a finished run did.
#[derive(Debug)]
pub enum StockSyncOutcome {
    /// The kill switch is off; nothing was fetched or written.
    Disabled,
    /// The run went through; see the report.
    Completed(StockSyncReport),
}

/// Counters and detail lists from one run.
#[derive(Debug, Default)]
pub struct StockSyncReport {
    /// Sync-flagged variants the run examined.
    pub considered: usize,
    /// Targets written, or on a dry run, that would have been written.
    pub synced: usize,
    /// Decisions that needed no write.
    pub skipped: usize,
    /// Writes that errored.
    pub failed: usize,
    /// Variants the warehouse knows nothing about.
    pub missing: Vec<MissingVariant>,
    /// Failed writes with reasons.
    pub failures: Vec<ItemFailure>,
    /// False when the catalog walk stopped early; variants past the cut
    /// were not considered.
    pub catalog_complete: bool,
}

/// One variant with no warehouse match.
#[derive(Debug, Clone)]
pub struct MissingVariant {
    /// Shopify numeric variant ID.
    pub variant_id: i64,
    /// Parent product title.
    pub product_title: String,
    /// Variant title.
    pub variant_title: String,
    /// Variant SKU, when it has one.
    pub sku: Option<String>,
}

/// One failed write.
#[derive(Debug, Clone)]
pub struct ItemFailure {
    /// Shopify numeric variant ID.
    pub variant_id: i64,
    /// Variant SKU, when it has one.
    pub sku: Option<String>,
    /// Human-readable failure reason.
    pub reason: String,
}

/// Errors that abort a run outright.
#[derive(Debug, Error)]
pub enum StockSyncError {
    /// No location to write to.
    #[error("no Shopify location configured; pass --location or set shopify_default_location_id")]
    NoLocation,

    /// Settings could not be read.
    #[error(transparent)]
    Settings(#[from] RepositoryError),

    /// The catalog walk failed outright.
    #[error(transparent)]
    Shopify(#[from] ShopifyError),

    /// The warehouse scan failed.
    #[error(transparent)]
    Warehouse(#[from] WarehouseError),
}

/// Run a full reconciliation pass under the configured settings.
///
/// Honors the `enable_shopify_stock_sync` kill switch and resolves the
/// threshold and location from the settings store before delegating to
/// [`execute`].
///
/// # Errors
///
/// Returns an error if settings cannot be read, no location is available,
/// or either external scan fails.
pub async fn run(
    shopify: &ShopifyClient,
    warehouse: &WarehouseClient,
    settings: &SettingsStore,
    options: StockSyncOptions,
) -> Result<StockSyncOutcome, StockSyncError> {
    if !settings.stock_sync_enabled().await? {
        tracing::info!("stock sync is disabled in settings, nothing to do");
        return Ok(StockSyncOutcome::Disabled);
    }

    let threshold = settings.min_stock_threshold().await?;
    let location_id = match options.location_id {
        Some(id) => id,
        None => settings
            .default_location_id()
            .await?
            .ok_or(StockSyncError::NoLocation)?,
    };

    let plan = StockSyncPlan {
        threshold,
        location_id,
        dry_run: options.dry_run,
    };
    let report = execute(shopify, warehouse, plan).await?;
    Ok(StockSyncOutcome::Completed(report))
}

/// Reconcile every sync-flagged variant against warehouse stock.
///
/// Write failures are counted and listed, never retried, and never stop
/// the pass.
///
/// # Errors
///
/// Returns an error if the catalog walk or the warehouse scan fails;
/// per-item write failures end up in the report instead.
pub async fn execute(
    shopify: &ShopifyClient,
    warehouse: &WarehouseClient,
    plan: StockSyncPlan,
) -> Result<StockSyncReport, StockSyncError> {
    let request = VariantFeedRequest {
        page_size: CATALOG_PAGE_SIZE,
        location_id: Some(plan.location_id),
        ..Default::default()
    };
    let scan = shopify.fetch_all_variants(&request).await?;
    if !scan.complete {
        tracing::warn!(
            pages = scan.pages_fetched,
            "catalog walk stopped early, variants past the cut will not be considered"
        );
    }

    let candidates: Vec<_> = scan
        .variants
        .into_iter()
        .filter(|v| v.sync_flag == SyncFlag::Included)
        .collect();

    tracing::info!(
        candidates = candidates.len(),
        location_id = plan.location_id,
        threshold = plan.threshold,
        dry_run = plan.dry_run,
        "reconciling sync-flagged variants"
    );

    let skus: Vec<String> = candidates.iter().filter_map(|v| v.sku.clone()).collect();
    let matches = warehouse.lookup_by_sku_batch(&skus).await?;

    let executor = SyncExecutor::new(shopify.clone(), plan.location_id);
    let mut report = StockSyncReport {
        catalog_complete: scan.complete,
        ..Default::default()
    };

    for variant in &candidates {
        report.considered += 1;

        let warehouse_record = variant
            .sku
            .as_deref()
            .and_then(|sku| matches.get(sku.trim()));
        let warehouse_stock = warehouse_record.map(|r| r.stock);
        let shopify_stock = variant.stock_for_location(Some(plan.location_id));

        let decision = SyncDecision::evaluate(shopify_stock, warehouse_stock, plan.threshold);

        match decision.action {
            SyncAction::SkipMissing => {
                report.skipped += 1;
                report.missing.push(MissingVariant {
                    variant_id: variant.variant_id,
                    product_title: variant.product_title.clone(),
                    variant_title: variant.variant_title.clone(),
                    sku: variant.sku.clone(),
                });
            }
            SyncAction::SkipMatched => report.skipped += 1,
            SyncAction::Update => {
                let target = decision.target_stock.unwrap_or(0);
                if plan.dry_run {
                    tracing::info!(
                        variant_id = variant.variant_id,
                        shopify_stock,
                        target,
                        reason = decision.reason,
                        "dry run, would update"
                    );
                    report.synced += 1;
                } else {
                    match executor.apply_target(variant, target).await {
                        Ok(()) => report.synced += 1,
                        Err(error) => {
                            tracing::warn!(
                                variant_id = variant.variant_id,
                                %error,
                                "stock write failed, moving on"
                            );
                            report.failed += 1;
                            report.failures.push(ItemFailure {
                                variant_id: variant.variant_id,
                                sku: variant.sku.clone(),
                                reason: error.to_string(),
                            });
                        }
                    }
                }
            }
        }

        if report.considered % PROGRESS_EVERY == 0 {
            tracing::info!(
                considered = report.considered,
                synced = report.synced,
                skipped = report.skipped,
                failed = report.failed,
                "stock sync progress"
            );
        }
    }

    Ok(report)
}
