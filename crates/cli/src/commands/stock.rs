//! Stock reconciliation command.
//!
//! # Usage
//!
//! ```bash
//! # Reconcile against the configured default location
//! stockbridge shopify sync-stock
//!
//! # Preview without writing, against an explicit location
//! stockbridge shopify sync-stock --location=82124832930 --dry-run
//!
//! # Also write unmatched variants to a CSV for the purchasing team
//! stockbridge shopify sync-stock --export-missing
//! ```
//!
//! When the sync is disabled in settings the command reports that and
//! exits successfully; a kill switch firing is not an error.

use std::path::PathBuf;

use chrono::Utc;
use stockbridge_engine::jobs::stock_sync::{
    self, MissingVariant, StockSyncError, StockSyncOptions, StockSyncOutcome, StockSyncReport,
};
use thiserror::Error;

use super::{Context, SetupError};

/// Errors from the `shopify sync-stock` command.
#[derive(Debug, Error)]
pub enum StockCommandError {
    /// Setup failed before the sync started.
    #[error(transparent)]
    Setup(#[from] SetupError),

    /// The sync itself failed.
    #[error(transparent)]
    Sync(#[from] StockSyncError),

    /// The missing-variants export could not be written.
    #[error("failed to write export: {0}")]
    Export(#[from] std::io::Error),
}

/// Reconcile Shopify stock levels against warehouse stock.
///
/// # Errors
///
/// Returns an error if setup fails, either external scan fails, or the
/// export file cannot be written. Per-variant write failures are reported
/// in the summary instead.
pub async fn sync_stock(
    location: Option<i64>,
    dry_run: bool,
    export_missing: bool,
) -> Result<(), StockCommandError> {
    let context = Context::init().await?;
    let warehouse = context.warehouse_client().await?;

    let options = StockSyncOptions {
        location_id: location,
        dry_run,
    };
    let outcome = stock_sync::run(&context.shopify, &warehouse, &context.settings, options).await?;

    let report = match outcome {
        StockSyncOutcome::Disabled => {
            tracing::info!("stock sync is disabled in settings; nothing was written");
            return Ok(());
        }
        StockSyncOutcome::Completed(report) => report,
    };

    print_report(&report, dry_run);

    if export_missing && !report.missing.is_empty() {
        let path = write_missing_export(&report.missing)?;
        tracing::info!(
            path = %path.display(),
            count = report.missing.len(),
            "wrote missing-variants export"
        );
    }

    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_report(report: &StockSyncReport, dry_run: bool) {
    println!("Stock sync {}", if dry_run { "dry run" } else { "complete" });
    println!("  considered: {}", report.considered);
    println!("  synced:     {}", report.synced);
    println!("  skipped:    {}", report.skipped);
    println!("  failed:     {}", report.failed);
    println!("  missing:    {}", report.missing.len());
    if dry_run {
        println!("  (dry run, nothing was written)");
    }
    if !report.catalog_complete {
        println!("  note: catalog walk stopped early, counts are partial");
    }
    for failure in &report.failures {
        println!(
            "  failed: variant {} ({}): {}",
            failure.variant_id,
            failure.sku.as_deref().unwrap_or("no sku"),
            failure.reason
        );
    }
}

/// Write the unmatched variants to a timestamped CSV in the working
/// directory and return its path.
fn write_missing_export(missing: &[MissingVariant]) -> std::io::Result<PathBuf> {
    let path = PathBuf::from(format!(
        "missing-variants-{}.csv",
        Utc::now().format("%Y%m%d-%H%M%S")
    ));
    std::fs::write(&path, render_missing_csv(missing))?;
    Ok(path)
}

fn render_missing_csv(missing: &[MissingVariant]) -> String {
    let mut out = String::from("variant_id,product_title,variant_title,sku\n");
    for entry in missing {
        out.push_str(&format!(
            "{},{},{},{}\n",
            entry.variant_id,
            csv_field(&entry.product_title),
            csv_field(&entry.variant_title),
            csv_field(entry.sku.as_deref().unwrap_or_default()),
        ));
    }
    out
}

/// Quote a CSV field when it contains a delimiter, quote, or newline.
fn csv_field(raw: &str) -> String {
    if raw.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", raw.replace('"', "\"\""))
    } else {
        raw.to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_field_passes_plain_values_through() {
        assert_eq!(csv_field("TS-RED-M"), "TS-RED-M");
        assert_eq!(csv_field(""), "");
    }

    #[test]
    fn test_csv_field_quotes_and_escapes() {
        assert_eq!(csv_field("Crew, Red"), "\"Crew, Red\"");
        assert_eq!(csv_field("8\" sleeve"), "\"8\"\" sleeve\"");
        assert_eq!(csv_field("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn test_render_missing_csv() {
        let missing = vec![
            MissingVariant {
                variant_id: 9001,
                product_title: "Crewneck, Heavy".to_string(),
                variant_title: "M".to_string(),
                sku: Some("CN-H-M".to_string()),
            },
            MissingVariant {
                variant_id: 9002,
                product_title: "Socks".to_string(),
                variant_title: "One Size".to_string(),
                sku: None,
            },
        ];

        let csv = render_missing_csv(&missing);
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "variant_id,product_title,variant_title,sku"
        );
        assert_eq!(lines.next().unwrap(), "9001,\"Crewneck, Heavy\",M,CN-H-M");
        assert_eq!(lines.next().unwrap(), "9002,Socks,One Size,");
        assert!(lines.next().is_none());
    }
}
