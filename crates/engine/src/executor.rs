//! Applies computed stock targets to Shopify.

use chrono::{SecondsFormat, Utc};
use stockbridge_core::ShopifyVariantRecord;
use thiserror::Error;
use tracing::instrument;

use crate::shopify::{ShopifyClient, ShopifyError};

/// Errors from applying a target to one variant.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// The variant carries no inventory item to write to.
    #[error("variant {0} has no inventory item")]
    MissingInventoryItem(i64),

    /// The underlying mutation failed.
    #[error(transparent)]
    Shopify(#[from] ShopifyError),
}

/// Writes reconciliation targets to Shopify.
///
/// Applies one variant at a time with no retry: a failed item is reported
/// to the caller and the caller decides whether to continue. Repeating a
/// call with the same target is safe; Shopify sees an absolute set to the
/// value it already holds and only the timestamp metafield advances.
#[derive(Clone)]
pub struct SyncExecutor {
    client: ShopifyClient,
    location_id: i64,
}

impl SyncExecutor {
    /// Create an executor writing to one location.
    #[must_use]
    pub const fn new(client: ShopifyClient, location_id: i64) -> Self {
        Self {
            client,
            location_id,
        }
    }

    /// Apply a target stock to one variant.
    ///
    /// Sets the absolute available quantity, then records the push time in
    /// the variant's timestamp metafield. The timestamp write is
    /// best-effort: a failure there logs a warning and does not undo or
    /// fail the already-durable stock write.
    ///
    /// # Errors
    ///
    /// Returns `ExecutorError::MissingInventoryItem` if the variant cannot
    /// receive inventory writes, or the mutation's error otherwise.
    #[instrument(skip(self, variant), fields(variant_id = variant.variant_id, target))]
    pub async fn apply_target(
        &self,
        variant: &ShopifyVariantRecord,
        target: i64,
    ) -> Result<(), ExecutorError> {
        let inventory_item_id = variant
            .inventory_item_id
            .ok_or(ExecutorError::MissingInventoryItem(variant.variant_id))?;

        self.client
            .set_available_quantity(inventory_item_id, self.location_id, target)
            .await?;

        if let Err(error) = self
            .client
            .write_sync_timestamp(&variant.variant_gid(), &sync_timestamp_now())
            .await
        {
            tracing::warn!(
                variant_id = variant.variant_id,
                %error,
                "stock written but sync timestamp update failed"
            );
        }

        Ok(())
    }
}

/// Current time in the ISO-8601 shape the timestamp metafield holds.
fn sync_timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, false)
}
