//! Warehouse-to-Shopify record correlation.
//!
//! The warehouse knows about Shopify only through its shop-code table:
//! code 28 carries the numeric variant ID, code 18 the SKU. A full scan is
//! indexed once per pass and joined against variants from there.

use std::collections::HashMap;

use stockbridge_core::{ShopifyVariantRecord, WarehouseStockRecord};

/// Index of warehouse records by their Shopify linkage.
///
/// Built from one full-table scan. Duplicate keys resolve to the last
/// record scanned; records without any Shopify variant code cannot be
/// correlated and are kept only as a count.
#[derive(Debug, Default)]
pub struct WarehouseIndex {
    records: Vec<WarehouseStockRecord>,
    by_variant_id: HashMap<i64, usize>,
    by_sku: HashMap<String, usize>,
    unlinked: usize,
}

/// Ephemeral join of one Shopify variant to its warehouse record for one
/// reconciliation pass.
#[derive(Debug, Clone, Copy)]
pub struct CorrelatedPair<'a> {
    /// The Shopify side of the join.
    pub variant: &'a ShopifyVariantRecord,
    /// The warehouse side, absent when nothing links to this variant.
    pub warehouse: Option<&'a WarehouseStockRecord>,
}

impl WarehouseIndex {
    /// Index scanned records. Later records overwrite earlier ones on
    /// duplicate variant IDs or SKUs.
    #[must_use]
    pub fn build(records: Vec<WarehouseStockRecord>) -> Self {
        let mut index = Self::default();
        for record in records {
            index.insert(record);
        }
        index
    }

    fn insert(&mut self, record: WarehouseStockRecord) {
        let variant_id = record.shopify_variant_id();
        let sku = record.sku_code().map(ToString::to_string);

        if variant_id.is_none() {
            self.unlinked += 1;
        }

        let slot = self.records.len();
        self.records.push(record);

        if let Some(id) = variant_id {
            self.by_variant_id.insert(id, slot);
        }
        if let Some(sku) = sku {
            self.by_sku.insert(sku, slot);
        }
    }

    /// The record linked to a Shopify variant ID via shop code 28.
    #[must_use]
    pub fn by_variant(&self, variant_id: i64) -> Option<&WarehouseStockRecord> {
        self.by_variant_id
            .get(&variant_id)
            .and_then(|&slot| self.records.get(slot))
    }

    /// The record carrying this SKU in shop code 18.
    #[must_use]
    pub fn by_sku(&self, sku: &str) -> Option<&WarehouseStockRecord> {
        self.by_sku
            .get(sku.trim())
            .and_then(|&slot| self.records.get(slot))
    }

    /// Join one Shopify variant against the index.
    #[must_use]
    pub fn correlate<'a>(&'a self, variant: &'a ShopifyVariantRecord) -> CorrelatedPair<'a> {
        CorrelatedPair {
            variant,
            warehouse: self.by_variant(variant.variant_id),
        }
    }

    /// Records with no Shopify variant code. Permanently unreconcilable;
    /// reported as a skip count, never as an error.
    #[must_use]
    pub const fn unlinked_count(&self) -> usize {
        self.unlinked
    }

    /// Total records indexed, including unlinked ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the scan produced no records at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
