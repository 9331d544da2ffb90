//! Warehouse stock records and the shop-code linkage table.
//!
//! The warehouse system (Sellmate) reports one record per physical SKU.
//! Each record carries a table of `(shop_id, option_code)` pairs linking it
//! to external sales channels; the Shopify linkage lives in that table, not
//! in a dedicated column.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Well-known shop IDs in the Sellmate option-code table.
pub mod shop {
    /// Code holds the Shopify numeric variant ID.
    pub const SHOPIFY_VARIANT: i64 = 28;
    /// Code holds the variant SKU.
    pub const SKU: i64 = 18;
    /// Code holds the Shopify product-level KSU code.
    pub const PRODUCT_KSU: i64 = 19;
}

/// A `(shop_id, option_code)` pair linking a warehouse record to an external
/// sales channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopCode {
    /// Which external channel this code belongs to (see [`shop`]).
    pub shop_id: i64,
    /// The channel-specific identifier (variant id, SKU, ...).
    pub code: String,
}

impl ShopCode {
    /// Create a new shop code pair.
    #[must_use]
    pub fn new(shop_id: i64, code: impl Into<String>) -> Self {
        Self {
            shop_id,
            code: code.into(),
        }
    }
}

/// Errors raised when constructing a warehouse record from API data.
#[derive(Debug, Error)]
pub enum WarehouseRecordError {
    /// The source row carried no warehouse ID, so it cannot be referenced.
    #[error("warehouse record has no id")]
    MissingId,
}

/// One row per physical SKU held by the warehouse system.
///
/// Records are retrieved fresh from the warehouse API per reconciliation
/// pass; the engine never mutates or deletes them. A record is usable for
/// reconciliation only if it carries a [`shop::SHOPIFY_VARIANT`] code -
/// records without one are permanently unreconcilable and are counted as
/// skipped, never treated as errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarehouseStockRecord {
    /// Primary key in the warehouse system.
    pub warehouse_id: i64,
    /// Human-readable variant name.
    pub variant_name: String,
    /// Units on hand. Never negative.
    pub stock: i64,
    /// SKU as stored on the record itself (the shop-code table may carry
    /// a different one under [`shop::SKU`]).
    pub sku: Option<String>,
    /// Warehouse cost price.
    pub cost_price: Option<Decimal>,
    /// Warehouse selling price.
    pub selling_price: Option<Decimal>,
    /// Channel linkage table.
    pub shop_codes: Vec<ShopCode>,
}

impl WarehouseStockRecord {
    /// Build a record from raw API fields.
    ///
    /// Negative stock values are clamped to zero; the warehouse API reports
    /// oversold items as negative counts, which Shopify cannot represent.
    ///
    /// # Errors
    ///
    /// Returns [`WarehouseRecordError::MissingId`] if the source row has no
    /// warehouse ID.
    pub fn new(
        warehouse_id: Option<i64>,
        variant_name: Option<String>,
        stock: i64,
        sku: Option<String>,
        cost_price: Option<Decimal>,
        selling_price: Option<Decimal>,
        shop_codes: Vec<ShopCode>,
    ) -> Result<Self, WarehouseRecordError> {
        let warehouse_id = warehouse_id.ok_or(WarehouseRecordError::MissingId)?;

        Ok(Self {
            warehouse_id,
            variant_name: variant_name.unwrap_or_default(),
            stock: stock.max(0),
            sku,
            cost_price,
            selling_price,
            shop_codes,
        })
    }

    /// Look up the code stored for a given shop ID.
    #[must_use]
    pub fn code_for(&self, shop_id: i64) -> Option<&str> {
        self.shop_codes
            .iter()
            .find(|c| c.shop_id == shop_id)
            .map(|c| c.code.as_str())
    }

    /// The Shopify numeric variant ID this record is linked to, if any.
    ///
    /// Returns `None` both when the shop-code table has no
    /// [`shop::SHOPIFY_VARIANT`] entry and when the stored code is not a
    /// number; either way the record cannot be correlated.
    #[must_use]
    pub fn shopify_variant_id(&self) -> Option<i64> {
        self.code_for(shop::SHOPIFY_VARIANT)
            .and_then(|code| code.trim().parse().ok())
    }

    /// The SKU carried in the shop-code table under [`shop::SKU`].
    #[must_use]
    pub fn sku_code(&self) -> Option<&str> {
        self.code_for(shop::SKU)
    }

    /// The Shopify product-level KSU code, if present.
    #[must_use]
    pub fn product_ksu(&self) -> Option<&str> {
        self.code_for(shop::PRODUCT_KSU)
    }

    /// Whether this record can be correlated to a Shopify variant at all.
    #[must_use]
    pub fn has_shopify_linkage(&self) -> bool {
        self.shopify_variant_id().is_some()
    }
}
