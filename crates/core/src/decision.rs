//! The threshold-based reconciliation policy.
//!
//! Pure computation, no I/O. Given the stock Shopify currently shows, the
//! stock the warehouse reports, and the minimum-stock threshold, decide
//! whether to push a new value and what that value is.

use serde::Serialize;

/// What the sync engine should do with one variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncAction {
    /// No warehouse record correlates to this variant.
    SkipMissing,
    /// Shopify already shows the target value; nothing to write.
    SkipMatched,
    /// Push the target value to Shopify.
    Update,
}

/// The outcome of evaluating one correlated variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncDecision {
    /// Stock currently visible on Shopify.
    pub shopify_stock: i64,
    /// Stock reported by the warehouse, when a record was found.
    pub warehouse_stock: Option<i64>,
    /// The value Shopify should show, when a record was found.
    pub target_stock: Option<i64>,
    /// What to do.
    pub action: SyncAction,
    /// Human-readable reason, shown in run summaries.
    pub reason: &'static str,
}

impl SyncDecision {
    /// Evaluate the policy for one variant.
    ///
    /// The target is the warehouse stock, forced to zero when the warehouse
    /// count is at or below `threshold`. Items the warehouse considers too
    /// low to fulfill reliably must not look sellable on Shopify, even when
    /// one or two units technically remain.
    #[must_use]
    pub fn evaluate(shopify_stock: i64, warehouse_stock: Option<i64>, threshold: i64) -> Self {
        let Some(warehouse_stock) = warehouse_stock else {
            return Self {
                shopify_stock,
                warehouse_stock: None,
                target_stock: None,
                action: SyncAction::SkipMissing,
                reason: "no warehouse record",
            };
        };

        let low_stock = warehouse_stock <= threshold;
        let target = if low_stock { 0 } else { warehouse_stock };

        if shopify_stock == target {
            return Self {
                shopify_stock,
                warehouse_stock: Some(warehouse_stock),
                target_stock: Some(target),
                action: SyncAction::SkipMatched,
                reason: if target == 0 {
                    "already zero"
                } else {
                    "already matches"
                },
            };
        }

        Self {
            shopify_stock,
            warehouse_stock: Some(warehouse_stock),
            target_stock: Some(target),
            action: SyncAction::Update,
            reason: if low_stock { "low stock" } else { "stock update" },
        }
    }

    /// Whether this decision carries a write.
    #[must_use]
    pub const fn is_update(&self) -> bool {
        matches!(self.action, SyncAction::Update)
    }
}
