//! Request, page, and wire types for the variant feed.

use serde::Deserialize;
use stockbridge_core::variant::parse_gid;
use stockbridge_core::{InventoryLevelEntry, ShopifyVariantRecord, SyncFlag};

/// Default variants per backend page.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Parameters for one variant feed fetch.
#[derive(Debug, Clone)]
pub struct VariantFeedRequest {
    /// Variants requested per backend call.
    pub page_size: u32,
    /// Resume cursor from a previous page, if any.
    pub cursor: Option<String>,
    /// Shopify sort key name, e.g. `ID` or `TITLE`.
    pub sort_key: Option<String>,
    /// Reverse the sort order.
    pub sort_reverse: bool,
    /// Caller search terms. `status:active` is always appended on top.
    pub search: Option<String>,
    /// Keep only inventory levels at this location and drop variants not
    /// stocked there.
    pub location_id: Option<i64>,
}

impl Default for VariantFeedRequest {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            cursor: None,
            sort_key: None,
            sort_reverse: false,
            search: None,
            location_id: None,
        }
    }
}

impl VariantFeedRequest {
    /// The search string actually sent to Shopify.
    ///
    /// Only active products are ever considered for sync, so `status:active`
    /// rides along with whatever the caller asked for.
    #[must_use]
    pub fn effective_query(&self) -> String {
        match self.search.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => format!("{s} status:active"),
            _ => "status:active".to_string(),
        }
    }
}

/// One page of the variant feed.
#[derive(Debug, Clone)]
pub struct VariantPage {
    /// Variants that survived GID parsing and the location filter.
    pub variants: Vec<ShopifyVariantRecord>,
    /// Whether Shopify reports more pages after this one.
    pub has_next_page: bool,
    /// Cursor to resume after this page.
    pub end_cursor: Option<String>,
}

/// Result of walking the whole feed.
#[derive(Debug, Clone, Default)]
pub struct VariantScan {
    /// Everything accumulated, in feed order.
    pub variants: Vec<ShopifyVariantRecord>,
    /// Backend pages fetched.
    pub pages_fetched: u32,
    /// False when the walk stopped early on a failed page or hit the
    /// iteration cap.
    pub complete: bool,
}

// Wire shapes for the productVariants query.

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VariantsData {
    pub(crate) product_variants: VariantConnection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VariantConnection {
    pub(crate) page_info: PageInfo,
    #[serde(default)]
    pub(crate) nodes: Vec<VariantNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PageInfo {
    pub(crate) has_next_page: bool,
    pub(crate) end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VariantNode {
    pub(crate) id: String,
    #[serde(default)]
    pub(crate) title: String,
    pub(crate) sku: Option<String>,
    pub(crate) barcode: Option<String>,
    pub(crate) inventory_quantity: Option<i64>,
    pub(crate) product: Option<ProductNode>,
    pub(crate) inventory_item: Option<InventoryItemNode>,
    pub(crate) pim_sync: Option<MetafieldNode>,
    pub(crate) pim_sync_timestamp: Option<MetafieldNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProductNode {
    pub(crate) id: String,
    #[serde(default)]
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InventoryItemNode {
    pub(crate) id: String,
    pub(crate) inventory_levels: Option<LevelConnection>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LevelConnection {
    #[serde(default)]
    pub(crate) nodes: Vec<LevelNode>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LevelNode {
    pub(crate) location: LocationNode,
    #[serde(default)]
    pub(crate) quantities: Vec<QuantityNode>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LocationNode {
    pub(crate) id: String,
    #[serde(default)]
    pub(crate) name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QuantityNode {
    pub(crate) name: String,
    pub(crate) quantity: i64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MetafieldNode {
    pub(crate) value: String,
}

/// One entry of a mutation's `userErrors` array. Only the message is kept;
/// the offending field path rides along in the raw response for debugging.
#[derive(Debug, Deserialize)]
pub(crate) struct UserErrorNode {
    pub(crate) message: String,
}

impl VariantNode {
    /// Convert into the engine's record shape.
    ///
    /// Returns `None` when the variant must be dropped: its global ID does
    /// not parse, or a location filter is active and the variant carries no
    /// level at that location.
    pub(crate) fn into_record(self, location_filter: Option<i64>) -> Option<ShopifyVariantRecord> {
        let variant_id = parse_gid(&self.id)?;

        let (product_id, product_title, product_tags) = match self.product {
            Some(p) => (parse_gid(&p.id), p.title, p.tags),
            None => (None, String::new(), Vec::new()),
        };

        let (inventory_item_id, mut inventory_levels) = match self.inventory_item {
            Some(item) => {
                let levels = item
                    .inventory_levels
                    .map(|conn| {
                        conn.nodes
                            .into_iter()
                            .filter_map(level_entry)
                            .collect::<Vec<_>>()
                    })
                    .unwrap_or_default();
                (parse_gid(&item.id), levels)
            }
            None => (None, Vec::new()),
        };

        if let Some(location_id) = location_filter {
            inventory_levels.retain(|l| l.location_id == location_id);
            if inventory_levels.is_empty() {
                return None;
            }
        }

        let sync_flag =
            SyncFlag::from_metafield(self.pim_sync.as_ref().map(|m| m.value.as_str()));

        Some(ShopifyVariantRecord {
            variant_id,
            product_id,
            product_title,
            product_tags,
            variant_title: self.title,
            sku: self.sku.filter(|s| !s.is_empty()),
            barcode: self.barcode.filter(|s| !s.is_empty()),
            inventory_item_id,
            total_inventory: self.inventory_quantity.unwrap_or(0),
            inventory_levels,
            sync_flag,
            sync_timestamp: self
                .pim_sync_timestamp
                .map(|m| m.value)
                .filter(|v| !v.is_empty()),
        })
    }
}

fn level_entry(node: LevelNode) -> Option<InventoryLevelEntry> {
    let location_id = parse_gid(&node.location.id)?;
    let available = node
        .quantities
        .iter()
        .find(|q| q.name == "available")
        .map_or(0, |q| q.quantity);

    Some(InventoryLevelEntry {
        location_id,
        location_name: node.location.name,
        available,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const NODE_JSON: &str = r#"{
        "id": "gid://shopify/ProductVariant/9001",
        "title": "M",
        "sku": "LS-M",
        "barcode": null,
        "inventoryQuantity": 12,
        "product": {
            "id": "gid://shopify/Product/42",
            "title": "Linen Shirt",
            "tags": ["Summer", "26SS", "Red"]
        },
        "inventoryItem": {
            "id": "gid://shopify/InventoryItem/777",
            "inventoryLevels": {
                "nodes": [
                    {
                        "location": {"id": "gid://shopify/Location/100", "name": "Seoul"},
                        "quantities": [{"name": "available", "quantity": 4}]
                    },
                    {
                        "location": {"id": "gid://shopify/Location/200", "name": "Busan"},
                        "quantities": [{"name": "available", "quantity": 8}]
                    }
                ]
            }
        },
        "pimSync": {"value": "true"},
        "pimSyncTimestamp": {"value": "2025-01-01T00:00:00+00:00"}
    }"#;

    fn node() -> VariantNode {
        serde_json::from_str(NODE_JSON).unwrap()
    }

    #[test]
    fn test_node_converts_to_record() {
        let record = node().into_record(None).unwrap();

        assert_eq!(record.variant_id, 9001);
        assert_eq!(record.product_id, Some(42));
        assert_eq!(record.product_title, "Linen Shirt");
        assert_eq!(record.product_tags, vec!["Summer", "26SS", "Red"]);
        assert_eq!(record.sku.as_deref(), Some("LS-M"));
        assert_eq!(record.inventory_item_id, Some(777));
        assert_eq!(record.total_inventory, 12);
        assert_eq!(record.inventory_levels.len(), 2);
        assert_eq!(record.sync_flag, SyncFlag::Included);
        assert_eq!(
            record.sync_timestamp.as_deref(),
            Some("2025-01-01T00:00:00+00:00")
        );
    }

    #[test]
    fn test_location_filter_keeps_only_matching_level() {
        let record = node().into_record(Some(200)).unwrap();

        assert_eq!(record.inventory_levels.len(), 1);
        assert_eq!(record.inventory_levels.first().unwrap().available, 8);
        assert_eq!(record.stock_for_location(Some(200)), 8);
    }

    #[test]
    fn test_location_filter_drops_unstocked_variant() {
        assert!(node().into_record(Some(999)).is_none());
    }

    #[test]
    fn test_unparseable_gid_drops_variant() {
        let mut raw = node();
        raw.id = "not-a-gid".to_string();
        assert!(raw.into_record(None).is_none());
    }

    #[test]
    fn test_effective_query_always_scopes_to_active() {
        let bare = VariantFeedRequest::default();
        assert_eq!(bare.effective_query(), "status:active");

        let with_search = VariantFeedRequest {
            search: Some("  sku:LS-* ".to_string()),
            ..Default::default()
        };
        assert_eq!(with_search.effective_query(), "sku:LS-* status:active");
    }

    #[test]
    fn test_missing_metafields_leave_flag_unset() {
        let raw: VariantNode =
            serde_json::from_str(r#"{"id": "gid://shopify/ProductVariant/1"}"#).unwrap();
        let record = raw.into_record(None).unwrap();

        assert_eq!(record.sync_flag, SyncFlag::Unset);
        assert!(record.sync_timestamp.is_none());
        assert_eq!(record.total_inventory, 0);
    }
}
