//! Shopify variant records, inventory levels, and the sync inclusion flag.

use serde::{Deserialize, Serialize};

/// Tri-state sync inclusion flag stored in the `custom.pim_sync` metafield.
///
/// The flag is the sole gate controlling whether a variant participates in
/// automated stock sync. Manual reconciliation may operate on any variant
/// regardless of flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SyncFlag {
    /// Metafield value `"true"` - included in automated sync.
    Included,
    /// Metafield value `"false"` - explicitly excluded.
    Excluded,
    /// Metafield absent or any other value.
    #[default]
    Unset,
}

impl SyncFlag {
    /// Parse the flag from a raw metafield value.
    ///
    /// Only the exact strings `"true"` and `"false"` (after trimming) are
    /// meaningful; anything else is [`SyncFlag::Unset`].
    #[must_use]
    pub fn from_metafield(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("true") => Self::Included,
            Some("false") => Self::Excluded,
            _ => Self::Unset,
        }
    }

    /// The metafield value to write for this flag. Unset writes empty.
    #[must_use]
    pub const fn as_metafield(self) -> &'static str {
        match self {
            Self::Included => "true",
            Self::Excluded => "false",
            Self::Unset => "",
        }
    }
}

impl std::fmt::Display for SyncFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Included => write!(f, "include"),
            Self::Excluded => write!(f, "exclude"),
            Self::Unset => write!(f, "unset"),
        }
    }
}

/// Available units of one variant at one location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryLevelEntry {
    /// Shopify numeric location ID.
    pub location_id: i64,
    /// Location display name.
    pub location_name: String,
    /// Units available for sale at this location.
    pub available: i64,
}

/// One Shopify product variant as seen by the sync engine.
///
/// Read on demand from the Admin API. The engine only ever writes back the
/// sync flag, the sync timestamp metafield, and the inventory level - all
/// other fields are read-only here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopifyVariantRecord {
    /// Shopify numeric variant ID. Correlation key against the warehouse.
    pub variant_id: i64,
    /// Shopify numeric product ID.
    pub product_id: Option<i64>,
    /// Parent product title.
    pub product_title: String,
    /// Product tags, already split and trimmed.
    pub product_tags: Vec<String>,
    /// Variant title (option values).
    pub variant_title: String,
    /// Variant SKU.
    pub sku: Option<String>,
    /// Variant barcode.
    pub barcode: Option<String>,
    /// Shopify numeric inventory item ID, needed for stock writes.
    pub inventory_item_id: Option<i64>,
    /// Aggregate inventory across all locations.
    pub total_inventory: i64,
    /// Per-location availability. When the feed was queried with a location
    /// filter this holds at most the matching entry.
    pub inventory_levels: Vec<InventoryLevelEntry>,
    /// Sync inclusion flag from `custom.pim_sync`.
    pub sync_flag: SyncFlag,
    /// Last successful push time from `custom.pim_kr_sync_timestamp`.
    pub sync_timestamp: Option<String>,
}

impl ShopifyVariantRecord {
    /// Global ID for this variant.
    #[must_use]
    pub fn variant_gid(&self) -> String {
        format_gid("ProductVariant", self.variant_id)
    }

    /// Global ID for the variant's inventory item, if known.
    #[must_use]
    pub fn inventory_item_gid(&self) -> Option<String> {
        self.inventory_item_id
            .map(|id| format_gid("InventoryItem", id))
    }

    /// Stock visible to the sync engine.
    ///
    /// With a location filter this is the availability at that location
    /// (zero if the variant is not stocked there); without one it is the
    /// cross-location aggregate.
    #[must_use]
    pub fn stock_for_location(&self, location_id: Option<i64>) -> i64 {
        location_id.map_or(self.total_inventory, |loc| {
            self.inventory_levels
                .iter()
                .find(|l| l.location_id == loc)
                .map_or(0, |l| l.available)
        })
    }

    /// Exact, case-insensitive membership test against the tag list.
    ///
    /// `"26ss"` matches a variant tagged `26SS`; the partial `"26S"` does
    /// not, even though Shopify's own tag search would return it.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        let needle = tag.trim();
        self.product_tags
            .iter()
            .any(|t| t.eq_ignore_ascii_case(needle))
    }
}

/// Extract the trailing numeric ID from a Shopify global ID.
///
/// `gid://shopify/ProductVariant/9001` parses to `9001`. Returns `None`
/// for malformed input.
#[must_use]
pub fn parse_gid(gid: &str) -> Option<i64> {
    let path = gid.split('?').next().unwrap_or(gid);
    path.rsplit('/').next().and_then(|id| id.parse().ok())
}

/// Build a Shopify global ID from a resource name and numeric ID.
#[must_use]
pub fn format_gid(resource: &str, id: i64) -> String {
    format!("gid://shopify/{resource}/{id}")
}

/// Split a raw comma-separated tag string into trimmed, non-empty tags.
#[must_use]
pub fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(ToString::to_string)
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn variant(tags: &[&str]) -> ShopifyVariantRecord {
        ShopifyVariantRecord {
            variant_id: 9001,
            product_id: Some(42),
            product_title: "Linen Shirt".to_string(),
            product_tags: tags.iter().map(ToString::to_string).collect(),
            variant_title: "M".to_string(),
            sku: Some("LS-M".to_string()),
            barcode: None,
            inventory_item_id: Some(777),
            total_inventory: 12,
            inventory_levels: vec![
                InventoryLevelEntry {
                    location_id: 100,
                    location_name: "Seoul".to_string(),
                    available: 4,
                },
                InventoryLevelEntry {
                    location_id: 200,
                    location_name: "Busan".to_string(),
                    available: 8,
                },
            ],
            sync_flag: SyncFlag::Included,
            sync_timestamp: None,
        }
    }

    #[test]
    fn test_sync_flag_from_metafield() {
        assert_eq!(SyncFlag::from_metafield(Some("true")), SyncFlag::Included);
        assert_eq!(SyncFlag::from_metafield(Some("false")), SyncFlag::Excluded);
        assert_eq!(SyncFlag::from_metafield(Some(" true ")), SyncFlag::Included);
        assert_eq!(SyncFlag::from_metafield(Some("")), SyncFlag::Unset);
        assert_eq!(SyncFlag::from_metafield(Some("yes")), SyncFlag::Unset);
        assert_eq!(SyncFlag::from_metafield(None), SyncFlag::Unset);
    }

    #[test]
    fn test_sync_flag_round_trip() {
        for flag in [SyncFlag::Included, SyncFlag::Excluded] {
            assert_eq!(SyncFlag::from_metafield(Some(flag.as_metafield())), flag);
        }
        assert_eq!(SyncFlag::Unset.as_metafield(), "");
    }

    #[test]
    fn test_has_tag_is_exact_and_case_insensitive() {
        let v = variant(&["Summer", "26SS", "Red"]);
        assert!(v.has_tag("26ss"));
        assert!(v.has_tag("SUMMER"));
        assert!(v.has_tag(" red "));
        // Partial matches are rejected even though backend tag search
        // would have returned this variant as a candidate.
        assert!(!v.has_tag("26S"));
        assert!(!v.has_tag("Sum"));
    }

    #[test]
    fn test_stock_with_and_without_location() {
        let v = variant(&[]);
        assert_eq!(v.stock_for_location(None), 12);
        assert_eq!(v.stock_for_location(Some(100)), 4);
        assert_eq!(v.stock_for_location(Some(200)), 8);
        assert_eq!(v.stock_for_location(Some(999)), 0);
    }

    #[test]
    fn test_gid_helpers() {
        assert_eq!(parse_gid("gid://shopify/ProductVariant/9001"), Some(9001));
        assert_eq!(parse_gid("gid://shopify/InventoryItem/777?x=1"), Some(777));
        assert_eq!(parse_gid("not a gid"), None);
        assert_eq!(
            format_gid("ProductVariant", 9001),
            "gid://shopify/ProductVariant/9001"
        );
        let v = variant(&[]);
        assert_eq!(v.variant_gid(), "gid://shopify/ProductVariant/9001");
        assert_eq!(
            v.inventory_item_gid().unwrap(),
            "gid://shopify/InventoryItem/777"
        );
    }

    #[test]
    fn test_split_tags_trims_and_drops_empties() {
        assert_eq!(
            split_tags("Summer, 26SS , ,Red"),
            vec!["Summer", "26SS", "Red"]
        );
        assert!(split_tags("").is_empty());
    }
}
