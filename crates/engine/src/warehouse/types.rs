//! Wire types for the Sellmate stock listing endpoint.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use stockbridge_core::{ShopCode, WarehouseRecordError, WarehouseStockRecord};

/// Stock listing response envelope.
///
/// The service returns `{data, meta}` on success and `{errors}` on
/// failure, so all three fields are optional here and the client decides
/// which shape it got.
#[derive(Debug, Deserialize)]
pub struct StockListResponse {
    #[serde(default)]
    pub data: Vec<StockRow>,
    pub meta: Option<PageMeta>,
    #[serde(default)]
    pub errors: Vec<serde_json::Value>,
}

/// Pagination metadata.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageMeta {
    pub current_page: u32,
    pub last_page: u32,
    pub total: i64,
}

/// One stock row as the service reports it.
#[derive(Debug, Deserialize)]
pub struct StockRow {
    pub id: Option<i64>,
    #[serde(rename = "optionName")]
    pub option_name: Option<String>,
    #[serde(default)]
    pub stock: i64,
    pub sku: Option<String>,
    #[serde(rename = "costPrice", default, deserialize_with = "flexible_decimal")]
    pub cost_price: Option<Decimal>,
    #[serde(
        rename = "sellingPrice",
        default,
        deserialize_with = "flexible_decimal"
    )]
    pub selling_price: Option<Decimal>,
    #[serde(rename = "optionHasCodeByShop", default)]
    pub shop_codes: Vec<ShopCodeRow>,
}

/// One `(shop, code)` entry from the `optionHasCodeByShop` relation.
#[derive(Debug, Deserialize)]
pub struct ShopCodeRow {
    #[serde(rename = "shopId")]
    pub shop_id: i64,
    #[serde(rename = "optionCode", default)]
    pub option_code: String,
}

impl StockRow {
    /// Convert the wire row into the domain record.
    ///
    /// # Errors
    ///
    /// Returns [`WarehouseRecordError::MissingId`] for rows without an ID.
    pub fn into_record(self) -> Result<WarehouseStockRecord, WarehouseRecordError> {
        let shop_codes = self
            .shop_codes
            .into_iter()
            .map(|c| ShopCode::new(c.shop_id, c.option_code))
            .collect();

        WarehouseStockRecord::new(
            self.id,
            self.option_name,
            self.stock,
            self.sku,
            self.cost_price,
            self.selling_price,
            shop_codes,
        )
    }
}

/// Prices arrive as JSON numbers, numeric strings, or null depending on
/// the account's configuration. Anything unusable reads as `None`; prices
/// are reporting data here, never sync input.
fn flexible_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        Some(serde_json::Value::Number(n)) => n.to_string().parse().ok(),
        _ => None,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use stockbridge_core::warehouse::shop;

    const PAGE_JSON: &str = r#"{
        "data": [
            {
                "id": 41,
                "optionName": "Linen Shirt / M",
                "stock": 7,
                "sku": "LS-M",
                "costPrice": "1200.50",
                "sellingPrice": 3400,
                "optionHasCodeByShop": [
                    {"shopId": 28, "optionCode": "9001"},
                    {"shopId": 18, "optionCode": "LS-M"}
                ]
            },
            {
                "id": 42,
                "optionName": "Linen Shirt / L",
                "stock": -3,
                "sku": null,
                "costPrice": null,
                "sellingPrice": null,
                "optionHasCodeByShop": []
            }
        ],
        "meta": {"current_page": 1, "last_page": 3, "total": 250}
    }"#;

    #[test]
    fn test_parse_stock_page() {
        let response: StockListResponse = serde_json::from_str(PAGE_JSON).unwrap();
        assert!(response.errors.is_empty());

        let meta = response.meta.unwrap();
        assert_eq!(meta.current_page, 1);
        assert_eq!(meta.last_page, 3);
        assert_eq!(meta.total, 250);

        assert_eq!(response.data.len(), 2);
        let first = &response.data[0];
        assert_eq!(first.id, Some(41));
        assert_eq!(first.cost_price.unwrap().to_string(), "1200.50");
        assert_eq!(first.selling_price.unwrap().to_string(), "3400");
    }

    #[test]
    fn test_into_record_maps_shop_codes() {
        let response: StockListResponse = serde_json::from_str(PAGE_JSON).unwrap();
        let record = response
            .data
            .into_iter()
            .next()
            .unwrap()
            .into_record()
            .unwrap();

        assert_eq!(record.warehouse_id, 41);
        assert_eq!(record.code_for(shop::SHOPIFY_VARIANT), Some("9001"));
        assert_eq!(record.shopify_variant_id(), Some(9001));
        assert_eq!(record.sku_code(), Some("LS-M"));
    }

    #[test]
    fn test_into_record_clamps_negative_stock() {
        let response: StockListResponse = serde_json::from_str(PAGE_JSON).unwrap();
        let record = response
            .data
            .into_iter()
            .nth(1)
            .unwrap()
            .into_record()
            .unwrap();

        assert_eq!(record.stock, 0);
        assert!(!record.has_shopify_linkage());
    }

    #[test]
    fn test_row_without_id_is_rejected() {
        let row: StockRow =
            serde_json::from_str(r#"{"optionName": "orphan", "stock": 1}"#).unwrap();
        assert!(matches!(
            row.into_record(),
            Err(WarehouseRecordError::MissingId)
        ));
    }

    #[test]
    fn test_error_envelope() {
        let response: StockListResponse =
            serde_json::from_str(r#"{"errors": ["token expired"]}"#).unwrap();
        assert_eq!(response.errors.len(), 1);
        assert!(response.data.is_empty());
        assert!(response.meta.is_none());
    }

    #[test]
    fn test_flexible_decimal_handles_garbage() {
        let row: StockRow =
            serde_json::from_str(r#"{"id": 1, "stock": 0, "costPrice": {"weird": true}}"#).unwrap();
        assert!(row.cost_price.is_none());
    }
}
