//! Inventory writes against the Admin API.

use serde::Deserialize;
use stockbridge_core::variant::format_gid;
use tracing::instrument;

use super::types::UserErrorNode;
use super::{ShopifyClient, ShopifyError};

const INVENTORY_SET_MUTATION: &str = r#"
mutation InventorySet($input: InventorySetQuantitiesInput!) {
    inventorySetQuantities(input: $input) {
        inventoryAdjustmentGroup {
            createdAt
        }
        userErrors {
            field
            message
        }
    }
}
"#;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InventorySetData {
    inventory_set_quantities: Option<InventorySetPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InventorySetPayload {
    #[serde(default)]
    user_errors: Vec<UserErrorNode>,
}

impl ShopifyClient {
    /// Set the available quantity of one inventory item at one location.
    ///
    /// Absolute set, not a delta: `ignoreCompareQuantity` is on, so this is
    /// last-writer-wins and concurrent external changes between read and
    /// write are neither detected nor prevented.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or returns user errors.
    #[instrument(skip(self))]
    pub async fn set_available_quantity(
        &self,
        inventory_item_id: i64,
        location_id: i64,
        quantity: i64,
    ) -> Result<(), ShopifyError> {
        let variables = serde_json::json!({
            "input": {
                "name": "available",
                "reason": "correction",
                "ignoreCompareQuantity": true,
                "quantities": [{
                    "inventoryItemId": format_gid("InventoryItem", inventory_item_id),
                    "locationId": format_gid("Location", location_id),
                    "quantity": quantity,
                }],
            }
        });

        let response: InventorySetData =
            self.execute(INVENTORY_SET_MUTATION, Some(variables)).await?;

        if let Some(payload) = response.inventory_set_quantities
            && !payload.user_errors.is_empty()
        {
            let error_messages: Vec<String> = payload
                .user_errors
                .iter()
                .map(|e| e.message.clone())
                .collect();
            return Err(ShopifyError::UserError(error_messages.join("; ")));
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_parses_user_errors() {
        let raw = r#"{
            "inventorySetQuantities": {
                "inventoryAdjustmentGroup": null,
                "userErrors": [
                    {"field": ["input", "quantities"], "message": "Invalid quantity"}
                ]
            }
        }"#;

        let data: InventorySetData = serde_json::from_str(raw).unwrap();
        let payload = data.inventory_set_quantities.unwrap();
        assert_eq!(payload.user_errors.len(), 1);
        assert_eq!(
            payload.user_errors.first().unwrap().message,
            "Invalid quantity"
        );
    }
}
