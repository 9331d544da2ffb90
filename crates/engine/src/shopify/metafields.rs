//! Metafield writes against the Admin API.
//!
//! The engine writes exactly two metafields, both in the `custom`
//! namespace: the sync inclusion flag and the last-push timestamp.

use serde::Deserialize;
use stockbridge_core::SyncFlag;
use tracing::instrument;

use super::types::UserErrorNode;
use super::{ShopifyClient, ShopifyError};

/// Namespace holding both sync metafields.
pub const METAFIELD_NAMESPACE: &str = "custom";
/// Tri-state sync inclusion flag.
pub const SYNC_FLAG_KEY: &str = "pim_sync";
/// ISO-8601 time of the last successful stock push.
pub const SYNC_TIMESTAMP_KEY: &str = "pim_kr_sync_timestamp";

const METAFIELD_TYPE: &str = "single_line_text_field";

const METAFIELDS_SET_MUTATION: &str = r#"
mutation MetafieldsSet($metafields: [MetafieldsSetInput!]!) {
    metafieldsSet(metafields: $metafields) {
        metafields {
            key
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
struct MetafieldsSetData {
    metafields_set: Option<MetafieldsSetPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetafieldsSetPayload {
    #[serde(default)]
    user_errors: Vec<UserErrorNode>,
}

impl ShopifyClient {
    /// Write one `custom`-namespace text metafield on an owner resource.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or returns user errors.
    #[instrument(skip(self, value), fields(owner = %owner_gid, key = %key))]
    pub async fn write_metafield(
        &self,
        owner_gid: &str,
        key: &str,
        value: &str,
    ) -> Result<(), ShopifyError> {
        let variables = serde_json::json!({
            "metafields": [{
                "ownerId": owner_gid,
                "namespace": METAFIELD_NAMESPACE,
                "key": key,
                "value": value,
                "type": METAFIELD_TYPE,
            }]
        });

        let response: MetafieldsSetData =
            self.execute(METAFIELDS_SET_MUTATION, Some(variables)).await?;

        if let Some(payload) = response.metafields_set
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

    /// Write the sync inclusion flag on a variant.
    ///
    /// [`SyncFlag::Unset`] writes an empty string, clearing the flag.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or returns user errors.
    pub async fn write_sync_flag(
        &self,
        variant_gid: &str,
        flag: SyncFlag,
    ) -> Result<(), ShopifyError> {
        self.write_metafield(variant_gid, SYNC_FLAG_KEY, flag.as_metafield())
            .await
    }

    /// Record the last successful stock push time on a variant.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or returns user errors.
    pub async fn write_sync_timestamp(
        &self,
        variant_gid: &str,
        timestamp: &str,
    ) -> Result<(), ShopifyError> {
        self.write_metafield(variant_gid, SYNC_TIMESTAMP_KEY, timestamp)
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_parses_user_errors() {
        let raw = r#"{
            "metafieldsSet": {
                "metafields": [],
                "userErrors": [
                    {"field": ["metafields", "0", "value"], "message": "Value is invalid"}
                ]
            }
        }"#;

        let data: MetafieldsSetData = serde_json::from_str(raw).unwrap();
        let payload = data.metafields_set.unwrap();
        assert_eq!(
            payload.user_errors.first().unwrap().message,
            "Value is invalid"
        );
    }

    #[test]
    fn test_clean_payload_has_no_user_errors() {
        let raw = r#"{"metafieldsSet": {"metafields": [{"key": "pim_sync"}], "userErrors": []}}"#;
        let data: MetafieldsSetData = serde_json::from_str(raw).unwrap();
        assert!(data.metafields_set.unwrap().user_errors.is_empty());
    }
}
