//! Wire-level tests for the Shopify Admin client.
//!
//! Runs the real client against an in-process GraphQL stub: the cursor
//! walk over the variant feed, the location filter, both mutations the
//! engine issues, and the transport failure paths.

#![allow(clippy::indexing_slicing)]

use axum::Json;
use axum::Router;
use axum::http::StatusCode;
use axum::routing::post;
use secrecy::SecretString;
use serde_json::json;
use stockbridge_core::{InventoryLevelEntry, ShopifyVariantRecord, SyncFlag};
use stockbridge_engine::executor::{ExecutorError, SyncExecutor};
use stockbridge_engine::shopify::{ShopifyClient, ShopifyError, VariantFeedRequest};
use stockbridge_integration_tests::{
    STUB_API_PATH, STUB_LOCATION_ID, ShopifyStubState, inventory_item_id, spawn_server,
    spawn_shopify_stub, variant_feed_page, variant_node,
};

/// A record shaped the way [`variant_node`] serves it, for executor tests
/// that skip the feed.
fn variant(variant_id: i64) -> ShopifyVariantRecord {
    ShopifyVariantRecord {
        variant_id,
        product_id: Some(variant_id + 100_000),
        product_title: format!("Product {variant_id}"),
        product_tags: vec![],
        variant_title: "Default".to_string(),
        sku: None,
        barcode: None,
        inventory_item_id: Some(inventory_item_id(variant_id)),
        total_inventory: 5,
        inventory_levels: vec![InventoryLevelEntry {
            location_id: STUB_LOCATION_ID,
            location_name: "Main".to_string(),
            available: 5,
        }],
        sync_flag: SyncFlag::Included,
        sync_timestamp: None,
    }
}

// =============================================================================
// Variant feed
// =============================================================================

#[tokio::test]
async fn test_feed_walk_follows_cursors_and_scopes_to_active() {
    let state = ShopifyStubState::new(
        "shop-token",
        vec![
            variant_feed_page(
                &[variant_node(9001, "CN-H-M", &["26SS"], 5, Some("true"))],
                true,
                Some("cursor-1"),
            ),
            variant_feed_page(
                &[variant_node(9002, "SK-L", &[], 4, Some("false"))],
                false,
                None,
            ),
        ],
    );
    let stub = spawn_shopify_stub(state).await;

    let scan = stub
        .client()
        .fetch_all_variants(&VariantFeedRequest::default())
        .await
        .expect("scan");

    assert!(scan.complete);
    assert_eq!(scan.pages_fetched, 2);
    assert_eq!(scan.variants.len(), 2);
    assert_eq!(scan.variants[0].variant_id, 9001);
    assert_eq!(scan.variants[0].sku.as_deref(), Some("CN-H-M"));
    assert_eq!(scan.variants[0].sync_flag, SyncFlag::Included);
    assert_eq!(scan.variants[1].sync_flag, SyncFlag::Excluded);

    // First call carries the active-status scope, second the page cursor.
    let queries = stub.variant_queries();
    assert_eq!(queries.len(), 2);
    assert_eq!(queries[0]["query"], "status:active");
    assert!(queries[0]["after"].is_null());
    assert_eq!(queries[1]["after"], "cursor-1");
}

#[tokio::test]
async fn test_location_filter_drops_unstocked_variants() {
    let page = variant_feed_page(
        &[
            variant_node(9001, "CN-H-M", &[], 5, None),
            variant_node(9002, "SK-L", &[], 4, None),
        ],
        false,
        None,
    );
    let stub = spawn_shopify_stub(ShopifyStubState::new("shop-token", vec![page])).await;
    let client = stub.client();

    let stocked_here = VariantFeedRequest {
        location_id: Some(STUB_LOCATION_ID),
        ..Default::default()
    };
    let scan = client.fetch_all_variants(&stocked_here).await.expect("scan");
    assert_eq!(scan.variants.len(), 2);
    assert_eq!(
        scan.variants[0].stock_for_location(Some(STUB_LOCATION_ID)),
        5
    );

    // Nothing is stocked at location 999, so the feed comes back empty.
    let elsewhere = VariantFeedRequest {
        location_id: Some(999),
        ..Default::default()
    };
    let scan = client.fetch_all_variants(&elsewhere).await.expect("scan");
    assert!(scan.variants.is_empty());
}

#[tokio::test]
async fn test_feed_walk_keeps_partial_scan_when_a_page_fails() {
    // Page one points at a cursor the stub has no page for; that fetch
    // comes back as a GraphQL error envelope.
    let state = ShopifyStubState::new(
        "shop-token",
        vec![variant_feed_page(
            &[variant_node(9001, "CN-H-M", &[], 2, None)],
            true,
            Some("cursor-9"),
        )],
    );
    let stub = spawn_shopify_stub(state).await;

    let scan = stub
        .client()
        .fetch_all_variants(&VariantFeedRequest::default())
        .await
        .expect("scan");

    assert!(!scan.complete);
    assert_eq!(scan.variants.len(), 1);
    assert_eq!(scan.pages_fetched, 1);
}

// =============================================================================
// Executor mutations
// =============================================================================

#[tokio::test]
async fn test_apply_target_sets_absolute_quantity_then_timestamp() {
    let stub = spawn_shopify_stub(ShopifyStubState::new("shop-token", vec![])).await;
    let executor = SyncExecutor::new(stub.client(), STUB_LOCATION_ID);

    executor.apply_target(&variant(9001), 9).await.expect("apply");

    let inventory = stub.inventory_calls();
    assert_eq!(inventory.len(), 1);
    let input = &inventory[0];
    assert_eq!(input["name"], "available");
    assert_eq!(input["reason"], "correction");
    assert_eq!(input["ignoreCompareQuantity"], true);
    let quantity = &input["quantities"][0];
    assert_eq!(
        quantity["inventoryItemId"],
        format!("gid://shopify/InventoryItem/{}", inventory_item_id(9001))
    );
    assert_eq!(
        quantity["locationId"],
        format!("gid://shopify/Location/{STUB_LOCATION_ID}")
    );
    assert_eq!(quantity["quantity"], 9);

    // The push time lands in the timestamp metafield afterwards.
    let metafields = stub.metafield_calls();
    assert_eq!(metafields.len(), 1);
    let field = &metafields[0][0];
    assert_eq!(field["ownerId"], "gid://shopify/ProductVariant/9001");
    assert_eq!(field["namespace"], "custom");
    assert_eq!(field["key"], "pim_kr_sync_timestamp");
    assert!(field["value"].as_str().expect("value").contains('T'));
}

#[tokio::test]
async fn test_timestamp_failure_does_not_undo_the_stock_write() {
    let state = ShopifyStubState::new("shop-token", vec![])
        .with_failing_owner("gid://shopify/ProductVariant/9001");
    let stub = spawn_shopify_stub(state).await;
    let executor = SyncExecutor::new(stub.client(), STUB_LOCATION_ID);

    // The stock write is durable; the failed timestamp only warns.
    executor.apply_target(&variant(9001), 3).await.expect("apply");

    assert_eq!(stub.inventory_calls().len(), 1);
    assert_eq!(stub.metafield_calls().len(), 1);
}

#[tokio::test]
async fn test_inventory_user_error_fails_the_item() {
    let item_gid = format!("gid://shopify/InventoryItem/{}", inventory_item_id(9001));
    let state =
        ShopifyStubState::new("shop-token", vec![]).with_failing_inventory_item(&item_gid);
    let stub = spawn_shopify_stub(state).await;
    let executor = SyncExecutor::new(stub.client(), STUB_LOCATION_ID);

    let result = executor.apply_target(&variant(9001), 3).await;

    match result {
        Err(ExecutorError::Shopify(ShopifyError::UserError(message))) => {
            assert!(message.contains("not stocked"));
        }
        other => panic!("expected user error, got {other:?}"),
    }
    // No timestamp write after a failed stock write.
    assert!(stub.metafield_calls().is_empty());
}

#[tokio::test]
async fn test_sync_flag_writes_include_and_clear() {
    let stub = spawn_shopify_stub(ShopifyStubState::new("shop-token", vec![])).await;
    let client = stub.client();
    let gid = "gid://shopify/ProductVariant/9001";

    client
        .write_sync_flag(gid, SyncFlag::Included)
        .await
        .expect("write");
    client
        .write_sync_flag(gid, SyncFlag::Unset)
        .await
        .expect("clear");

    let calls = stub.metafield_calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0][0]["key"], "pim_sync");
    assert_eq!(calls[0][0]["value"], "true");
    // Unset clears by writing an empty value.
    assert_eq!(calls[1][0]["value"], "");
}

// =============================================================================
// Transport failures
// =============================================================================

#[tokio::test]
async fn test_rejected_token_is_unauthorized() {
    let stub = spawn_shopify_stub(ShopifyStubState::new("right-token", vec![])).await;
    let client = ShopifyClient::new(
        stub.endpoint.clone(),
        SecretString::from("wrong-token".to_string()),
    );

    let result = client.fetch_variants(&VariantFeedRequest::default()).await;

    assert!(matches!(result, Err(ShopifyError::Unauthorized(_))));
}

#[tokio::test]
async fn test_rate_limit_carries_retry_after() {
    let router = Router::new().route(
        STUB_API_PATH,
        post(|| async {
            (
                StatusCode::TOO_MANY_REQUESTS,
                [("Retry-After", "7")],
                Json(json!({"errors": "throttled"})),
            )
        }),
    );
    let addr = spawn_server(router).await;
    let client = ShopifyClient::new(
        format!("http://{addr}{STUB_API_PATH}"),
        SecretString::from("shop-token".to_string()),
    );

    let result = client.fetch_variants(&VariantFeedRequest::default()).await;

    assert!(matches!(result, Err(ShopifyError::RateLimited(7))));
}
