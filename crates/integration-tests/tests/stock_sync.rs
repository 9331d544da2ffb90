//! End-to-end reconciliation passes against both service stubs.
//!
//! Wires the real catalog walk, the batch warehouse lookup, the decision
//! policy, and the executor together and checks what actually lands on
//! the wire for each decision branch.

#![allow(clippy::indexing_slicing)]

use serde_json::json;
use stockbridge_core::shop;
use stockbridge_engine::jobs::stock_sync::{self, StockSyncError, StockSyncPlan};
use stockbridge_integration_tests::{
    STUB_LOCATION_ID, ShopifyStubState, WarehouseStub, inventory_item_id, spawn_shopify_stub,
    spawn_warehouse_stub, stock_page, stock_row, variant_feed_page, variant_node,
};

const PLAN: StockSyncPlan = StockSyncPlan {
    threshold: 2,
    location_id: STUB_LOCATION_ID,
    dry_run: false,
};

/// Catalog of five variants exercising every decision branch.
fn catalog_state() -> ShopifyStubState {
    ShopifyStubState::new(
        "shop-token",
        vec![variant_feed_page(
            &[
                // Stock drifted: warehouse holds 9, Shopify shows 5.
                variant_node(9001, "CN-H-M", &[], 5, Some("true")),
                // Warehouse stock sits at the threshold; target is zero.
                variant_node(9002, "SK-L", &[], 4, Some("true")),
                // No warehouse record at all.
                variant_node(9003, "TS-S", &[], 7, Some("true")),
                // Excluded from sync; never considered.
                variant_node(9004, "HD-XL", &[], 2, Some("false")),
                // Already in agreement with the warehouse.
                variant_node(9005, "BL-M", &[], 3, Some("true")),
            ],
            false,
            None,
        )],
    )
}

async fn warehouse_stub() -> WarehouseStub {
    spawn_warehouse_stub(
        "wh-token",
        vec![stock_page(
            &[
                stock_row(
                    41,
                    "Crewneck / M",
                    9,
                    &[(shop::SKU, "CN-H-M"), (shop::SHOPIFY_VARIANT, "9001")],
                ),
                stock_row(
                    42,
                    "Socks / L",
                    2,
                    &[(shop::SKU, "SK-L"), (shop::SHOPIFY_VARIANT, "9002")],
                ),
                stock_row(
                    45,
                    "Blazer / M",
                    3,
                    &[(shop::SKU, "BL-M"), (shop::SHOPIFY_VARIANT, "9005")],
                ),
            ],
            1,
            1,
            3,
        )],
    )
    .await
}

#[tokio::test]
async fn test_full_pass_reconciles_each_branch() {
    let shopify = spawn_shopify_stub(catalog_state()).await;
    let warehouse = warehouse_stub().await;

    let report = stock_sync::execute(&shopify.client(), &warehouse.client(), PLAN)
        .await
        .expect("pass");

    // The excluded variant never enters the pass.
    assert_eq!(report.considered, 4);
    assert_eq!(report.synced, 2);
    assert_eq!(report.skipped, 2);
    assert_eq!(report.failed, 0);
    assert!(report.catalog_complete);

    assert_eq!(report.missing.len(), 1);
    assert_eq!(report.missing[0].variant_id, 9003);
    assert_eq!(report.missing[0].sku.as_deref(), Some("TS-S"));

    // Two absolute writes: drift corrected to 9, low stock zeroed.
    let calls = shopify.inventory_calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(
        calls[0]["quantities"][0]["inventoryItemId"],
        format!("gid://shopify/InventoryItem/{}", inventory_item_id(9001))
    );
    assert_eq!(calls[0]["quantities"][0]["quantity"], 9);
    assert_eq!(
        calls[1]["quantities"][0]["inventoryItemId"],
        format!("gid://shopify/InventoryItem/{}", inventory_item_id(9002))
    );
    assert_eq!(calls[1]["quantities"][0]["quantity"], 0);

    // Each write got its timestamp metafield.
    let stamps = shopify.metafield_calls();
    assert_eq!(stamps.len(), 2);
    assert_eq!(stamps[0][0]["ownerId"], "gid://shopify/ProductVariant/9001");
    assert_eq!(stamps[1][0]["ownerId"], "gid://shopify/ProductVariant/9002");
}

#[tokio::test]
async fn test_dry_run_decides_but_writes_nothing() {
    let shopify = spawn_shopify_stub(catalog_state()).await;
    let warehouse = warehouse_stub().await;
    let plan = StockSyncPlan {
        dry_run: true,
        ..PLAN
    };

    let report = stock_sync::execute(&shopify.client(), &warehouse.client(), plan)
        .await
        .expect("pass");

    // Same decisions as a live pass, zero mutations.
    assert_eq!(report.synced, 2);
    assert_eq!(report.skipped, 2);
    assert!(shopify.inventory_calls().is_empty());
    assert!(shopify.metafield_calls().is_empty());
}

#[tokio::test]
async fn test_write_failure_is_counted_and_the_pass_continues() {
    let item_gid = format!("gid://shopify/InventoryItem/{}", inventory_item_id(9001));
    let shopify =
        spawn_shopify_stub(catalog_state().with_failing_inventory_item(&item_gid)).await;
    let warehouse = warehouse_stub().await;

    let report = stock_sync::execute(&shopify.client(), &warehouse.client(), PLAN)
        .await
        .expect("pass");

    assert_eq!(report.failed, 1);
    assert_eq!(report.synced, 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].variant_id, 9001);
    assert!(report.failures[0].reason.contains("not stocked"));

    // The second write still went out after the first failed.
    let calls = shopify.inventory_calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1]["quantities"][0]["quantity"], 0);
}

#[tokio::test]
async fn test_warehouse_outage_aborts_the_pass() {
    let shopify = spawn_shopify_stub(catalog_state()).await;
    let warehouse = spawn_warehouse_stub("wh-token", vec![json!({"errors": ["down"]})]).await;

    let result = stock_sync::execute(&shopify.client(), &warehouse.client(), PLAN).await;

    assert!(matches!(result, Err(StockSyncError::Warehouse(_))));
    assert!(shopify.inventory_calls().is_empty());
}
