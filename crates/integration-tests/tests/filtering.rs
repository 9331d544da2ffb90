//! Exact client-side filtering over the fuzzy backend search.
//!
//! The stub plays the part of Shopify's tag search, which happily returns
//! prefix matches; these tests check that the fill loop re-filters the
//! candidates and still assembles stable logical pages.

#![allow(clippy::indexing_slicing)]

use stockbridge_core::SyncFlag;
use stockbridge_engine::filtering::{self, VariantFilter};
use stockbridge_integration_tests::{
    ShopifyStubState, spawn_shopify_stub, variant_feed_page, variant_node,
};

#[tokio::test]
async fn test_exact_tag_page_refilters_backend_candidates() {
    // The backend would return 26SSX for tag:26SS; the client must not.
    let state = ShopifyStubState::new(
        "shop-token",
        vec![
            variant_feed_page(
                &[
                    variant_node(1, "A-1", &["26SS"], 2, None),
                    variant_node(2, "A-2", &["26SSX"], 2, None),
                    variant_node(3, "A-3", &["Summer"], 2, None),
                ],
                true,
                Some("cursor-1"),
            ),
            variant_feed_page(
                &[
                    variant_node(4, "B-1", &["26ss"], 2, None),
                    variant_node(5, "B-2", &["26SS"], 2, None),
                ],
                true,
                Some("cursor-2"),
            ),
        ],
    );
    let stub = spawn_shopify_stub(state).await;

    let filter = VariantFilter {
        exact_tag: Some("26SS".to_string()),
        ..Default::default()
    };
    let page = filtering::fetch_filtered_page(&stub.client(), &filter, 2, None)
        .await
        .expect("page");

    // Two true matches assembled from two backend batches, the 26SSX
    // false positive dropped, the case-insensitive 26ss kept.
    let ids: Vec<i64> = page.variants.iter().map(|v| v.variant_id).collect();
    assert_eq!(ids, vec![1, 4]);
    assert_eq!(page.attempts, 2);
    assert!(page.has_next_page);
    assert_eq!(page.end_cursor.as_deref(), Some("cursor-2"));

    // The tag went to the backend as a narrowing term.
    let queries = stub.variant_queries();
    assert_eq!(queries[0]["query"], "tag:26SS status:active");
}

#[tokio::test]
async fn test_sync_status_filter_is_exact_over_the_wire() {
    let state = ShopifyStubState::new(
        "shop-token",
        vec![variant_feed_page(
            &[
                variant_node(1, "A-1", &[], 2, Some("true")),
                variant_node(2, "A-2", &[], 2, Some("false")),
                variant_node(3, "A-3", &[], 2, None),
            ],
            false,
            None,
        )],
    );
    let stub = spawn_shopify_stub(state).await;

    let filter = VariantFilter {
        sync_status: Some(SyncFlag::Included),
        ..Default::default()
    };
    let page = filtering::fetch_filtered_page(&stub.client(), &filter, 10, None)
        .await
        .expect("page");

    assert_eq!(page.variants.len(), 1);
    assert_eq!(page.variants[0].variant_id, 1);
    // The feed ended, so no further page is claimed.
    assert!(!page.has_next_page);
    assert_eq!(page.attempts, 1);
}

#[tokio::test]
async fn test_search_and_tag_terms_combine_in_the_backend_query() {
    let state = ShopifyStubState::new(
        "shop-token",
        vec![variant_feed_page(&[], false, None)],
    );
    let stub = spawn_shopify_stub(state).await;

    let filter = VariantFilter {
        search: Some("shirt".to_string()),
        exact_tag: Some("26SS".to_string()),
        ..Default::default()
    };
    let page = filtering::fetch_filtered_page(&stub.client(), &filter, 5, None)
        .await
        .expect("page");

    assert!(page.variants.is_empty());
    let queries = stub.variant_queries();
    assert_eq!(queries[0]["query"], "shirt tag:26SS status:active");
}
