//! Variant feed queries against the Admin API.

use std::future::Future;

use tracing::instrument;

use super::types::{VariantFeedRequest, VariantPage, VariantScan, VariantsData};
use super::{ShopifyClient, ShopifyError};

/// Hard stop for full feed walks.
const MAX_SCAN_PAGES: u32 = 1_000;
/// Progress log cadence during full feed walks.
const PROGRESS_EVERY: u32 = 100;

/// Inventory, per-location availability, and both sync metafields ride in
/// one query so a page never costs extra round-trips.
const VARIANT_FEED_QUERY: &str = r#"
query VariantFeed($first: Int!, $after: String, $query: String, $sortKey: ProductVariantSortKeys, $reverse: Boolean) {
    productVariants(first: $first, after: $after, query: $query, sortKey: $sortKey, reverse: $reverse) {
        pageInfo {
            hasNextPage
            endCursor
        }
        nodes {
            id
            title
            sku
            barcode
            inventoryQuantity
            product {
                id
                title
                tags
            }
            inventoryItem {
                id
                inventoryLevels(first: 10) {
                    nodes {
                        location {
                            id
                            name
                        }
                        quantities(names: ["available"]) {
                            name
                            quantity
                        }
                    }
                }
            }
            pimSync: metafield(namespace: "custom", key: "pim_sync") {
                value
            }
            pimSyncTimestamp: metafield(namespace: "custom", key: "pim_kr_sync_timestamp") {
                value
            }
        }
    }
}
"#;

impl ShopifyClient {
    /// Fetch one backend page of active product variants.
    ///
    /// Variants whose global ID does not parse, or that carry no level at
    /// the requested location, are dropped from the page.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or returns GraphQL errors.
    #[instrument(
        skip(self, request),
        fields(page_size = request.page_size, location = ?request.location_id)
    )]
    pub async fn fetch_variants(
        &self,
        request: &VariantFeedRequest,
    ) -> Result<VariantPage, ShopifyError> {
        let variables = serde_json::json!({
            "first": request.page_size,
            "after": request.cursor,
            "query": request.effective_query(),
            "sortKey": request.sort_key,
            "reverse": request.sort_reverse,
        });

        let data: VariantsData = self.execute(VARIANT_FEED_QUERY, Some(variables)).await?;
        let connection = data.product_variants;
        let fetched = connection.nodes.len();

        let variants: Vec<_> = connection
            .nodes
            .into_iter()
            .filter_map(|node| node.into_record(request.location_id))
            .collect();

        let dropped = fetched - variants.len();
        if dropped > 0 {
            tracing::debug!(
                dropped,
                location = ?request.location_id,
                "dropped variants without a usable record"
            );
        }

        Ok(VariantPage {
            variants,
            has_next_page: connection.page_info.has_next_page,
            end_cursor: connection.page_info.end_cursor,
        })
    }

    /// Walk the whole variant feed.
    ///
    /// Follows cursors until Shopify reports no next page, never past
    /// [`MAX_SCAN_PAGES`]. A failure on the first page aborts; a failure
    /// later in the walk logs, stops the walk, and returns what was
    /// accumulated with `complete = false` so the caller can decide whether
    /// a partial catalog is still worth processing.
    ///
    /// # Errors
    ///
    /// Returns the first page's error if page one cannot be fetched.
    pub async fn fetch_all_variants(
        &self,
        request: &VariantFeedRequest,
    ) -> Result<VariantScan, ShopifyError> {
        walk_feed(request.cursor.clone(), |cursor| {
            let page_request = VariantFeedRequest {
                cursor,
                ..request.clone()
            };
            async move { self.fetch_variants(&page_request).await }
        })
        .await
    }
}

/// Cursor-walk loop shared by [`ShopifyClient::fetch_all_variants`].
///
/// Generic over the page fetcher so the termination rules are testable
/// without a live store.
async fn walk_feed<F, Fut>(
    start_cursor: Option<String>,
    mut fetch: F,
) -> Result<VariantScan, ShopifyError>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<VariantPage, ShopifyError>>,
{
    let mut scan = VariantScan::default();
    let mut cursor = start_cursor;

    while scan.pages_fetched < MAX_SCAN_PAGES {
        let page = match fetch(cursor.clone()).await {
            Ok(page) => page,
            Err(error) if scan.pages_fetched == 0 => return Err(error),
            Err(error) => {
                tracing::warn!(
                    pages_fetched = scan.pages_fetched,
                    %error,
                    "variant scan page failed, continuing with what was fetched"
                );
                return Ok(scan);
            }
        };

        scan.pages_fetched += 1;
        scan.variants.extend(page.variants);

        if scan.pages_fetched % PROGRESS_EVERY == 0 {
            tracing::info!(
                pages = scan.pages_fetched,
                variants = scan.variants.len(),
                "variant scan progress"
            );
        }

        if !page.has_next_page {
            scan.complete = true;
            return Ok(scan);
        }

        cursor = page.end_cursor;
        if cursor.is_none() {
            // Without a fresh cursor another fetch would spin on the same
            // page forever.
            tracing::warn!("next page reported but no cursor returned, stopping");
            return Ok(scan);
        }
    }

    tracing::warn!(cap = MAX_SCAN_PAGES, "variant scan hit the page cap, stopping early");
    Ok(scan)
}
