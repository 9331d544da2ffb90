//! Client-side variant filtering and stable page assembly.
//!
//! Shopify's search is fuzzy where the engine needs exactness: tag search
//! matches prefixes and substrings, and the sync flag is not queryable at
//! all. The feed is therefore over-fetched page by page and re-filtered
//! here until a full page of true matches is assembled.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;

use sha2::{Digest, Sha256};
use stockbridge_core::{ShopifyVariantRecord, SyncFlag};

use crate::shopify::types::{VariantFeedRequest, VariantPage};
use crate::shopify::{ShopifyClient, ShopifyError};

/// Attempt budget for a fill loop without a tag filter. A logical page
/// normally resolves in one or two backend calls.
const DEFAULT_MAX_ATTEMPTS: u32 = 10;
/// Attempt budget with an exact tag filter. Backend tag search over-returns
/// heavily, so far more backend pages may be needed per logical page.
const TAG_FILTER_MAX_ATTEMPTS: u32 = 50;

/// Filters a logical page of variants must satisfy.
///
/// The backend applies `search` (and a tag term, fuzzily); `sync_status`
/// and `exact_tag` are re-checked here because Shopify cannot evaluate
/// them exactly.
#[derive(Debug, Clone, Default)]
pub struct VariantFilter {
    /// Caller search terms, passed through to the backend.
    pub search: Option<String>,
    /// Keep only variants whose sync flag matches exactly.
    pub sync_status: Option<SyncFlag>,
    /// Keep only variants carrying exactly this tag, case-insensitively.
    pub exact_tag: Option<String>,
    /// Keep only variants stocked at this location.
    pub location_id: Option<i64>,
    /// Shopify sort key name.
    pub sort_key: Option<String>,
    /// Reverse the sort order.
    pub sort_reverse: bool,
}

impl VariantFilter {
    /// True when every active client-side filter accepts the variant.
    ///
    /// Sync-status is checked first, then the exact tag.
    #[must_use]
    pub fn accepts(&self, variant: &ShopifyVariantRecord) -> bool {
        if let Some(wanted) = self.sync_status
            && variant.sync_flag != wanted
        {
            return false;
        }

        if let Some(tag) = self.normalized_tag()
            && !variant.has_tag(tag)
        {
            return false;
        }

        true
    }

    /// Attempt budget for the fill loop under this filter.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        if self.normalized_tag().is_some() {
            TAG_FILTER_MAX_ATTEMPTS
        } else {
            DEFAULT_MAX_ATTEMPTS
        }
    }

    /// Backend request carrying the parts of this filter Shopify can apply.
    ///
    /// The exact tag rides along as a backend `tag:` term to narrow the
    /// candidate stream, knowing the backend match is only approximate.
    #[must_use]
    pub fn feed_request(&self, page_size: u32, cursor: Option<String>) -> VariantFeedRequest {
        let mut terms: Vec<String> = Vec::new();
        if let Some(search) = self.search.as_deref().map(str::trim)
            && !search.is_empty()
        {
            terms.push(search.to_string());
        }
        if let Some(tag) = self.normalized_tag() {
            terms.push(format!("tag:{tag}"));
        }

        VariantFeedRequest {
            page_size,
            cursor,
            sort_key: self.sort_key.clone(),
            sort_reverse: self.sort_reverse,
            search: (!terms.is_empty()).then(|| terms.join(" ")),
            location_id: self.location_id,
        }
    }

    /// Stable digest over every field that shapes the result sequence.
    ///
    /// Keys the cursor cache: two filters with the same fingerprint walk
    /// the same page sequence. The tag is folded to lowercase so that
    /// equivalent case-insensitive filters share cached cursors.
    #[must_use]
    pub fn fingerprint(&self, page_size: u32) -> String {
        let canonical = format!(
            "search={}\nstatus={}\ntag={}\nlocation={}\nsort={}\nreverse={}\npage_size={}",
            self.search.as_deref().map(str::trim).unwrap_or_default(),
            self.sync_status.map(|f| f.to_string()).unwrap_or_default(),
            self.normalized_tag().map(str::to_lowercase).unwrap_or_default(),
            self.location_id.unwrap_or_default(),
            self.sort_key.as_deref().unwrap_or_default(),
            self.sort_reverse,
            page_size,
        );
        hex::encode(Sha256::digest(canonical.as_bytes()))
    }

    fn normalized_tag(&self) -> Option<&str> {
        self.exact_tag
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

/// One assembled logical page.
#[derive(Debug, Clone)]
pub struct FilteredPage {
    /// At most the desired count of variants, all passing every filter.
    pub variants: Vec<ShopifyVariantRecord>,
    /// Cursor at the end of the last backend batch consumed. Feeding it
    /// back fetches the next logical page.
    pub end_cursor: Option<String>,
    /// Whether another full logical page is believed to exist.
    pub has_next_page: bool,
    /// Backend calls spent assembling this page.
    pub attempts: u32,
}

/// Assemble one logical page of variants passing `filter`.
///
/// # Errors
///
/// Returns an error if any backend fetch fails; partial fills are not
/// returned.
pub async fn fetch_filtered_page(
    client: &ShopifyClient,
    filter: &VariantFilter,
    desired_count: u32,
    cursor: Option<String>,
) -> Result<FilteredPage, ShopifyError> {
    fill_page(filter, desired_count, cursor, |request| async move {
        client.fetch_variants(&request).await
    })
    .await
}

/// Fill loop behind [`fetch_filtered_page`], generic over the page fetcher
/// so the budget and cut-off rules are testable without a live store.
async fn fill_page<F, Fut>(
    filter: &VariantFilter,
    desired_count: u32,
    start_cursor: Option<String>,
    mut fetch: F,
) -> Result<FilteredPage, ShopifyError>
where
    F: FnMut(VariantFeedRequest) -> Fut,
    Fut: Future<Output = Result<VariantPage, ShopifyError>>,
{
    let desired = desired_count as usize;
    let max_attempts = filter.max_attempts();

    let mut filtered: Vec<ShopifyVariantRecord> = Vec::new();
    let mut cursor = start_cursor;
    let mut has_more = true;
    let mut attempts = 0u32;

    while filtered.len() < desired && has_more && attempts < max_attempts {
        attempts += 1;

        let page = fetch(filter.feed_request(desired_count, cursor.clone())).await?;

        for variant in page.variants {
            if filter.accepts(&variant) {
                filtered.push(variant);
                if filtered.len() >= desired {
                    break;
                }
            }
        }

        has_more = page.has_next_page;
        match page.end_cursor {
            Some(next) => cursor = Some(next),
            None if has_more => {
                // Without a fresh cursor the next fetch would replay the
                // same batch until the attempt budget ran out.
                tracing::warn!("next page reported but no cursor returned, stopping fill");
                has_more = false;
            }
            None => {}
        }
    }

    let has_next_page = has_more && filtered.len() >= desired;
    filtered.truncate(desired);

    Ok(FilteredPage {
        variants: filtered,
        end_cursor: cursor,
        has_next_page,
        attempts,
    })
}

/// Session-scoped cursor cache for page jumps.
///
/// Pagination cursors are only discoverable by walking forward, so each
/// page's start cursor is recorded under the filter fingerprint the first
/// time it is reached. Revisiting page N afterwards is a direct fetch
/// instead of a re-walk of pages 1..N-1.
#[derive(Debug, Default)]
pub struct CursorCache {
    by_fingerprint: HashMap<String, BTreeMap<u32, String>>,
}

impl CursorCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cursor that starts the given page, if recorded.
    #[must_use]
    pub fn get(&self, fingerprint: &str, page: u32) -> Option<&str> {
        self.by_fingerprint
            .get(fingerprint)?
            .get(&page)
            .map(String::as_str)
    }

    /// Record the cursor that starts the given page.
    pub fn insert(&mut self, fingerprint: &str, page: u32, cursor: String) {
        self.by_fingerprint
            .entry(fingerprint.to_string())
            .or_default()
            .insert(page, cursor);
    }

    /// Highest recorded page at or below `page`, with its start cursor.
    ///
    /// A forward walk towards `page` starts here rather than at page one.
    #[must_use]
    pub fn nearest_at_or_below(&self, fingerprint: &str, page: u32) -> Option<(u32, &str)> {
        self.by_fingerprint
            .get(fingerprint)?
            .range(..=page)
            .next_back()
            .map(|(p, c)| (*p, c.as_str()))
    }
}
