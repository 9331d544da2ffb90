//! Stock listing client: paginated fetch, full-table scans, SKU lookups.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;

use secrecy::ExposeSecret;
use stockbridge_core::WarehouseStockRecord;
use tracing::instrument;

use super::types::StockListResponse;
use super::{WarehouseCredentials, WarehouseError};

/// Rows per page. The service caps at 100.
const PER_PAGE: u32 = 100;
/// Hard stop for full scans even when pagination metadata lies.
const MAX_PAGES: u32 = 1_100;
/// Progress log cadence during full scans.
const PROGRESS_EVERY: u32 = 100;

/// Sellmate stock listing client.
///
/// All lookups are full-table scans; the service has no per-SKU endpoint.
#[derive(Clone)]
pub struct WarehouseClient {
    inner: Arc<WarehouseClientInner>,
}

struct WarehouseClientInner {
    client: reqwest::Client,
    credentials: WarehouseCredentials,
}

/// One page of the stock table.
#[derive(Debug)]
pub struct WarehousePage {
    /// Usable records on this page. Malformed rows are dropped with a log.
    pub records: Vec<WarehouseStockRecord>,
    /// Page number the service says this is.
    pub current_page: u32,
    /// Total pages the service reports.
    pub total_pages: u32,
    /// Total records the service reports.
    pub total_count: i64,
}

/// Result of a full-table scan.
///
/// A failed first page aborts the scan; failures on later pages are
/// recorded here and skipped, so `records` may undercount
/// `total_reported`.
#[derive(Debug, Default)]
pub struct WarehouseScan {
    /// All records fetched, in page order.
    pub records: Vec<WarehouseStockRecord>,
    /// Pages that failed and were skipped.
    pub failed_pages: Vec<u32>,
    /// Record count the service reported on page one.
    pub total_reported: i64,
}

impl WarehouseClient {
    /// Create a new warehouse client.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created. This should never happen
    /// under normal circumstances as we use standard TLS configuration.
    #[must_use]
    pub fn new(credentials: WarehouseCredentials) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            inner: Arc::new(WarehouseClientInner {
                client,
                credentials,
            }),
        }
    }

    /// Fetch one page of the stock table.
    ///
    /// # Errors
    ///
    /// Returns `WarehouseError::RateLimited` if we're being rate limited.
    /// Returns `WarehouseError::Unauthorized` if the token is rejected.
    /// Returns `WarehouseError::Api` if the service answers with errors.
    /// Returns `WarehouseError::Http` on network failures.
    #[instrument(skip(self), fields(page = page))]
    pub async fn fetch_page(&self, page: u32) -> Result<WarehousePage, WarehouseError> {
        // The service requires its filter arrays in the request body even
        // on GET; c pulls in the shop-code relation the sync needs.
        let body = serde_json::json!({
            "f": [],
            "ap": [],
            "c": ["optionHasCodeByShop"],
        });

        let response = self
            .inner
            .client
            .get(&self.inner.credentials.api_url)
            .query(&[("page", page), ("per_page", PER_PAGE)])
            .header(
                "Authorization",
                format!(
                    "Bearer {}",
                    self.inner.credentials.api_token.expose_secret()
                ),
            )
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        // Check for rate limiting
        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            return Err(WarehouseError::RateLimited(retry_after));
        }

        // Check for unauthorized
        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(WarehouseError::Unauthorized(
                "bearer token rejected".to_string(),
            ));
        }

        let body_text = response.text().await?;
        let listing: StockListResponse = serde_json::from_str(&body_text)?;

        if !listing.errors.is_empty() {
            return Err(WarehouseError::Api(format_api_errors(&listing.errors)));
        }

        let meta = listing.meta.ok_or_else(|| {
            WarehouseError::Api("response has no pagination metadata".to_string())
        })?;

        let mut records = Vec::with_capacity(listing.data.len());
        for row in listing.data {
            match row.into_record() {
                Ok(record) => records.push(record),
                Err(error) => tracing::warn!(%error, "dropping malformed warehouse row"),
            }
        }

        Ok(WarehousePage {
            records,
            current_page: meta.current_page,
            total_pages: meta.last_page,
            total_count: meta.total,
        })
    }

    /// Scan the whole stock table.
    ///
    /// Walks pages from 1 to the reported last page, never past
    /// [`MAX_PAGES`]. A failure on the first page means the service is
    /// unreachable or the token is bad and aborts the scan; failures on
    /// later pages are logged, recorded, and skipped.
    ///
    /// # Errors
    ///
    /// Returns the first page's error if page one cannot be fetched.
    pub async fn fetch_all(&self) -> Result<WarehouseScan, WarehouseError> {
        scan_pages(|page| self.fetch_page(page)).await
    }

    /// Find the warehouse record carrying the given SKU.
    ///
    /// The SKU lives in the shop-code table, so this is a full scan plus a
    /// linear search. Absence is `None`, not an error. When the table holds
    /// several records with the same SKU the last one wins.
    ///
    /// # Errors
    ///
    /// Returns an error if the scan itself fails.
    #[instrument(skip(self), fields(sku = %sku))]
    pub async fn lookup_by_sku(
        &self,
        sku: &str,
    ) -> Result<Option<WarehouseStockRecord>, WarehouseError> {
        let needle = sku.trim();
        let scan = self.fetch_all().await?;

        Ok(scan
            .records
            .into_iter()
            .rev()
            .find(|record| record.sku_code() == Some(needle)))
    }

    /// Resolve many SKUs in one scan.
    ///
    /// Returns a map holding an entry for every requested SKU that was
    /// found; missing SKUs simply have no entry. Duplicate records for one
    /// SKU resolve to the last one scanned.
    ///
    /// # Errors
    ///
    /// Returns an error if the scan itself fails.
    #[instrument(skip(self, skus), fields(requested = skus.len()))]
    pub async fn lookup_by_sku_batch(
        &self,
        skus: &[String],
    ) -> Result<HashMap<String, WarehouseStockRecord>, WarehouseError> {
        let requested: HashSet<&str> = skus.iter().map(|s| s.trim()).collect();
        let scan = self.fetch_all().await?;

        let mut found = HashMap::new();
        for record in scan.records {
            let Some(code) = record.sku_code().map(ToString::to_string) else {
                continue;
            };
            if requested.contains(code.as_str()) {
                found.insert(code, record);
            }
        }

        Ok(found)
    }
}

/// Page-walk loop shared by [`WarehouseClient::fetch_all`].
///
/// Generic over the page fetcher so the termination and skip rules are
/// testable without a live service.
async fn scan_pages<F, Fut>(mut fetch_page: F) -> Result<WarehouseScan, WarehouseError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<WarehousePage, WarehouseError>>,
{
    let first = fetch_page(1).await?;

    if first.total_pages > MAX_PAGES {
        tracing::warn!(
            reported = first.total_pages,
            cap = MAX_PAGES,
            "warehouse reports more pages than the scan cap, truncating"
        );
    }
    let total_pages = first.total_pages.min(MAX_PAGES);

    let mut scan = WarehouseScan {
        records: first.records,
        failed_pages: Vec::new(),
        total_reported: first.total_count,
    };

    let mut page = 2;
    while page <= total_pages {
        match fetch_page(page).await {
            Ok(fetched) => scan.records.extend(fetched.records),
            Err(error) => {
                tracing::warn!(page, %error, "skipping failed warehouse page");
                scan.failed_pages.push(page);
            }
        }

        if page % PROGRESS_EVERY == 0 {
            tracing::info!(
                page,
                total_pages,
                fetched = scan.records.len(),
                "warehouse scan progress"
            );
        }

        page += 1;
    }

    Ok(scan)
}

fn format_api_errors(errors: &[serde_json::Value]) -> String {
    errors
        .iter()
        .map(|e| match e {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    fn record(id: i64) -> WarehouseStockRecord {
        WarehouseStockRecord::new(Some(id), None, 1, None, None, None, vec![]).unwrap()
    }

    fn page(current: u32, total: u32) -> WarehousePage {
        WarehousePage {
            records: vec![record(i64::from(current))],
            current_page: current,
            total_pages: total,
            total_count: i64::from(total),
        }
    }

    #[tokio::test]
    async fn test_scan_walks_every_reported_page() {
        let scan = scan_pages(|n| async move { Ok(page(n, 3)) }).await.unwrap();

        assert_eq!(scan.records.len(), 3);
        assert!(scan.failed_pages.is_empty());
        assert_eq!(scan.total_reported, 3);
    }

    #[tokio::test]
    async fn test_scan_stops_at_page_cap() {
        let calls = RefCell::new(0u32);
        let scan = scan_pages(|n| {
            *calls.borrow_mut() += 1;
            async move { Ok(page(n, 1_000_000)) }
        })
        .await
        .unwrap();

        assert_eq!(*calls.borrow(), MAX_PAGES);
        assert_eq!(scan.records.len(), MAX_PAGES as usize);
    }

    #[tokio::test]
    async fn test_first_page_failure_aborts_scan() {
        let result = scan_pages(|_| async {
            Err(WarehouseError::Unauthorized("bearer token rejected".into()))
        })
        .await;

        assert!(matches!(result, Err(WarehouseError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_later_page_failure_is_skipped() {
        let scan = scan_pages(|n| async move {
            if n == 2 {
                Err(WarehouseError::Api("flaky page".to_string()))
            } else {
                Ok(page(n, 3))
            }
        })
        .await
        .unwrap();

        assert_eq!(scan.failed_pages, vec![2]);
        assert_eq!(scan.records.len(), 2);
    }

    #[tokio::test]
    async fn test_single_page_table_stops_after_page_one() {
        let calls = RefCell::new(0u32);
        let scan = scan_pages(|n| {
            *calls.borrow_mut() += 1;
            async move { Ok(page(n, 1)) }
        })
        .await
        .unwrap();

        assert_eq!(*calls.borrow(), 1);
        assert_eq!(scan.records.len(), 1);
    }

    #[test]
    fn test_format_api_errors_mixes_shapes() {
        let errors = vec![
            serde_json::Value::String("token expired".to_string()),
            serde_json::json!({"code": 500}),
        ];
        assert_eq!(format_api_errors(&errors), "token expired; {\"code\":500}");
    }

    #[test]
    fn test_client_is_clone_send_sync() {
        fn assert_clone<T: Clone>() {}
        fn assert_send_sync<T: Send + Sync>() {}
        assert_clone::<WarehouseClient>();
        assert_send_sync::<WarehouseClient>();
    }
}
