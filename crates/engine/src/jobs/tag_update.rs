//! Tag-scoped bulk sync-flag updates.
//!
//! Resolves every active variant inside (or outside) a product tag and
//! rewrites its sync flag one variant at a time, reporting progress as a
//! stream of typed events. The caller drains the stream; dropping it
//! mid-way stops the job at the next item boundary, as does the
//! cancellation token.

use std::time::Duration;

use async_stream::stream;
use futures::Stream;
use serde::Serialize;
use stockbridge_core::{ShopifyVariantRecord, SyncFlag};
use tokio_util::sync::CancellationToken;

use crate::shopify::types::VariantFeedRequest;
use crate::shopify::{ShopifyClient, ShopifyError};

/// Backend page size for the tag scan.
const SCAN_PAGE_SIZE: u32 = 100;
/// Pause between consecutive metafield writes.
const INTER_ITEM_DELAY: Duration = Duration::from_millis(50);

/// One bulk update: which variants, and what flag to write.
#[derive(Debug, Clone)]
pub struct TagUpdateRequest {
    /// Product tag the scope is built from.
    pub tag: String,
    /// Target the variants WITHOUT the tag instead.
    pub inverted: bool,
    /// Flag value to write. [`SyncFlag::Unset`] clears the metafield.
    pub desired: SyncFlag,
}

/// Progress events emitted while a bulk update runs.
///
/// `index` fields are 1-based ordinals for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TagUpdateEvent {
    /// The job accepted the request and is resolving the scope.
    Start {
        tag: String,
        inverted: bool,
        desired: String,
    },
    /// Free-form progress note.
    Info { message: String },
    /// Scope resolved; this many variants will be written.
    Total { total: usize },
    /// About to write one variant.
    Progress {
        index: usize,
        total: usize,
        variant_id: i64,
        title: String,
    },
    /// The write for one variant went through.
    Success { index: usize, variant_id: i64 },
    /// The write for one variant failed; the job moves on.
    Failed {
        index: usize,
        variant_id: i64,
        reason: String,
    },
    /// The job finished, possibly early.
    Done {
        updated: usize,
        failed: usize,
        cancelled: bool,
    },
}

/// Whether a variant belongs to the requested tag scope.
fn matches_tag_scope(variant: &ShopifyVariantRecord, tag: &str, inverted: bool) -> bool {
    let tagged = variant.has_tag(tag);
    if inverted { !tagged } else { tagged }
}

/// Run a bulk sync-flag update, yielding [`TagUpdateEvent`]s as it goes.
///
/// The backend search narrows the scan with `tag:` / `-tag:` but matches
/// on substrings, so every candidate is re-checked against the exact tag
/// before it is written. A failed write is reported and skipped; only a
/// failed scope scan ends the stream with an error.
pub fn run(
    client: ShopifyClient,
    request: TagUpdateRequest,
    cancel: CancellationToken,
) -> impl Stream<Item = Result<TagUpdateEvent, ShopifyError>> {
    stream! {
        yield Ok(TagUpdateEvent::Start {
            tag: request.tag.clone(),
            inverted: request.inverted,
            desired: request.desired.to_string(),
        });

        let search = if request.inverted {
            format!("-tag:{}", request.tag)
        } else {
            format!("tag:{}", request.tag)
        };
        let feed = VariantFeedRequest {
            page_size: SCAN_PAGE_SIZE,
            search: Some(search),
            ..Default::default()
        };
        let scan = match client.fetch_all_variants(&feed).await {
            Ok(scan) => scan,
            Err(error) => {
                yield Err(error);
                return;
            }
        };
        if !scan.complete {
            yield Ok(TagUpdateEvent::Info {
                message: "tag scan stopped early; some matching variants may be missing"
                    .to_string(),
            });
        }

        let matched: Vec<ShopifyVariantRecord> = scan
            .variants
            .into_iter()
            .filter(|v| matches_tag_scope(v, &request.tag, request.inverted))
            .collect();
        if matched.is_empty() {
            yield Ok(TagUpdateEvent::Info {
                message: "no variants matched the tag scope".to_string(),
            });
            yield Ok(TagUpdateEvent::Done {
                updated: 0,
                failed: 0,
                cancelled: false,
            });
            return;
        }

        let total = matched.len();
        tracing::info!(
            tag = %request.tag,
            inverted = request.inverted,
            desired = %request.desired,
            total,
            "starting bulk sync flag update"
        );
        yield Ok(TagUpdateEvent::Total { total });

        let mut updated = 0usize;
        let mut failed = 0usize;
        for (position, variant) in matched.iter().enumerate() {
            if cancel.is_cancelled() {
                tracing::info!(updated, failed, "bulk update cancelled");
                yield Ok(TagUpdateEvent::Done {
                    updated,
                    failed,
                    cancelled: true,
                });
                return;
            }

            let index = position + 1;
            yield Ok(TagUpdateEvent::Progress {
                index,
                total,
                variant_id: variant.variant_id,
                title: format!("{} / {}", variant.product_title, variant.variant_title),
            });

            match client
                .write_sync_flag(&variant.variant_gid(), request.desired)
                .await
            {
                Ok(()) => {
                    updated += 1;
                    yield Ok(TagUpdateEvent::Success {
                        index,
                        variant_id: variant.variant_id,
                    });
                }
                Err(error) => {
                    failed += 1;
                    tracing::warn!(
                        variant_id = variant.variant_id,
                        %error,
                        "sync flag write failed, moving on"
                    );
                    yield Ok(TagUpdateEvent::Failed {
                        index,
                        variant_id: variant.variant_id,
                        reason: error.to_string(),
                    });
                }
            }

            tokio::time::sleep(INTER_ITEM_DELAY).await;
        }

        tracing::info!(updated, failed, "bulk sync flag update finished");
        yield Ok(TagUpdateEvent::Done {
            updated,
            failed,
            cancelled: false,
        });
    }
}
