//! Interactive variant browser.
//!
//! # Usage
//!
//! ```bash
//! # Page through a season, sync-flagged variants only
//! stockbridge shopify variants --tag=26SS --status=include
//!
//! # Free-text search restricted to one location
//! stockbridge shopify variants --search=crewneck --location=82124832930
//! ```
//!
//! Each row shows Shopify stock and warehouse stock side by side with the
//! action the reconciliation would take. Navigation: `n`/Enter for the
//! next page, `p` for the previous, `g N` to jump, `q` to quit. Page
//! jumps reuse cursors recorded earlier in the session, so revisiting a
//! page does not re-walk the feed.

use std::io::{self, BufRead, Write};

use stockbridge_core::{ShopifyVariantRecord, SyncDecision, SyncFlag};
use stockbridge_engine::correlate::WarehouseIndex;
use stockbridge_engine::db::RepositoryError;
use stockbridge_engine::filtering::{self, CursorCache, FilteredPage, VariantFilter};
use stockbridge_engine::shopify::{ShopifyClient, ShopifyError};
use stockbridge_engine::warehouse::{WarehouseClient, WarehouseError};
use thiserror::Error;

use super::{Context, SetupError, SyncStatusArg};

/// Errors from the `shopify variants` command.
#[derive(Debug, Error)]
pub enum VariantsCommandError {
    /// Setup failed before the first page.
    #[error(transparent)]
    Setup(#[from] SetupError),

    /// Settings could not be read.
    #[error(transparent)]
    Settings(#[from] RepositoryError),

    /// A page fetch failed.
    #[error(transparent)]
    Shopify(#[from] ShopifyError),

    /// The warehouse scan for the stock column failed.
    #[error(transparent)]
    Warehouse(#[from] WarehouseError),

    /// Terminal input could not be read.
    #[error("failed to read input: {0}")]
    Input(#[from] io::Error),
}

/// Browse variants page by page with warehouse stock alongside.
///
/// # Errors
///
/// Returns an error if setup, the warehouse scan, a page fetch, or
/// terminal input fails.
pub async fn browse(
    search: Option<String>,
    tag: Option<String>,
    status: Option<SyncStatusArg>,
    location: Option<i64>,
    page_size: u32,
) -> Result<(), VariantsCommandError> {
    let context = Context::init().await?;
    let threshold = context.settings.min_stock_threshold().await?;
    let location = match location {
        Some(id) => Some(id),
        None => context.settings.default_location_id().await?,
    };

    let filter = VariantFilter {
        search,
        sync_status: status.map(SyncFlag::from),
        exact_tag: tag,
        location_id: location,
        ..Default::default()
    };

    // One warehouse scan up front; per-row correlation is then a lookup.
    let index = match context.warehouse_credentials().await? {
        Some(credentials) => {
            tracing::info!("scanning warehouse stock for the comparison column");
            let scan = WarehouseClient::new(credentials).fetch_all().await?;
            Some(WarehouseIndex::build(scan.records))
        }
        None => {
            tracing::warn!("warehouse credentials not configured, stock column will be empty");
            None
        }
    };

    let mut session = BrowseSession {
        client: &context.shopify,
        fingerprint: filter.fingerprint(page_size),
        filter,
        page_size,
        cache: CursorCache::new(),
    };

    let (mut page, mut current) = session.fetch_page(1).await?;
    loop {
        render_page(page, &current, index.as_ref(), location, threshold);

        let Some(command) = read_command(current.has_next_page, page)? else {
            break;
        };
        let wanted = match command {
            PagerCommand::Quit => break,
            PagerCommand::Next if current.has_next_page => page + 1,
            PagerCommand::Prev if page > 1 => page - 1,
            PagerCommand::Goto(n) => n.max(1),
            PagerCommand::Next | PagerCommand::Prev => page,
        };
        if wanted == page {
            continue;
        }

        let (reached, fetched) = session.fetch_page(wanted).await?;
        if reached != wanted {
            tracing::info!(reached, "feed ended before the requested page");
        }
        page = reached;
        current = fetched;
    }

    Ok(())
}

/// One browsing session: a fixed filter, its fingerprint, and the cursors
/// discovered so far.
struct BrowseSession<'a> {
    client: &'a ShopifyClient,
    filter: VariantFilter,
    page_size: u32,
    fingerprint: String,
    cache: CursorCache,
}

impl BrowseSession<'_> {
    /// Fetch the given page, walking forward from the nearest recorded
    /// cursor when the page has not been visited yet. Returns the page
    /// actually reached, which is lower when the feed ends first.
    async fn fetch_page(&mut self, wanted: u32) -> Result<(u32, FilteredPage), ShopifyError> {
        if wanted == 1 {
            let fetched = self.fetch_from(None).await?;
            self.record_next(1, &fetched);
            return Ok((1, fetched));
        }
        if let Some(cursor) = self.cache.get(&self.fingerprint, wanted).map(str::to_string) {
            let fetched = self.fetch_from(Some(cursor)).await?;
            self.record_next(wanted, &fetched);
            return Ok((wanted, fetched));
        }

        let (mut page, mut cursor) = self
            .cache
            .nearest_at_or_below(&self.fingerprint, wanted)
            .map_or((1, None), |(p, c)| (p, Some(c.to_string())));
        loop {
            let fetched = self.fetch_from(cursor.clone()).await?;
            self.record_next(page, &fetched);
            if page == wanted || !fetched.has_next_page {
                return Ok((page, fetched));
            }
            match &fetched.end_cursor {
                Some(next) => cursor = Some(next.clone()),
                None => return Ok((page, fetched)),
            }
            page += 1;
        }
    }

    async fn fetch_from(&self, cursor: Option<String>) -> Result<FilteredPage, ShopifyError> {
        filtering::fetch_filtered_page(self.client, &self.filter, self.page_size, cursor).await
    }

    fn record_next(&mut self, page: u32, fetched: &FilteredPage) {
        if fetched.has_next_page
            && let Some(cursor) = &fetched.end_cursor
        {
            self.cache
                .insert(&self.fingerprint, page + 1, cursor.clone());
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PagerCommand {
    Next,
    Prev,
    Goto(u32),
    Quit,
}

fn parse_command(line: &str) -> Option<PagerCommand> {
    let line = line.trim();
    match line {
        "" | "n" | "next" => Some(PagerCommand::Next),
        "p" | "prev" => Some(PagerCommand::Prev),
        "q" | "quit" => Some(PagerCommand::Quit),
        other => other
            .strip_prefix("goto")
            .or_else(|| other.strip_prefix('g'))
            .map(str::trim)
            .and_then(|n| n.parse().ok())
            .map(PagerCommand::Goto),
    }
}

/// Prompt until the operator enters something parseable. `None` means
/// stdin closed.
#[allow(clippy::print_stdout)]
fn read_command(has_next: bool, page: u32) -> io::Result<Option<PagerCommand>> {
    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        let next_hint = if has_next { "[n]ext  " } else { "" };
        let prev_hint = if page > 1 { "[p]rev  " } else { "" };
        print!("{next_hint}{prev_hint}[g]oto N  [q]uit > ");
        io::stdout().flush()?;

        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        if let Some(command) = parse_command(&line) {
            return Ok(Some(command));
        }
    }
}

#[allow(clippy::print_stdout)]
fn render_page(
    page: u32,
    fetched: &FilteredPage,
    index: Option<&WarehouseIndex>,
    location: Option<i64>,
    threshold: i64,
) {
    println!();
    println!(
        "page {page}  ({} variants, {} backend calls)",
        fetched.variants.len(),
        fetched.attempts
    );
    println!(
        "  {:<14} {:<18} {:>6} {:>6}  {:<8} {:<24} {}",
        "variant", "sku", "shop", "wh", "flag", "action", "title"
    );
    for variant in &fetched.variants {
        let warehouse_stock = index.and_then(|i| i.correlate(variant).warehouse.map(|r| r.stock));
        let warehouse_column = match (index, warehouse_stock) {
            (None, _) => "?".to_string(),
            (Some(_), None) => "-".to_string(),
            (Some(_), Some(stock)) => stock.to_string(),
        };
        let action = if index.is_some() {
            action_preview(variant, warehouse_stock, location, threshold)
        } else {
            "-".to_string()
        };
        let title = format!("{} / {}", variant.product_title, variant.variant_title);

        println!(
            "  {:<14} {:<18} {:>6} {:>6}  {:<8} {:<24} {}",
            variant.variant_id,
            truncate(variant.sku.as_deref().unwrap_or("-"), 18),
            variant.stock_for_location(location),
            warehouse_column,
            variant.sync_flag.to_string(),
            action,
            truncate(&title, 40),
        );
    }
    if !fetched.has_next_page {
        println!("  (end of results)");
    }
}

/// What the reconciliation would do to this variant, as a short label.
fn action_preview(
    variant: &ShopifyVariantRecord,
    warehouse_stock: Option<i64>,
    location: Option<i64>,
    threshold: i64,
) -> String {
    let decision =
        SyncDecision::evaluate(variant.stock_for_location(location), warehouse_stock, threshold);
    if decision.is_update() {
        format!(
            "set {} ({})",
            decision.target_stock.unwrap_or(0),
            decision.reason
        )
    } else {
        decision.reason.to_string()
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars.saturating_sub(2)).collect();
    format!("{cut}..")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command_navigation() {
        assert_eq!(parse_command(""), Some(PagerCommand::Next));
        assert_eq!(parse_command("n\n"), Some(PagerCommand::Next));
        assert_eq!(parse_command("next"), Some(PagerCommand::Next));
        assert_eq!(parse_command("p"), Some(PagerCommand::Prev));
        assert_eq!(parse_command("prev"), Some(PagerCommand::Prev));
        assert_eq!(parse_command("q"), Some(PagerCommand::Quit));
    }

    #[test]
    fn test_parse_command_goto() {
        assert_eq!(parse_command("g 7"), Some(PagerCommand::Goto(7)));
        assert_eq!(parse_command("g7"), Some(PagerCommand::Goto(7)));
        assert_eq!(parse_command("goto 12"), Some(PagerCommand::Goto(12)));
    }

    #[test]
    fn test_parse_command_rejects_noise() {
        assert_eq!(parse_command("x"), None);
        assert_eq!(parse_command("g"), None);
        assert_eq!(parse_command("g twelve"), None);
    }

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a very long product title", 10), "a very l..");
        // Multi-byte characters must not be split.
        assert_eq!(truncate("긴 상품 이름입니다", 6), "긴 상품..");
    }
}
