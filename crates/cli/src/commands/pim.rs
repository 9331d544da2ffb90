//! Bulk sync-flag update command.
//!
//! # Usage
//!
//! ```bash
//! # Include a whole season in the automated sync
//! stockbridge pim update-by-tag --tag=26SS --status=include
//!
//! # Exclude everything NOT tagged as current, skipping the prompt
//! stockbridge pim update-by-tag --tag=26SS --status=exclude --not --confirm
//! ```
//!
//! Ctrl-C stops the run at the next variant boundary; variants already
//! written stay written.

use std::io::{self, BufRead, Write};

use futures::{StreamExt, pin_mut};
use stockbridge_core::SyncFlag;
use stockbridge_engine::jobs::tag_update::{self, TagUpdateEvent, TagUpdateRequest};
use stockbridge_engine::shopify::ShopifyError;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use super::{Context, SetupError, SyncStatusArg};

/// Errors from the `pim update-by-tag` command.
#[derive(Debug, Error)]
pub enum PimCommandError {
    /// Setup failed before the update started.
    #[error(transparent)]
    Setup(#[from] SetupError),

    /// The tag scope could not be resolved.
    #[error(transparent)]
    Shopify(#[from] ShopifyError),

    /// The confirmation prompt could not be read.
    #[error("failed to read input: {0}")]
    Input(#[from] io::Error),
}

/// Set or clear the sync flag for every variant in a tag scope.
///
/// # Errors
///
/// Returns an error if setup fails or the scope scan fails. A declined
/// confirmation is a successful no-op.
pub async fn update_by_tag(
    tag: String,
    status: SyncStatusArg,
    not: bool,
    confirm: bool,
) -> Result<(), PimCommandError> {
    let desired = SyncFlag::from(status);
    let scope = if not {
        format!("every active variant WITHOUT tag {tag:?}")
    } else {
        format!("every active variant tagged {tag:?}")
    };

    if !confirm && !prompt_yes(&format!("Set sync flag to '{desired}' for {scope}?"))? {
        tracing::info!("aborted, nothing written");
        return Ok(());
    }

    let context = Context::init().await?;

    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("cancellation requested, stopping after the current variant");
            ctrl_c_cancel.cancel();
        }
    });

    let request = TagUpdateRequest {
        tag,
        inverted: not,
        desired,
    };
    let events = tag_update::run(context.shopify.clone(), request, cancel);
    pin_mut!(events);
    while let Some(event) = events.next().await {
        render_event(&event?);
    }

    Ok(())
}

#[allow(clippy::print_stdout)]
fn render_event(event: &TagUpdateEvent) {
    match event {
        TagUpdateEvent::Start {
            tag,
            inverted,
            desired,
        } => {
            let scope = if *inverted { "without" } else { "with" };
            println!("Setting sync flag to '{desired}' for variants {scope} tag '{tag}'");
        }
        TagUpdateEvent::Info { message } => println!("  {message}"),
        TagUpdateEvent::Total { total } => println!("  {total} variants to update"),
        TagUpdateEvent::Progress {
            index,
            total,
            variant_id,
            title,
        } => {
            print!("  [{index}/{total}] {title} ({variant_id}) ... ");
            let _ = io::stdout().flush();
        }
        TagUpdateEvent::Success { .. } => println!("ok"),
        TagUpdateEvent::Failed { reason, .. } => println!("failed: {reason}"),
        TagUpdateEvent::Done {
            updated,
            failed,
            cancelled,
        } => {
            let suffix = if *cancelled { " (cancelled)" } else { "" };
            println!("Done: {updated} updated, {failed} failed{suffix}");
        }
    }
}

/// Ask a yes/no question on stdout, defaulting to no.
#[allow(clippy::print_stdout)]
fn prompt_yes(question: &str) -> io::Result<bool> {
    print!("{question} [y/N] ");
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(is_yes(&answer))
}

fn is_yes(answer: &str) -> bool {
    let answer = answer.trim();
    answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes")
}
