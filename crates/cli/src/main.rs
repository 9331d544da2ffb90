//! Stockbridge CLI - drives the warehouse/Shopify stock sync.
//!
//! # Usage
//!
//! ```bash
//! # Snapshot the warehouse catalog into the local cache table
//! stockbridge warehouse sync
//! stockbridge warehouse sync --fresh
//!
//! # Reconcile Shopify stock against the warehouse
//! stockbridge shopify sync-stock
//! stockbridge shopify sync-stock --location=82124832930 --dry-run
//! stockbridge shopify sync-stock --export-missing
//!
//! # Browse variants with warehouse stock side by side
//! stockbridge shopify variants --tag=26SS --status=include
//!
//! # Flip the sync flag for a whole tag scope
//! stockbridge pim update-by-tag --tag=26SS --status=include
//! stockbridge pim update-by-tag --tag=discontinued --status=exclude --not --confirm
//!
//! # Run database migrations
//! stockbridge migrate
//! ```
//!
//! Exit code is 0 on success (including a disabled sync doing nothing and
//! an operator answering no to a confirmation) and 1 on any unrecoverable
//! error.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

use commands::SyncStatusArg;

#[derive(Parser)]
#[command(name = "stockbridge")]
#[command(author, version, about = "Stock sync between a Sellmate warehouse and Shopify")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Warehouse catalog commands
    Warehouse {
        #[command(subcommand)]
        action: WarehouseAction,
    },
    /// Shopify stock and catalog commands
    Shopify {
        #[command(subcommand)]
        action: ShopifyAction,
    },
    /// Sync-flag metafield management
    Pim {
        #[command(subcommand)]
        action: PimAction,
    },
    /// Run database migrations
    Migrate,
}

#[derive(Subcommand)]
enum WarehouseAction {
    /// Snapshot the warehouse catalog into the local cache table
    Sync {
        /// Truncate the cache first instead of updating rows in place
        #[arg(long)]
        fresh: bool,
    },
}

#[derive(Subcommand)]
enum ShopifyAction {
    /// Reconcile Shopify stock levels against warehouse stock
    SyncStock {
        /// Shopify location ID to read and write (defaults to the
        /// configured location)
        #[arg(long)]
        location: Option<i64>,

        /// Decide and report without writing anything
        #[arg(long)]
        dry_run: bool,

        /// Write variants without a warehouse match to a CSV file
        #[arg(long)]
        export_missing: bool,
    },
    /// Browse variants page by page with warehouse stock alongside
    Variants {
        /// Search terms passed through to Shopify
        #[arg(long)]
        search: Option<String>,

        /// Keep only variants carrying exactly this product tag
        #[arg(long)]
        tag: Option<String>,

        /// Keep only variants with this sync status
        #[arg(long, value_enum)]
        status: Option<SyncStatusArg>,

        /// Restrict stock figures to this Shopify location ID
        #[arg(long)]
        location: Option<i64>,

        /// Variants per page
        #[arg(long, default_value_t = 20)]
        page_size: u32,
    },
}

#[derive(Subcommand)]
enum PimAction {
    /// Set or clear the sync flag for every variant in a tag scope
    UpdateByTag {
        /// Product tag that defines the scope
        #[arg(long)]
        tag: String,

        /// Flag value to write
        #[arg(long, value_enum)]
        status: SyncStatusArg,

        /// Target the variants WITHOUT the tag instead
        #[arg(long)]
        not: bool,

        /// Skip the confirmation prompt
        #[arg(long)]
        confirm: bool,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Warehouse { action } => match action {
            WarehouseAction::Sync { fresh } => commands::warehouse::sync(fresh).await?,
        },
        Commands::Shopify { action } => match action {
            ShopifyAction::SyncStock {
                location,
                dry_run,
                export_missing,
            } => commands::stock::sync_stock(location, dry_run, export_missing).await?,
            ShopifyAction::Variants {
                search,
                tag,
                status,
                location,
                page_size,
            } => commands::variants::browse(search, tag, status, location, page_size).await?,
        },
        Commands::Pim { action } => match action {
            PimAction::UpdateByTag {
                tag,
                status,
                not,
                confirm,
            } => commands::pim::update_by_tag(tag, status, not, confirm).await?,
        },
        Commands::Migrate => commands::migrate::run().await?,
    }
    Ok(())
}
