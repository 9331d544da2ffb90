//! Shopify Admin API client (HIGH PRIVILEGE).
//!
//! # Security
//!
//! **This module carries the Admin API access token.** The token can read
//! and write products, variants, inventory, and metafields; treat any
//! process holding it as production infrastructure.
//!
//! # Architecture
//!
//! - Raw GraphQL over `POST /admin/api/<version>/graphql.json`
//! - Direct API calls to Shopify (no local database sync)
//! - A GraphQL `errors` array fails the whole call; partial data is never
//!   applied
//!
//! # Example
//!
//! ```rust,ignore
//! use stockbridge_engine::shopify::{ShopifyClient, VariantFeedRequest};
//!
//! let client = ShopifyClient::from_config(&config.shopify);
//!
//! // One backend page of active variants
//! let page = client.fetch_variants(&VariantFeedRequest::default()).await?;
//!
//! // Absolute stock write
//! client.set_available_quantity(777, 100, 0).await?;
//! ```

mod client;
mod inventory;
mod metafields;
pub mod types;
mod variants;

pub use client::ShopifyClient;
pub use metafields::{METAFIELD_NAMESPACE, SYNC_FLAG_KEY, SYNC_TIMESTAMP_KEY};
pub use types::{VariantFeedRequest, VariantPage, VariantScan};

use thiserror::Error;

/// Errors that can occur when interacting with the Shopify Admin API.
#[derive(Debug, Error)]
pub enum ShopifyError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// GraphQL query returned errors.
    #[error("GraphQL errors: {}", format_graphql_errors(.0))]
    GraphQL(Vec<GraphQLError>),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Rate limited by Shopify.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Authentication/authorization failed.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User error from mutation (e.g., invalid input).
    #[error("User error: {0}")]
    UserError(String),
}

/// A GraphQL error returned by the Shopify Admin API.
#[derive(Debug, Clone)]
pub struct GraphQLError {
    /// Error message.
    pub message: String,
    /// Source locations in the query.
    pub locations: Vec<GraphQLErrorLocation>,
    /// Path to the error in the response.
    pub path: Vec<serde_json::Value>,
}

/// Location in a GraphQL query where an error occurred.
#[derive(Debug, Clone)]
pub struct GraphQLErrorLocation {
    /// Line number (1-indexed).
    pub line: i64,
    /// Column number (1-indexed).
    pub column: i64,
}

fn format_graphql_errors(errors: &[GraphQLError]) -> String {
    errors
        .iter()
        .map(|e| e.message.clone())
        .collect::<Vec<_>>()
        .join("; ")
}
