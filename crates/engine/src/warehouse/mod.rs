//! Sellmate warehouse inventory API client.
//!
//! The warehouse exposes a single paginated stock listing endpoint:
//! `GET <base>?page=N&per_page=100` with Bearer auth and a JSON body
//! carrying the filter arrays the service requires. Responses are either
//! `{data, meta}` or `{errors}`.
//!
//! There is no lookup endpoint. "Find by SKU" is a full-table scan on the
//! client side, which is why every lookup here is built on
//! [`WarehouseClient::fetch_all`] and why callers batch their lookups.

pub mod client;
pub mod types;

pub use client::{WarehouseClient, WarehousePage, WarehouseScan};

use secrecy::SecretString;
use thiserror::Error;

use crate::config::WarehouseEnvConfig;

/// Errors that can occur when talking to the warehouse API.
#[derive(Debug, Error)]
pub enum WarehouseError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with an `{errors}` envelope.
    #[error("warehouse API errors: {0}")]
    Api(String),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Rate limited by the warehouse.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Bearer token rejected.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// No credentials in the settings table or the environment.
    #[error("warehouse credentials not configured")]
    NotConfigured,
}

/// Warehouse API credentials, from the settings table or the environment.
///
/// Implements `Debug` manually to redact the bearer token.
#[derive(Clone)]
pub struct WarehouseCredentials {
    /// Stock listing endpoint.
    pub api_url: String,
    /// Bearer token.
    pub api_token: SecretString,
}

impl std::fmt::Debug for WarehouseCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WarehouseCredentials")
            .field("api_url", &self.api_url)
            .field("api_token", &"[REDACTED]")
            .finish()
    }
}

impl From<WarehouseEnvConfig> for WarehouseCredentials {
    fn from(config: WarehouseEnvConfig) -> Self {
        Self {
            api_url: config.api_url,
            api_token: config.api_token,
        }
    }
}
