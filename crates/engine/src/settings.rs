//! Typed, cached access to the settings table.
//!
//! Reads go through an in-process cache (60-minute TTL); writes go straight
//! to the database and forget the cached entry, so every read after a write
//! in the same process sees the new value. Absence is cached too - a key
//! that is not configured does not hit the database on every read.
//!
//! The store is passed explicitly to everything that needs configuration.
//! Nothing in the engine reads settings through a global.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use secrecy::SecretString;
use sqlx::PgPool;

use crate::db::{RepositoryError, SettingsRepository};
use crate::warehouse::WarehouseCredentials;

/// Setting keys used by the sync engine.
pub mod keys {
    /// Kill switch for the `shopify sync-stock` command. Absent means on.
    pub const STOCK_SYNC_ENABLED: &str = "enable_shopify_stock_sync";
    /// Warehouse counts at or below this value push zero to Shopify.
    pub const MIN_STOCK_THRESHOLD: &str = "min_stock_threshold";
    /// Numeric location ID used when no `--location` is given.
    pub const DEFAULT_LOCATION_ID: &str = "shopify_default_location_id";
    /// Sellmate stock endpoint.
    pub const WAREHOUSE_API_URL: &str = "warehouse_api_url";
    /// Sellmate bearer token.
    pub const WAREHOUSE_API_TOKEN: &str = "warehouse_api_token";
}

/// Threshold applied when [`keys::MIN_STOCK_THRESHOLD`] is not configured.
pub const DEFAULT_MIN_STOCK_THRESHOLD: i64 = 2;

const CACHE_TTL: Duration = Duration::from_secs(60 * 60);
const CACHE_CAPACITY: u64 = 200;

/// Cached, typed view of the settings table.
#[derive(Clone)]
pub struct SettingsStore {
    inner: Arc<SettingsStoreInner>,
}

struct SettingsStoreInner {
    pool: PgPool,
    cache: Cache<String, Option<String>>,
}

impl SettingsStore {
    /// Create a store over the given pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        let cache = Cache::builder()
            .max_capacity(CACHE_CAPACITY)
            .time_to_live(CACHE_TTL)
            .build();

        Self {
            inner: Arc::new(SettingsStoreInner { pool, cache }),
        }
    }

    /// Read a raw setting value, going to the database on cache miss.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, key: &str) -> Result<Option<String>, RepositoryError> {
        if let Some(cached) = self.inner.cache.get(key).await {
            return Ok(cached);
        }

        let repo = SettingsRepository::new(&self.inner.pool);
        let value = repo.get(key).await?.map(|setting| setting.value);
        self.inner.cache.insert(key.to_string(), value.clone()).await;

        Ok(value)
    }

    /// Write a setting and forget the cached entry.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn set(
        &self,
        key: &str,
        value: &str,
        value_type: &str,
        group: &str,
    ) -> Result<(), RepositoryError> {
        let repo = SettingsRepository::new(&self.inner.pool);
        repo.set(key, value, value_type, group).await?;
        self.inner.cache.invalidate(key).await;

        Ok(())
    }

    /// Whether the automated stock sync is enabled.
    ///
    /// The flag is a kill switch; a missing row must not silently disable
    /// the sync, so absence reads as enabled.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn stock_sync_enabled(&self) -> Result<bool, RepositoryError> {
        let value = self.get(keys::STOCK_SYNC_ENABLED).await?;
        Ok(value.as_deref().is_none_or(parse_bool))
    }

    /// The minimum-stock threshold for the zero-forcing rule.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails, or
    /// `RepositoryError::DataCorruption` if the stored value is not an
    /// integer.
    pub async fn min_stock_threshold(&self) -> Result<i64, RepositoryError> {
        match self.get(keys::MIN_STOCK_THRESHOLD).await? {
            None => Ok(DEFAULT_MIN_STOCK_THRESHOLD),
            Some(raw) => parse_i64(&raw).ok_or_else(|| {
                RepositoryError::DataCorruption(format!(
                    "setting {} is not an integer: {raw:?}",
                    keys::MIN_STOCK_THRESHOLD
                ))
            }),
        }
    }

    /// The configured default location, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails, or
    /// `RepositoryError::DataCorruption` if the stored value is not an
    /// integer.
    pub async fn default_location_id(&self) -> Result<Option<i64>, RepositoryError> {
        match self.get(keys::DEFAULT_LOCATION_ID).await? {
            None => Ok(None),
            Some(raw) => parse_i64(&raw).map(Some).ok_or_else(|| {
                RepositoryError::DataCorruption(format!(
                    "setting {} is not an integer: {raw:?}",
                    keys::DEFAULT_LOCATION_ID
                ))
            }),
        }
    }

    /// Warehouse credentials from the settings table.
    ///
    /// Returns `None` when neither key is configured - callers fall back to
    /// the environment pair from [`crate::config::EngineConfig`].
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if only one of the two
    /// keys is set.
    pub async fn warehouse_credentials(
        &self,
    ) -> Result<Option<WarehouseCredentials>, RepositoryError> {
        let api_url = self.get(keys::WAREHOUSE_API_URL).await?;
        let api_token = self.get(keys::WAREHOUSE_API_TOKEN).await?;

        match (api_url, api_token) {
            (Some(url), Some(token)) => Ok(Some(WarehouseCredentials {
                api_url: url,
                api_token: SecretString::from(token),
            })),
            (None, None) => Ok(None),
            _ => Err(RepositoryError::DataCorruption(
                "incomplete warehouse credentials: url and token must both be set".to_string(),
            )),
        }
    }
}

fn parse_bool(raw: &str) -> bool {
    matches!(raw.trim(), "1" | "true")
}

fn parse_i64(raw: &str) -> Option<i64> {
    raw.trim().parse().ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool_accepts_stored_forms() {
        assert!(parse_bool("1"));
        assert!(parse_bool("true"));
        assert!(parse_bool(" true "));
        assert!(!parse_bool("0"));
        assert!(!parse_bool("false"));
        assert!(!parse_bool("yes"));
        assert!(!parse_bool(""));
    }

    #[test]
    fn test_parse_i64() {
        assert_eq!(parse_i64("2"), Some(2));
        assert_eq!(parse_i64(" 42 "), Some(42));
        assert_eq!(parse_i64("2.5"), None);
        assert_eq!(parse_i64("abc"), None);
    }

    #[test]
    fn test_default_threshold() {
        assert_eq!(DEFAULT_MIN_STOCK_THRESHOLD, 2);
    }

    #[test]
    fn test_store_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<SettingsStore>();
    }

    #[test]
    fn test_store_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SettingsStore>();
    }
}
