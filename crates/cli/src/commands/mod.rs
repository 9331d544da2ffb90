//! Command implementations.
//!
//! Each command module owns its error type; shared setup (config, pool,
//! clients) lives in [`Context`].

pub mod migrate;
pub mod pim;
pub mod stock;
pub mod variants;
pub mod warehouse;

use sqlx::PgPool;
use stockbridge_core::SyncFlag;
use stockbridge_engine::config::{ConfigError, EngineConfig};
use stockbridge_engine::db::{self, RepositoryError};
use stockbridge_engine::settings::SettingsStore;
use stockbridge_engine::shopify::ShopifyClient;
use stockbridge_engine::warehouse::{WarehouseClient, WarehouseCredentials, WarehouseError};
use thiserror::Error;

/// Sync flag values accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SyncStatusArg {
    /// Include the variant in the automated sync
    Include,
    /// Exclude the variant from the automated sync
    Exclude,
    /// Clear the flag entirely
    Unset,
}

impl From<SyncStatusArg> for SyncFlag {
    fn from(arg: SyncStatusArg) -> Self {
        match arg {
            SyncStatusArg::Include => Self::Included,
            SyncStatusArg::Exclude => Self::Excluded,
            SyncStatusArg::Unset => Self::Unset,
        }
    }
}

/// Errors during command setup.
#[derive(Debug, Error)]
pub enum SetupError {
    /// Environment configuration is missing or invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Database connection error.
    #[error("database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Settings could not be read.
    #[error(transparent)]
    Settings(#[from] RepositoryError),

    /// Warehouse credentials missing or unusable.
    #[error(transparent)]
    Warehouse(#[from] WarehouseError),
}

/// Everything a command needs to talk to the outside world.
pub struct Context {
    /// Connection pool for settings and the warehouse cache.
    pub pool: PgPool,
    /// Cached settings store over the pool.
    pub settings: SettingsStore,
    /// Shopify Admin API client.
    pub shopify: ShopifyClient,
    /// Environment configuration, kept for the warehouse fallback pair.
    pub config: EngineConfig,
}

impl Context {
    /// Load configuration and connect the pool.
    ///
    /// # Errors
    ///
    /// Returns an error if the environment is incomplete or the database
    /// is unreachable.
    pub async fn init() -> Result<Self, SetupError> {
        let config = EngineConfig::from_env()?;
        let pool = db::create_pool(&config.database_url).await?;
        let settings = SettingsStore::new(pool.clone());
        let shopify = ShopifyClient::from_config(&config.shopify);

        Ok(Self {
            pool,
            settings,
            shopify,
            config,
        })
    }

    /// Warehouse credentials: settings table first, environment second.
    ///
    /// Returns `None` when neither source is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings table cannot be read or holds an
    /// incomplete credential pair.
    pub async fn warehouse_credentials(
        &self,
    ) -> Result<Option<WarehouseCredentials>, SetupError> {
        if let Some(credentials) = self.settings.warehouse_credentials().await? {
            return Ok(Some(credentials));
        }

        Ok(self
            .config
            .warehouse
            .clone()
            .map(WarehouseCredentials::from))
    }

    /// Build a warehouse client, requiring credentials from somewhere.
    ///
    /// # Errors
    ///
    /// Returns [`WarehouseError::NotConfigured`] when neither the settings
    /// table nor the environment carries credentials.
    pub async fn warehouse_client(&self) -> Result<WarehouseClient, SetupError> {
        let credentials = self
            .warehouse_credentials()
            .await?
            .ok_or(WarehouseError::NotConfigured)?;

        Ok(WarehouseClient::new(credentials))
    }
}
