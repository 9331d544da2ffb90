//! Settings table repository.
//!
//! Plain key/value storage; typed reads and caching live in
//! [`crate::settings::SettingsStore`].

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::RepositoryError;

/// One row of the settings table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Setting {
    /// Setting key, unique.
    pub key: String,
    /// Raw value as text; interpretation depends on `value_type`.
    pub value: String,
    /// Declared type of the value (`string`, `integer`, `boolean`).
    pub value_type: String,
    /// Grouping label (e.g. `shopify`, `warehouse`).
    pub group: String,
    /// Last write time.
    pub updated_at: DateTime<Utc>,
}

/// Repository for settings table operations.
pub struct SettingsRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SettingsRepository<'a> {
    /// Create a new settings repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Fetch one setting by key.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, key: &str) -> Result<Option<Setting>, RepositoryError> {
        let row = sqlx::query_as::<_, Setting>(
            r#"
            SELECT key, value, value_type, "group", updated_at
            FROM settings
            WHERE key = $1
            "#,
        )
        .bind(key)
        .fetch_optional(self.pool)
        .await?;

        Ok(row)
    }

    /// Insert or update a setting.
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
        sqlx::query(
            r#"
            INSERT INTO settings (key, value, value_type, "group")
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (key) DO UPDATE SET
                value = EXCLUDED.value,
                value_type = EXCLUDED.value_type,
                "group" = EXCLUDED."group",
                updated_at = (CURRENT_TIMESTAMP AT TIME ZONE 'utc')
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(value_type)
        .bind(group)
        .execute(self.pool)
        .await?;

        Ok(())
    }
}
