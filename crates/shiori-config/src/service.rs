//! Database-backed settings facade.
//!
//! `SettingsStore` is the seam the application layer depends on; `ConfigService`
//! implements it over the local `SQLite` database.

use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use shiori_data::Database;
use tracing::{debug, instrument};

use crate::error::{ConfigError, ConfigResult};
use crate::model::{Account, Settings, SettingsPayload};

#[async_trait]
/// Abstraction over settings and account persistence.
pub trait SettingsStore: Send + Sync {
    /// Load the stored settings.
    ///
    /// Fails with [`ConfigError::SettingsNotFound`] when nothing has been stored yet.
    async fn get_settings(&self) -> ConfigResult<Settings>;
    /// Replace the stored settings with `payload` and return what was stored.
    async fn upsert_settings(&self, payload: SettingsPayload) -> ConfigResult<Settings>;
    /// Load the stored account.
    ///
    /// Fails with [`ConfigError::AccountNotFound`] unless username, token and
    /// cached profile are all present.
    async fn get_account(&self) -> ConfigResult<Account>;
    /// Replace the stored account (last write wins).
    async fn upsert_account(&self, account: Account) -> ConfigResult<Account>;
    /// Flush and release the backing storage.
    async fn close(&self) {}
}

/// Settings store backed by [`Database`].
#[derive(Clone, Debug)]
pub struct ConfigService {
    database: Database,
}

impl ConfigService {
    /// Open the database inside `data_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    #[instrument(name = "config_service.open", skip_all, fields(data_dir = %data_dir.display()))]
    pub async fn open(data_dir: &Path) -> ConfigResult<Self> {
        let database = Database::open(data_dir)
            .await
            .map_err(|source| ConfigError::DataAccess {
                operation: "database.open",
                source,
            })?;
        Ok(Self { database })
    }

    /// Wrap an already opened database.
    #[must_use]
    pub const fn from_database(database: Database) -> Self {
        Self { database }
    }

    /// Access the underlying database handle.
    #[must_use]
    pub const fn database(&self) -> &Database {
        &self.database
    }

    /// Close every pooled connection.
    pub async fn close(&self) {
        self.database.close().await;
    }
}

#[async_trait]
impl SettingsStore for ConfigService {
    async fn get_settings(&self) -> ConfigResult<Settings> {
        let row = self
            .database
            .get_settings()
            .await
            .map_err(|source| ConfigError::DataAccess {
                operation: "settings.get",
                source,
            })?
            .ok_or(ConfigError::SettingsNotFound)?;
        Ok(Settings::from_row(row))
    }

    async fn upsert_settings(&self, payload: SettingsPayload) -> ConfigResult<Settings> {
        let row = payload.into_row(Utc::now())?;
        let stored = self
            .database
            .upsert_settings(&row)
            .await
            .map_err(|source| ConfigError::DataAccess {
                operation: "settings.upsert",
                source,
            })?;
        debug!(revision = %stored.updated_at, "settings stored");
        Ok(Settings::from_row(stored))
    }

    async fn get_account(&self) -> ConfigResult<Account> {
        let account = self
            .database
            .get_account()
            .await
            .map_err(|source| ConfigError::DataAccess {
                operation: "account.get",
                source,
            })?
            .map(Account::from)
            .ok_or(ConfigError::AccountNotFound)?;
        if account.is_complete() {
            Ok(account)
        } else {
            Err(ConfigError::AccountNotFound)
        }
    }

    async fn upsert_account(&self, account: Account) -> ConfigResult<Account> {
        let stored = self
            .database
            .upsert_account(&account.into_row())
            .await
            .map_err(|source| ConfigError::DataAccess {
                operation: "account.upsert",
                source,
            })?;
        Ok(Account::from(stored))
    }

    async fn close(&self) {
        self.database.close().await;
    }
}
