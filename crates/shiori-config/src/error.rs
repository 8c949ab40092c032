//! Error types for configuration operations.

use thiserror::Error;

/// Primary error type for configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No settings row has been stored yet.
    #[error("settings not found")]
    SettingsNotFound,
    /// No complete account (username, token and profile) is stored.
    #[error("account does not exist")]
    AccountNotFound,
    /// A submitted settings section could not be encoded.
    #[error("invalid settings section")]
    InvalidSection {
        /// Section that failed to encode.
        section: &'static str,
        /// Source encoding error.
        source: serde_json::Error,
    },
    /// Data layer operation failed.
    #[error("data access failed")]
    DataAccess {
        /// Operation identifier.
        operation: &'static str,
        /// Source data-layer error.
        source: shiori_data::DataError,
    },
}

impl ConfigError {
    /// Whether the error only reports that nothing has been stored yet.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::SettingsNotFound | Self::AccountNotFound)
    }
}

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;
