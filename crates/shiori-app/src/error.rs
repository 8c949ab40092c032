//! # Design
//!
//! - Centralize application-level errors for bootstrap, modules and the lifecycle.
//! - Keep error messages constant while carrying context fields for debugging.
//! - Preserve source errors without re-logging at call sites.

use std::io;
use std::path::PathBuf;

use shiori_events::ModuleKind;
use thiserror::Error;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Result alias for module operations.
pub type ModuleResult<T> = Result<T, ModuleError>;

/// Failures raised by individual feature modules.
#[derive(Debug, Error)]
pub enum ModuleError {
    /// Library watcher or scanner failure.
    #[error("library module failed")]
    Library {
        /// Source library error.
        source: shiori_library::LibraryError,
    },
    /// A media player endpoint could not be reached.
    #[error("media player unreachable")]
    PlayerUnreachable {
        /// Player name.
        player: &'static str,
        /// Endpoint that was tried.
        endpoint: String,
        /// Source IO error.
        source: io::Error,
    },
    /// Remote catalog transport failure.
    #[error("catalog request failed")]
    Catalog {
        /// Operation identifier.
        operation: &'static str,
        /// Source HTTP client error.
        source: reqwest::Error,
    },
    /// Remote catalog answered with a non-success status.
    #[error("catalog returned an error status")]
    CatalogStatus {
        /// Operation identifier.
        operation: &'static str,
        /// HTTP status code returned by the catalog.
        status: u16,
    },
    /// Remote catalog answered with an unexpected document.
    #[error("catalog response was malformed")]
    CatalogResponse {
        /// Operation identifier.
        operation: &'static str,
    },
    /// The catalog endpoint is not a valid URL.
    #[error("catalog endpoint invalid")]
    CatalogEndpoint {
        /// Endpoint that failed to parse.
        endpoint: String,
        /// Source parse error.
        source: url::ParseError,
    },
    /// No catalog token is configured.
    #[error("catalog token missing")]
    CatalogTokenMissing,
}

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration operations failed.
    #[error("configuration operation failed")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        source: shiori_config::ConfigError,
    },
    /// Telemetry operations failed.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        source: shiori_telemetry::TelemetryError,
    },
    /// A module failed to start or stop.
    #[error("module operation failed")]
    Module {
        /// Module that failed.
        module: ModuleKind,
        /// Source module error.
        source: ModuleError,
    },
    /// The remote catalog could not be constructed.
    #[error("remote catalog unavailable")]
    Catalog {
        /// Operation identifier.
        operation: &'static str,
        /// Source module error.
        source: ModuleError,
    },
    /// The lifecycle received an event its current state does not accept.
    #[error("invalid lifecycle transition")]
    InvalidTransition {
        /// State label the controller was in.
        from: &'static str,
        /// Event label that was rejected.
        event: &'static str,
    },
    /// The self-update signal already has a waiter.
    #[error("self-update signal already taken")]
    SignalAlreadyTaken,
    /// No staged update is available.
    #[error("no staged update available")]
    UpdateUnavailable {
        /// Expected location of the staged binary.
        path: PathBuf,
    },
    /// The staged update does not match its checksum.
    #[error("staged update checksum mismatch")]
    UpdateChecksumMismatch {
        /// Staged binary that failed verification.
        path: PathBuf,
    },
    /// IO operations failed.
    #[error("io operation failed")]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// Optional path involved in the failure.
        path: Option<PathBuf>,
        /// Source IO error.
        source: io::Error,
    },
}

impl AppError {
    pub(crate) const fn config(
        operation: &'static str,
        source: shiori_config::ConfigError,
    ) -> Self {
        Self::Config { operation, source }
    }

    pub(crate) const fn telemetry(
        operation: &'static str,
        source: shiori_telemetry::TelemetryError,
    ) -> Self {
        Self::Telemetry { operation, source }
    }

    pub(crate) const fn module(module: ModuleKind, source: ModuleError) -> Self {
        Self::Module { module, source }
    }

    pub(crate) const fn io(operation: &'static str, path: Option<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path,
            source,
        }
    }
}
