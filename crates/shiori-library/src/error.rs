//! # Design
//!
//! - Constant-message errors for the library watcher and scanner.
//! - Paths travel as context fields rather than being interpolated into messages.

use std::error::Error;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for library operations.
pub type LibraryResult<T> = Result<T, LibraryError>;

/// Errors produced by the library watcher and scanner.
#[derive(Debug, Error)]
pub enum LibraryError {
    /// The library root does not exist or cannot be listed.
    #[error("library path is not readable")]
    Unreadable {
        /// Library root that failed the check.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The filesystem watch could not be installed.
    #[error("library watch failed")]
    Watch {
        /// Library root being watched.
        path: PathBuf,
        /// Underlying watcher error.
        source: notify::Error,
    },
    /// A scan job reported a failure.
    #[error("library scan failed")]
    Scan {
        /// Library root being scanned.
        path: PathBuf,
        /// Underlying failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}
