//! Error types for torrent client operations.

use thiserror::Error;

/// Primary error type for torrent client operations.
#[derive(Debug, Error)]
pub enum TorrentError {
    /// Host/port settings do not form a valid endpoint.
    #[error("invalid torrent client endpoint")]
    InvalidEndpoint {
        /// Endpoint that failed to parse.
        endpoint: String,
        /// Underlying parse failure.
        source: url::ParseError,
    },
    /// The HTTP client could not be constructed.
    #[error("failed to build torrent client")]
    ClientBuild {
        /// Underlying builder failure.
        source: reqwest::Error,
    },
    /// Transport-level failure talking to the client.
    #[error("torrent client request failed")]
    Request {
        /// Operation identifier.
        operation: &'static str,
        /// Underlying transport failure.
        source: reqwest::Error,
    },
    /// The client answered with an unexpected status.
    #[error("torrent client returned an error status")]
    Status {
        /// Operation identifier.
        operation: &'static str,
        /// HTTP status code.
        status: u16,
    },
    /// The client rejected the configured credentials.
    #[error("torrent client rejected credentials")]
    AuthenticationFailed,
    /// Operation is not supported by this client.
    #[error("torrent operation not supported")]
    Unsupported {
        /// Operation identifier.
        operation: &'static str,
    },
}

/// Convenience alias for torrent operation results.
pub type TorrentResult<T> = Result<T, TorrentError>;
