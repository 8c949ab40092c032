//! Error types for logging and metrics setup.

use prometheus::Error as PrometheusError;
use thiserror::Error;

/// Result alias for telemetry operations.
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Failures raised while installing logging or building metrics.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// A global tracing subscriber is already installed, or installation failed.
    #[error("failed to install tracing subscriber")]
    SubscriberInstall {
        /// Source initialisation error.
        source: tracing_subscriber::util::TryInitError,
    },
    /// A counter or gauge could not be constructed.
    #[error("failed to build metrics collector")]
    MetricsCollector {
        /// Metric name.
        name: &'static str,
        /// Source Prometheus error.
        source: PrometheusError,
    },
    /// A collector could not be added to the registry.
    #[error("failed to register metrics collector")]
    MetricsRegister {
        /// Metric name.
        name: &'static str,
        /// Source Prometheus error.
        source: PrometheusError,
    },
    /// The text exposition could not be produced.
    #[error("failed to encode metrics")]
    MetricsEncode {
        /// Source Prometheus error.
        source: PrometheusError,
    },
    /// The encoded exposition was not UTF-8.
    #[error("metrics output was not valid utf-8")]
    MetricsUtf8 {
        /// Source conversion error.
        source: std::string::FromUtf8Error,
    },
}
