//! Process start parameters.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;

use crate::defaults::{DEFAULT_DATA_DIR, DEFAULT_LOG_LEVEL};

/// Immutable parameters fixed at process start.
#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(name = "shiori", version, about = "Shiori media server")]
pub struct ConfigOptions {
    /// Directory holding the database and staged updates.
    #[arg(long, env = "SHIORI_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,
    /// Run the self-update procedure instead of serving.
    #[arg(long, env = "SHIORI_UPDATE")]
    update: bool,
    /// Log level used when `RUST_LOG` is not set.
    #[arg(long, env = "SHIORI_LOG_LEVEL", default_value = DEFAULT_LOG_LEVEL)]
    log_level: String,
    /// Log output format (`json` or `pretty`).
    #[arg(long, env = "SHIORI_LOG_FORMAT")]
    log_format: Option<String>,
    /// Trigger a self-update this many seconds after the service comes up.
    #[arg(long = "self-update-after", env = "SHIORI_SELF_UPDATE_AFTER", value_name = "SECONDS")]
    self_update_after_secs: Option<u64>,
}

impl ConfigOptions {
    /// Build options directly, leaving logging and the bring-up trigger at defaults.
    #[must_use]
    pub fn new(data_dir: impl Into<PathBuf>, update: bool) -> Self {
        Self {
            data_dir: data_dir.into(),
            update,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_format: None,
            self_update_after_secs: None,
        }
    }

    /// Data directory path.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Whether the process starts in update mode.
    #[must_use]
    pub const fn update(&self) -> bool {
        self.update
    }

    /// Configured log level.
    #[must_use]
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    /// Requested log format name, if any.
    #[must_use]
    pub fn log_format(&self) -> Option<&str> {
        self.log_format.as_deref()
    }

    /// Delay before the bring-up self-update trigger fires, if configured.
    #[must_use]
    pub fn self_update_after(&self) -> Option<Duration> {
        self.self_update_after_secs.map(Duration::from_secs)
    }
}
