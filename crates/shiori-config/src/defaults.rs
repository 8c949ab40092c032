//! Default values for process options and settings sections.
//!
//! # Design
//! - Centralize defaults so the CLI, the models and the tests agree.

/// Data directory used when neither `--data-dir` nor `SHIORI_DATA_DIR` is given.
pub const DEFAULT_DATA_DIR: &str = "./shiori-data";
/// Log level used when neither `--log-level` nor `RUST_LOG` is given.
pub const DEFAULT_LOG_LEVEL: &str = "info";
/// Host media players and the torrent client are reached on by default.
pub(crate) const DEFAULT_HOST: &str = "127.0.0.1";
/// Default VLC web interface port.
pub(crate) const DEFAULT_VLC_PORT: u16 = 8080;
/// Default MPC-HC web interface port.
pub(crate) const DEFAULT_MPC_PORT: u16 = 13579;
/// Default qBittorrent Web UI port.
pub(crate) const DEFAULT_QBITTORRENT_PORT: u16 = 8081;
/// Default auto-downloader polling interval in minutes.
pub(crate) const DEFAULT_AUTO_DOWNLOADER_INTERVAL_MINUTES: u32 = 10;
