#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Typed configuration for Shiori: process start options, the persisted settings
//! aggregate and the account record.
//!
//! Layout: `model.rs` (sections, aggregate, account), `options.rs` (CLI/env
//! parameters), `service.rs` (`SettingsStore` + `ConfigService`).

pub mod defaults;
pub mod error;
pub mod model;
pub mod options;
pub mod service;

pub use defaults::{DEFAULT_DATA_DIR, DEFAULT_LOG_LEVEL};
pub use error::{ConfigError, ConfigResult};
pub use model::{
    AUTO_DOWNLOADER_SECTION, Account, AutoDownloaderRule, AutoDownloaderSettings, DefaultPlayer,
    LIBRARY_SECTION, LibrarySettings, MEDIA_PLAYER_SECTION, MediaPlayerSettings, SectionFault,
    Settings, SettingsPayload, TORRENT_SECTION, TorrentProvider, TorrentSettings,
};
pub use options::ConfigOptions;
pub use service::{ConfigService, SettingsStore};
