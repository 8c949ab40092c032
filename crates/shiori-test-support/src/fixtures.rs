//! Temporary directories and sample settings.

use std::path::{Path, PathBuf};

use anyhow::Result;
use shiori_config::{
    AutoDownloaderRule, AutoDownloaderSettings, LibrarySettings, MediaPlayerSettings,
    SettingsPayload, TorrentProvider, TorrentSettings,
};
use tempfile::TempDir;

/// Temporary data directory plus a library root inside the same sandbox.
///
/// Everything is removed when the fixture is dropped.
#[derive(Debug)]
pub struct Sandbox {
    root: TempDir,
    data_dir: PathBuf,
}

impl Sandbox {
    /// Create an empty sandbox with a `data/` directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary directory cannot be created.
    pub fn new() -> Result<Self> {
        let root = tempfile::tempdir()?;
        let data_dir = root.path().join("data");
        std::fs::create_dir_all(&data_dir)?;
        Ok(Self { root, data_dir })
    }

    /// Data directory for the database and staged updates.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Create (if needed) and return a library root named `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn library(&self, name: &str) -> Result<PathBuf> {
        let path = self.root.path().join("libraries").join(name);
        std::fs::create_dir_all(&path)?;
        Ok(path)
    }

    /// A path inside the sandbox that does not exist.
    #[must_use]
    pub fn missing_path(&self) -> PathBuf {
        self.root.path().join("does-not-exist")
    }
}

/// Library section pointing at `path` with auto-scan on.
#[must_use]
pub fn library_settings(path: &Path) -> LibrarySettings {
    LibrarySettings {
        library_path: path.display().to_string(),
        auto_scan: true,
        disable_update_check: false,
        torrent_provider: TorrentProvider::Nyaa,
    }
}

/// Torrent section for a local qBittorrent instance.
#[must_use]
pub fn torrent_settings() -> TorrentSettings {
    TorrentSettings {
        qbittorrent_host: "127.0.0.1".to_string(),
        qbittorrent_port: 8081,
        qbittorrent_username: "admin".to_string(),
        qbittorrent_password: "adminadmin".to_string(),
        qbittorrent_path: String::new(),
    }
}

/// Auto-downloader section with one enabled rule.
#[must_use]
pub fn auto_downloader_settings() -> AutoDownloaderSettings {
    AutoDownloaderSettings {
        enabled: true,
        interval_minutes: 15,
        rules: vec![AutoDownloaderRule {
            enabled: true,
            media_id: 21,
            comparison_title: "One Piece".to_string(),
            release_groups: vec!["SubsPlease".to_string()],
            resolutions: vec!["1080p".to_string()],
            episode_numbers: Vec::new(),
            destination: "/media/anime/One Piece".to_string(),
        }],
    }
}

/// Payload with every section populated, the library rooted at `library`.
#[must_use]
pub fn full_settings(library: &Path) -> SettingsPayload {
    SettingsPayload {
        library: Some(library_settings(library)),
        media_player: Some(MediaPlayerSettings::default()),
        torrent: Some(torrent_settings()),
        auto_downloader: Some(auto_downloader_settings()),
    }
}
