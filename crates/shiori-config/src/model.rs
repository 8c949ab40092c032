//! Typed settings sections, the settings aggregate and the account record.
//!
//! # Design
//! - Pure data carriers shared by the configuration service and the module cascade.
//! - Every section is independently optional; `None` means "not configured".
//! - Sections are stored as JSON documents with camelCase keys; unknown keys are
//!   ignored and missing keys fall back to the section defaults.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shiori_data::{ACCOUNT_ROW_ID, AccountRow, SETTINGS_ROW_ID, SettingsRow};
use thiserror::Error;

use crate::defaults::{
    DEFAULT_AUTO_DOWNLOADER_INTERVAL_MINUTES, DEFAULT_HOST, DEFAULT_MPC_PORT,
    DEFAULT_QBITTORRENT_PORT, DEFAULT_VLC_PORT,
};
use crate::error::{ConfigError, ConfigResult};

/// Stored name of the library section.
pub const LIBRARY_SECTION: &str = "library";
/// Stored name of the media player section.
pub const MEDIA_PLAYER_SECTION: &str = "media_player";
/// Stored name of the torrent client section.
pub const TORRENT_SECTION: &str = "torrent";
/// Stored name of the auto-downloader section.
pub const AUTO_DOWNLOADER_SECTION: &str = "auto_downloader";

/// Torrent search provider used by the auto-downloader.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum TorrentProvider {
    /// `AnimeTosho` feed.
    #[default]
    AnimeTosho,
    /// Nyaa feed.
    Nyaa,
    /// No provider; the auto-downloader idles.
    None,
}

impl TorrentProvider {
    /// Render the provider as its lowercase identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AnimeTosho => "animetosho",
            Self::Nyaa => "nyaa",
            Self::None => "none",
        }
    }
}

/// Library section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct LibrarySettings {
    /// Root directory of the local media library; empty when unset.
    pub library_path: String,
    /// Whether filesystem changes trigger automatic scans.
    pub auto_scan: bool,
    /// Whether the periodic update check is turned off.
    pub disable_update_check: bool,
    /// Provider the auto-downloader searches.
    pub torrent_provider: TorrentProvider,
}

impl LibrarySettings {
    /// The configured library root, if any.
    #[must_use]
    pub fn library_path(&self) -> Option<&str> {
        let path = self.library_path.trim();
        (!path.is_empty()).then_some(path)
    }
}

/// Media player the UI launches by default.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum DefaultPlayer {
    /// VLC media player.
    #[default]
    #[serde(rename = "vlc")]
    Vlc,
    /// Media Player Classic - Home Cinema.
    #[serde(rename = "mpc-hc")]
    MpcHc,
    /// mpv.
    #[serde(rename = "mpv")]
    Mpv,
}

/// Media player section: host, port and path per player.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct MediaPlayerSettings {
    /// Player launched by default.
    pub default_player: DefaultPlayer,
    /// Host the web-controlled players listen on.
    pub host: String,
    /// VLC web interface port.
    pub vlc_port: u16,
    /// VLC web interface password.
    pub vlc_password: String,
    /// Path to the VLC executable.
    pub vlc_path: String,
    /// MPC-HC web interface port.
    pub mpc_port: u16,
    /// Path to the MPC-HC executable.
    pub mpc_path: String,
    /// mpv IPC socket path.
    pub mpv_socket: String,
    /// Path to the mpv executable.
    pub mpv_path: String,
}

impl Default for MediaPlayerSettings {
    fn default() -> Self {
        Self {
            default_player: DefaultPlayer::default(),
            host: DEFAULT_HOST.to_string(),
            vlc_port: DEFAULT_VLC_PORT,
            vlc_password: String::new(),
            vlc_path: String::new(),
            mpc_port: DEFAULT_MPC_PORT,
            mpc_path: String::new(),
            mpv_socket: String::new(),
            mpv_path: String::new(),
        }
    }
}

/// Torrent client section (qBittorrent Web UI credentials and location).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct TorrentSettings {
    /// Web UI host.
    pub qbittorrent_host: String,
    /// Web UI port.
    pub qbittorrent_port: u16,
    /// Web UI username.
    pub qbittorrent_username: String,
    /// Web UI password.
    pub qbittorrent_password: String,
    /// Path to the qBittorrent executable.
    pub qbittorrent_path: String,
}

impl Default for TorrentSettings {
    fn default() -> Self {
        Self {
            qbittorrent_host: DEFAULT_HOST.to_string(),
            qbittorrent_port: DEFAULT_QBITTORRENT_PORT,
            qbittorrent_username: String::new(),
            qbittorrent_password: String::new(),
            qbittorrent_path: String::new(),
        }
    }
}

/// A single auto-downloader rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct AutoDownloaderRule {
    /// Whether the rule participates in matching.
    pub enabled: bool,
    /// Catalog identifier of the tracked series.
    pub media_id: i64,
    /// Title compared against release names.
    pub comparison_title: String,
    /// Accepted release groups; empty accepts any.
    pub release_groups: Vec<String>,
    /// Accepted resolutions such as `1080p`; empty accepts any.
    pub resolutions: Vec<String>,
    /// Episode numbers still wanted; empty tracks new episodes.
    pub episode_numbers: Vec<u32>,
    /// Download destination directory.
    pub destination: String,
}

/// Auto-downloader section (the rule set and polling cadence).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct AutoDownloaderSettings {
    /// Whether the auto-downloader acts on matches.
    pub enabled: bool,
    /// Minutes between provider polls.
    pub interval_minutes: u32,
    /// Configured rules.
    pub rules: Vec<AutoDownloaderRule>,
}

impl Default for AutoDownloaderSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_minutes: DEFAULT_AUTO_DOWNLOADER_INTERVAL_MINUTES,
            rules: Vec::new(),
        }
    }
}

/// Settings sections submitted through the write path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct SettingsPayload {
    /// Library section.
    pub library: Option<LibrarySettings>,
    /// Media player section.
    pub media_player: Option<MediaPlayerSettings>,
    /// Torrent client section.
    pub torrent: Option<TorrentSettings>,
    /// Auto-downloader section.
    pub auto_downloader: Option<AutoDownloaderSettings>,
}

impl SettingsPayload {
    /// Encode the payload into a storable row stamped with `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidSection`] if a section cannot be encoded.
    pub fn into_row(self, updated_at: DateTime<Utc>) -> ConfigResult<SettingsRow> {
        Ok(SettingsRow {
            id: SETTINGS_ROW_ID,
            updated_at,
            library: encode_section(LIBRARY_SECTION, self.library.as_ref())?,
            media_player: encode_section(MEDIA_PLAYER_SECTION, self.media_player.as_ref())?,
            torrent: encode_section(TORRENT_SECTION, self.torrent.as_ref())?,
            auto_downloader: encode_section(
                AUTO_DOWNLOADER_SECTION,
                self.auto_downloader.as_ref(),
            )?,
        })
    }
}

/// Persisted settings aggregate.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Singleton primary key.
    pub id: i64,
    /// Time of the last write; acts as the revision.
    pub updated_at: DateTime<Utc>,
    /// Library section.
    pub library: Option<LibrarySettings>,
    /// Media player section.
    pub media_player: Option<MediaPlayerSettings>,
    /// Torrent client section.
    pub torrent: Option<TorrentSettings>,
    /// Auto-downloader section.
    pub auto_downloader: Option<AutoDownloaderSettings>,
    /// Stored sections that could not be decoded.
    #[serde(skip)]
    pub faults: Vec<SectionFault>,
}

/// A stored section whose document no longer decodes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("stored section {section} is malformed: {error}")]
pub struct SectionFault {
    /// Section name as stored.
    pub section: &'static str,
    /// Decoder message.
    pub error: String,
}

impl Settings {
    /// Decode a stored row section by section.
    ///
    /// A section that no longer matches its shape is left `None` and recorded in
    /// [`Settings::faults`]; the remaining sections decode normally.
    #[must_use]
    pub fn from_row(row: SettingsRow) -> Self {
        let mut faults = Vec::new();
        let library = decode_section(LIBRARY_SECTION, row.library, &mut faults);
        let media_player = decode_section(MEDIA_PLAYER_SECTION, row.media_player, &mut faults);
        let torrent = decode_section(TORRENT_SECTION, row.torrent, &mut faults);
        let auto_downloader =
            decode_section(AUTO_DOWNLOADER_SECTION, row.auto_downloader, &mut faults);
        Self {
            id: row.id,
            updated_at: row.updated_at,
            library,
            media_player,
            torrent,
            auto_downloader,
            faults,
        }
    }

    /// The configured library root, if the library section sets one.
    #[must_use]
    pub fn library_path(&self) -> Option<&str> {
        self.library.as_ref().and_then(LibrarySettings::library_path)
    }

    /// Decode failure recorded for `section`, if any.
    #[must_use]
    pub fn fault(&self, section: &str) -> Option<&SectionFault> {
        self.faults.iter().find(|fault| fault.section == section)
    }
}

fn encode_section<T: Serialize>(
    section: &'static str,
    value: Option<&T>,
) -> ConfigResult<Option<Value>> {
    value
        .map(serde_json::to_value)
        .transpose()
        .map_err(|source| ConfigError::InvalidSection { section, source })
}

fn decode_section<T: for<'de> Deserialize<'de>>(
    section: &'static str,
    value: Option<Value>,
    faults: &mut Vec<SectionFault>,
) -> Option<T> {
    match serde_json::from_value(value?) {
        Ok(decoded) => Some(decoded),
        Err(err) => {
            faults.push(SectionFault {
                section,
                error: err.to_string(),
            });
            None
        }
    }
}

/// Stored remote catalog session.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct Account {
    /// Remote username.
    pub username: String,
    /// Remote API token.
    pub token: String,
    /// Cached remote profile document.
    pub viewer: Option<Value>,
}

impl Account {
    /// Whether username, token and cached profile are all present.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.username.is_empty()
            && !self.token.is_empty()
            && self.viewer.as_ref().is_some_and(|viewer| !viewer.is_null())
    }

    pub(crate) fn into_row(self) -> AccountRow {
        AccountRow {
            id: ACCOUNT_ROW_ID,
            username: self.username,
            token: self.token,
            viewer: self.viewer,
        }
    }
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Self {
            username: row.username,
            token: row.token,
            viewer: row.viewer,
        }
    }
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("username", &self.username)
            .field("token", &if self.token.is_empty() { "" } else { "<redacted>" })
            .field("viewer", &self.viewer.is_some())
            .finish()
    }
}
