//! Torrent client request and summary types.

use serde::{Deserialize, Serialize};

/// Where a torrent is fetched from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TorrentSource {
    /// Magnet URI.
    Magnet {
        /// Magnet URI to resolve and add.
        uri: String,
    },
    /// HTTP(S) link to a `.torrent` file.
    Url {
        /// Link to fetch.
        url: String,
    },
}

impl TorrentSource {
    /// Convenience constructor for magnet-based sources.
    #[must_use]
    pub fn magnet(uri: impl Into<String>) -> Self {
        Self::Magnet { uri: uri.into() }
    }

    /// Link string handed to the client.
    #[must_use]
    pub fn as_link(&self) -> &str {
        match self {
            Self::Magnet { uri } => uri,
            Self::Url { url } => url,
        }
    }
}

/// Request to add a torrent to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddTorrent {
    /// Torrent to add.
    pub source: TorrentSource,
    /// Download directory; the client default is used when `None`.
    pub save_path: Option<String>,
    /// Whether the torrent is added paused.
    #[serde(default)]
    pub paused: bool,
}

/// Coarse torrent state reported by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TorrentState {
    /// Transferring payload.
    Downloading,
    /// Complete and uploading.
    Seeding,
    /// Paused or stopped by the user.
    Paused,
    /// Waiting for peers.
    Stalled,
    /// Waiting for a queue slot.
    Queued,
    /// Verifying or moving data.
    Checking,
    /// Client reported an error.
    Error,
    /// State string not recognised.
    Unknown,
}

impl TorrentState {
    /// Map a qBittorrent state string.
    #[must_use]
    pub fn from_qbittorrent(state: &str) -> Self {
        match state {
            "downloading" | "forcedDL" | "metaDL" | "forcedMetaDL" => Self::Downloading,
            "uploading" | "forcedUP" => Self::Seeding,
            "pausedDL" | "pausedUP" | "stoppedDL" | "stoppedUP" => Self::Paused,
            "stalledDL" | "stalledUP" => Self::Stalled,
            "queuedDL" | "queuedUP" => Self::Queued,
            "checkingDL" | "checkingUP" | "checkingResumeData" | "moving" | "allocating" => {
                Self::Checking
            }
            "error" | "missingFiles" => Self::Error,
            _ => Self::Unknown,
        }
    }
}

/// Snapshot of one torrent known to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TorrentSummary {
    /// Info-hash.
    pub hash: String,
    /// Display name.
    pub name: String,
    /// Completion ratio between 0 and 1.
    pub progress: f64,
    /// Coarse state.
    pub state: TorrentState,
    /// Download directory.
    pub save_path: String,
}

/// Non-secret description of a configured client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TorrentClientDescriptor {
    /// Client implementation name.
    pub kind: String,
    /// Host the client is reached on.
    pub host: String,
    /// Port the client is reached on.
    pub port: u16,
    /// Login name, if credentials are configured.
    pub username: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qbittorrent_states_map_to_coarse_states() {
        assert_eq!(TorrentState::from_qbittorrent("stalledUP"), TorrentState::Stalled);
        assert_eq!(TorrentState::from_qbittorrent("forcedUP"), TorrentState::Seeding);
        assert_eq!(TorrentState::from_qbittorrent("stoppedDL"), TorrentState::Paused);
        assert_eq!(TorrentState::from_qbittorrent("missingFiles"), TorrentState::Error);
        assert_eq!(TorrentState::from_qbittorrent("whatever"), TorrentState::Unknown);
    }

    #[test]
    fn source_link_is_passed_through() {
        let source = TorrentSource::magnet("magnet:?xt=urn:btih:abc");
        assert_eq!(source.as_link(), "magnet:?xt=urn:btih:abc");
    }
}
