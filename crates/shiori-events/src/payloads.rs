//! Event payload types carried across the service.

use std::fmt::{self, Display, Formatter};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier assigned to each event emitted by the service.
pub type EventId = u64;

/// Default buffer size for the in-memory replay ring.
pub const DEFAULT_REPLAY_CAPACITY: usize = 1_024;

/// Feature modules managed by the lifecycle core.
///
/// Ordering follows the order in which the settings cascade touches them, so
/// `BTreeMap<ModuleKind, _>` snapshots read naturally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleKind {
    /// Background check for newer releases.
    UpdateChecker,
    /// Debounced library scan trigger.
    AutoScanner,
    /// External media player clients (VLC, MPC-HC, mpv).
    MediaPlayer,
    /// Torrent client connection.
    TorrentClient,
    /// Rule-driven torrent downloader.
    AutoDownloader,
    /// Filesystem observer on the library root.
    LibraryWatcher,
}

impl ModuleKind {
    /// Every module kind, in cascade order.
    pub const ALL: [Self; 6] = [
        Self::UpdateChecker,
        Self::AutoScanner,
        Self::MediaPlayer,
        Self::TorrentClient,
        Self::AutoDownloader,
        Self::LibraryWatcher,
    ];

    /// Stable identifier used in logs and metrics labels.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UpdateChecker => "update_checker",
            Self::AutoScanner => "auto_scanner",
            Self::MediaPlayer => "media_player",
            Self::TorrentClient => "torrent_client",
            Self::AutoDownloader => "auto_downloader",
            Self::LibraryWatcher => "library_watcher",
        }
    }
}

impl Display for ModuleKind {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Run state of a module handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ModuleState {
    /// Constructed (or torn down) and not processing.
    #[default]
    Stopped,
    /// Started and owning its live resources.
    Running,
}

impl ModuleState {
    /// Stable identifier used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Running => "running",
        }
    }
}

/// Typed domain events surfaced across the service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Persisted settings were written.
    SettingsChanged {
        /// Timestamp of the stored settings row.
        revision: DateTime<Utc>,
    },
    /// A module handle started or stopped.
    ModuleStateChanged {
        /// Module that changed state.
        module: ModuleKind,
        /// New run state.
        state: ModuleState,
        /// Optional context (for example the watched path).
        detail: Option<String>,
    },
    /// The auto-scanner decided a library scan should run.
    LibraryScanRequested {
        /// Library root to scan.
        path: String,
    },
    /// The remote account collection was fetched.
    AccountHydrated {
        /// Account owner.
        username: String,
    },
    /// The self-updater reached the point of no return.
    SelfUpdateStarted,
    /// The lifecycle controller moved between states.
    LifecycleTransition {
        /// Previous state label.
        from: String,
        /// New state label.
        to: String,
    },
    /// Components reporting degraded status.
    HealthChanged {
        /// Names of degraded components.
        degraded: Vec<String>,
    },
}

impl Event {
    /// Machine-friendly discriminator for consumers.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::SettingsChanged { .. } => "settings_changed",
            Self::ModuleStateChanged { .. } => "module_state_changed",
            Self::LibraryScanRequested { .. } => "library_scan_requested",
            Self::AccountHydrated { .. } => "account_hydrated",
            Self::SelfUpdateStarted => "self_update_started",
            Self::LifecycleTransition { .. } => "lifecycle_transition",
            Self::HealthChanged { .. } => "health_changed",
        }
    }
}

/// Metadata wrapper around events. Each envelope tracks the event id and
/// emission timestamp.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventEnvelope {
    /// Sequential identifier.
    pub id: EventId,
    /// Emission time.
    pub timestamp: DateTime<Utc>,
    /// Payload.
    pub event: Event,
}
