//! Rule-driven auto-downloader.
//!
//! The instance is created once per process; settings refreshes push new rules
//! and a new torrent client reference into it rather than replacing it.

use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use shiori_config::{AutoDownloaderSettings, TorrentProvider};
use shiori_events::ModuleKind;
use shiori_torrent::TorrentClient;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::ModuleResult;
use crate::registry::Module;

#[derive(Default)]
struct DownloaderState {
    settings: Option<AutoDownloaderSettings>,
    provider: TorrentProvider,
    client: Option<Arc<dyn TorrentClient>>,
}

/// Long-lived auto-downloader.
pub struct AutoDownloader {
    state: Arc<RwLock<DownloaderState>>,
    poll_override: Option<Duration>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl AutoDownloader {
    /// Downloader polling at the interval from its settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(DownloaderState::default())),
            poll_override: None,
            task: Mutex::new(None),
        }
    }

    /// Downloader polling every `interval` regardless of settings.
    #[must_use]
    pub fn with_poll_interval(interval: Duration) -> Self {
        Self {
            poll_override: Some(interval),
            ..Self::new()
        }
    }

    /// Replace the rule set and search provider.
    pub fn set_settings(&self, settings: AutoDownloaderSettings, provider: TorrentProvider) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        debug!(
            rules = settings.rules.len(),
            provider = provider.as_str(),
            "auto-downloader settings updated"
        );
        state.settings = Some(settings);
        state.provider = provider;
    }

    /// Current rule set, if any was pushed.
    #[must_use]
    pub fn settings(&self) -> Option<AutoDownloaderSettings> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .settings
            .clone()
    }

    /// Current search provider.
    #[must_use]
    pub fn provider(&self) -> TorrentProvider {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .provider
    }

    /// Re-bind the torrent client reference.
    pub fn set_torrent_client(&self, client: Option<Arc<dyn TorrentClient>>) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .client = client;
    }

    /// Current torrent client reference.
    #[must_use]
    pub fn torrent_client(&self) -> Option<Arc<dyn TorrentClient>> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .client
            .clone()
    }

    /// Whether the polling loop is alive.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Default for AutoDownloader {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AutoDownloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutoDownloader")
            .field("provider", &self.provider())
            .field("has_client", &self.torrent_client().is_some())
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

fn poll_interval(state: &RwLock<DownloaderState>, poll_override: Option<Duration>) -> Duration {
    poll_override.unwrap_or_else(|| {
        let minutes = state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .settings
            .as_ref()
            .map_or(AutoDownloaderSettings::default().interval_minutes, |settings| {
                settings.interval_minutes
            })
            .max(1);
        Duration::from_secs(u64::from(minutes) * 60)
    })
}

async fn run_once(state: &RwLock<DownloaderState>) {
    let (client, rules) = {
        let state = state.read().unwrap_or_else(PoisonError::into_inner);
        let rules = state
            .settings
            .as_ref()
            .filter(|settings| settings.enabled)
            .map_or(0, |settings| {
                settings.rules.iter().filter(|rule| rule.enabled).count()
            });
        (state.client.clone(), rules)
    };
    if rules == 0 {
        debug!("auto-downloader idle: no enabled rules");
        return;
    }
    let Some(client) = client else {
        debug!("auto-downloader idle: no torrent client");
        return;
    };
    match client.query().await {
        Ok(torrents) => debug!(rules, active = torrents.len(), "auto-downloader checked client"),
        Err(err) => warn!(error = %err, "auto-downloader could not query torrent client"),
    }
}

#[async_trait]
impl Module for AutoDownloader {
    const KIND: ModuleKind = ModuleKind::AutoDownloader;

    async fn start(&self) -> ModuleResult<()> {
        let mut task = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            warn!("auto-downloader already started");
            return Ok(());
        }
        let state = Arc::clone(&self.state);
        let poll_override = self.poll_override;
        *task = Some(tokio::spawn(async move {
            loop {
                tokio::time::sleep(poll_interval(&state, poll_override)).await;
                run_once(&state).await;
            }
        }));
        info!("auto-downloader started");
        Ok(())
    }

    async fn stop(&self) -> ModuleResult<()> {
        if let Some(handle) = self.task.lock().unwrap_or_else(PoisonError::into_inner).take() {
            handle.abort();
            info!("auto-downloader stopped");
        }
        Ok(())
    }
}
