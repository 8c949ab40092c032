//! Settings refresh cascade.
//!
//! # Design
//!
//! - The cascade is an ordered list of named steps ([`REFRESH_ORDER`]); each
//!   step reads the settings and mutates the registry.
//! - Steps are independent: a missing section or a failure is logged, recorded
//!   in the [`RefreshReport`] and the next step still runs.
//! - A stored section that no longer decodes fails only the steps reading it.
//! - Callers serialise cascades; [`crate::App`] does so by holding its registry
//!   lock for the whole run.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use shiori_config::{
    AUTO_DOWNLOADER_SECTION, LIBRARY_SECTION, MEDIA_PLAYER_SECTION, Settings, SettingsStore,
    TORRENT_SECTION, TorrentProvider,
};
use shiori_events::{Event, EventBus};
use shiori_library::AutoScanner;
use shiori_telemetry::Metrics;
use tracing::{debug, error, info, warn};

use crate::lifecycle::render_error;
use crate::modules::{
    AutoDownloader, MediaPlayers, RemoteCatalog, TorrentClientFactory, TorrentClientModule,
    UpdateChecker, WatcherModule,
};
use crate::registry::ModuleRegistry;

/// One step of the cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshStep {
    /// Update-checker and auto-scan flags.
    FeatureFlags,
    /// Media player client descriptors.
    MediaPlayers,
    /// Torrent client, re-bound into the auto-downloader.
    TorrentClient,
    /// Auto-downloader rules and provider.
    AutoDownloader,
    /// Library watcher bound to the configured root.
    LibraryWatcher,
    /// Remote account hydration.
    RemoteAccount,
}

/// Order in which the cascade runs its steps.
pub const REFRESH_ORDER: [RefreshStep; 6] = [
    RefreshStep::FeatureFlags,
    RefreshStep::MediaPlayers,
    RefreshStep::TorrentClient,
    RefreshStep::AutoDownloader,
    RefreshStep::LibraryWatcher,
    RefreshStep::RemoteAccount,
];

impl RefreshStep {
    /// Stable label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FeatureFlags => "feature_flags",
            Self::MediaPlayers => "media_players",
            Self::TorrentClient => "torrent_client",
            Self::AutoDownloader => "auto_downloader",
            Self::LibraryWatcher => "library_watcher",
            Self::RemoteAccount => "remote_account",
        }
    }
}

impl fmt::Display for RefreshStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a single step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StepOutcome {
    /// The step changed the registry.
    Applied,
    /// The step had nothing to do.
    Skipped {
        /// Why it was skipped.
        reason: &'static str,
    },
    /// The step failed; the module it owns is left absent or unchanged.
    Failed {
        /// Rendered error chain.
        error: String,
    },
}

impl StepOutcome {
    /// Stable label used in metrics.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::Skipped { .. } => "skipped",
            Self::Failed { .. } => "failed",
        }
    }

    fn failed(err: &dyn std::error::Error) -> Self {
        Self::Failed {
            error: render_error(err),
        }
    }
}

/// Outcome of every step of one cascade, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RefreshReport {
    steps: Vec<(RefreshStep, StepOutcome)>,
}

impl RefreshReport {
    /// Outcome recorded for `step`.
    #[must_use]
    pub fn outcome(&self, step: RefreshStep) -> Option<&StepOutcome> {
        self.steps
            .iter()
            .find(|(candidate, _)| *candidate == step)
            .map(|(_, outcome)| outcome)
    }

    /// Every step with its outcome.
    #[must_use]
    pub fn steps(&self) -> &[(RefreshStep, StepOutcome)] {
        &self.steps
    }

    /// Steps that failed.
    #[must_use]
    pub fn failed_steps(&self) -> Vec<RefreshStep> {
        self.steps
            .iter()
            .filter(|(_, outcome)| matches!(outcome, StepOutcome::Failed { .. }))
            .map(|(step, _)| *step)
            .collect()
    }
}

const LIBRARY_ABSENT: &str = "library section absent";

/// `Failed` when the stored `section` could not be decoded.
fn section_fault(settings: Option<&Settings>, section: &'static str) -> Option<StepOutcome> {
    let fault = settings?.fault(section)?;
    error!(section, error = %fault.error, "stored section is malformed; step not applied");
    Some(StepOutcome::failed(fault))
}

/// Collaborators of one cascade run.
pub struct SettingsCascade<'a> {
    /// Registry the steps mutate.
    pub registry: &'a mut ModuleRegistry,
    /// Account source for hydration.
    pub store: &'a dyn SettingsStore,
    /// Remote catalog for hydration.
    pub catalog: &'a dyn RemoteCatalog,
    /// Torrent client constructor.
    pub torrent_factory: &'a dyn TorrentClientFactory,
    /// Event sink.
    pub events: &'a EventBus,
    /// Metrics sink.
    pub metrics: &'a Metrics,
}

impl SettingsCascade<'_> {
    /// Run every step in [`REFRESH_ORDER`]. `None` means no settings are stored yet.
    pub async fn run(mut self, settings: Option<&Settings>) -> RefreshReport {
        let mut report = RefreshReport::default();
        for step in REFRESH_ORDER {
            let outcome = match step {
                RefreshStep::FeatureFlags => self.feature_flags(settings),
                RefreshStep::MediaPlayers => self.media_players(settings).await,
                RefreshStep::TorrentClient => self.torrent_client(settings).await,
                RefreshStep::AutoDownloader => self.auto_downloader(settings),
                RefreshStep::LibraryWatcher => self.library_watcher(settings).await,
                RefreshStep::RemoteAccount => self.remote_account().await,
            };
            self.metrics.inc_refresh_step(step.as_str(), outcome.label());
            report.steps.push((step, outcome));
        }
        self.metrics.inc_settings_refresh();

        let degraded = report.failed_steps();
        if !degraded.is_empty() {
            self.events.publish(Event::HealthChanged {
                degraded: degraded.iter().map(ToString::to_string).collect(),
            });
        }
        info!(
            failed = degraded.len(),
            running = self.registry.running_count(),
            "settings refresh completed"
        );
        report
    }

    fn feature_flags(&mut self, settings: Option<&Settings>) -> StepOutcome {
        if let Some(failed) = section_fault(settings, LIBRARY_SECTION) {
            return failed;
        }
        let Some(library) = settings.and_then(|settings| settings.library.as_ref()) else {
            warn!(section = "library", "library settings not configured; flags unchanged");
            return StepOutcome::Skipped {
                reason: LIBRARY_ABSENT,
            };
        };
        self.registry
            .set_enabled::<UpdateChecker>(!library.disable_update_check);
        self.registry.set_enabled::<AutoScanner>(library.auto_scan);
        if let Some(scanner) = self.registry.get::<AutoScanner>() {
            scanner.set_library_path(library.library_path().map(PathBuf::from));
        }
        debug!(
            auto_scan = library.auto_scan,
            update_check = !library.disable_update_check,
            "feature flags applied"
        );
        StepOutcome::Applied
    }

    async fn media_players(&mut self, settings: Option<&Settings>) -> StepOutcome {
        if let Some(failed) = section_fault(settings, MEDIA_PLAYER_SECTION) {
            return failed;
        }
        let Some(section) = settings.and_then(|settings| settings.media_player.as_ref()) else {
            warn!(section = "media_player", "media player settings not configured");
            return StepOutcome::Skipped {
                reason: "media player section absent",
            };
        };
        match self
            .registry
            .install(MediaPlayers::from_settings(section))
            .await
        {
            Ok(_) => StepOutcome::Applied,
            Err(err) => {
                error!(error = %render_error(&err), "media players could not be configured");
                StepOutcome::failed(&err)
            }
        }
    }

    async fn torrent_client(&mut self, settings: Option<&Settings>) -> StepOutcome {
        if let Some(failed) = section_fault(settings, TORRENT_SECTION) {
            return failed;
        }
        let Some(section) = settings.and_then(|settings| settings.torrent.as_ref()) else {
            warn!(section = "torrent", "torrent client settings not configured");
            return StepOutcome::Skipped {
                reason: "torrent section absent",
            };
        };
        let client = match self.torrent_factory.build(section) {
            Ok(client) => client,
            Err(err) => {
                error!(error = %render_error(&err), "torrent client could not be built");
                return StepOutcome::failed(&err);
            }
        };
        if let Err(err) = self
            .registry
            .install(TorrentClientModule::new(client.clone()))
            .await
        {
            error!(error = %render_error(&err), "torrent client could not be started");
            return StepOutcome::failed(&err);
        }
        if let Some(downloader) = self.registry.get::<AutoDownloader>() {
            downloader.set_torrent_client(Some(client));
        }
        StepOutcome::Applied
    }

    fn auto_downloader(&mut self, settings: Option<&Settings>) -> StepOutcome {
        if let Some(failed) = section_fault(settings, AUTO_DOWNLOADER_SECTION) {
            return failed;
        }
        let Some(section) = settings.and_then(|settings| settings.auto_downloader.as_ref()) else {
            warn!(section = "auto_downloader", "auto-downloader settings not configured");
            return StepOutcome::Skipped {
                reason: "auto-downloader section absent",
            };
        };
        let Some(downloader) = self.registry.get::<AutoDownloader>() else {
            warn!("auto-downloader not initialised; settings not applied");
            return StepOutcome::Skipped {
                reason: "auto-downloader not initialised",
            };
        };
        let provider = settings
            .and_then(|settings| settings.library.as_ref())
            .map_or_else(TorrentProvider::default, |library| library.torrent_provider);
        downloader.set_settings(section.clone(), provider);
        StepOutcome::Applied
    }

    async fn library_watcher(&mut self, settings: Option<&Settings>) -> StepOutcome {
        if let Some(failed) = section_fault(settings, LIBRARY_SECTION) {
            return failed;
        }
        let Some(library) = settings.and_then(|settings| settings.library.as_ref()) else {
            warn!(section = "library", "library settings not configured; watcher unchanged");
            return StepOutcome::Skipped {
                reason: LIBRARY_ABSENT,
            };
        };
        let Some(path) = library.library_path() else {
            warn!("library path not configured; watcher not started");
            self.registry.remove::<WatcherModule>().await;
            return StepOutcome::Skipped {
                reason: "library path empty",
            };
        };
        let Some(scanner) = self.registry.get::<AutoScanner>() else {
            warn!("auto-scanner not initialised; watcher not started");
            self.registry.remove::<WatcherModule>().await;
            return StepOutcome::Skipped {
                reason: "auto-scanner not initialised",
            };
        };
        let watcher = WatcherModule::new(path, scanner.notifier());
        match self.registry.install(watcher).await {
            Ok(_) => StepOutcome::Applied,
            Err(err) => {
                error!(path, error = %render_error(&err), "library watcher could not be started");
                StepOutcome::failed(&err)
            }
        }
    }

    async fn remote_account(&mut self) -> StepOutcome {
        let account = match self.store.get_account().await {
            Ok(account) => account,
            Err(err) if err.is_not_found() => {
                debug!("no stored account; hydration skipped");
                return StepOutcome::Skipped {
                    reason: "no stored account",
                };
            }
            Err(err) => {
                error!(error = %render_error(&err), "account could not be loaded");
                return StepOutcome::failed(&err);
            }
        };
        self.catalog.set_token(Some(account.token.clone()));
        match self.catalog.refresh_collection(&account.username).await {
            Ok(summary) => {
                info!(
                    username = %account.username,
                    lists = summary.lists,
                    entries = summary.entries,
                    "account collection hydrated"
                );
                self.events.publish(Event::AccountHydrated {
                    username: account.username,
                });
                StepOutcome::Applied
            }
            Err(err) => {
                error!(error = %render_error(&err), "account hydration failed");
                StepOutcome::failed(&err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use shiori_config::{ConfigService, SettingsPayload};
    use shiori_test_support::fixtures::{Sandbox, library_settings};
    use shiori_test_support::mocks::RecordingScanJob;

    use crate::modules::{AnilistCatalog, QbittorrentFactory};

    #[test]
    fn order_runs_remote_account_last() {
        assert_eq!(REFRESH_ORDER.first(), Some(&RefreshStep::FeatureFlags));
        assert_eq!(REFRESH_ORDER.last(), Some(&RefreshStep::RemoteAccount));
        let torrent = REFRESH_ORDER
            .iter()
            .position(|step| *step == RefreshStep::TorrentClient);
        let downloader = REFRESH_ORDER
            .iter()
            .position(|step| *step == RefreshStep::AutoDownloader);
        assert!(torrent < downloader);
    }

    #[test]
    fn report_looks_up_outcomes() {
        let report = RefreshReport {
            steps: vec![
                (RefreshStep::FeatureFlags, StepOutcome::Applied),
                (
                    RefreshStep::LibraryWatcher,
                    StepOutcome::Failed {
                        error: "library module failed".into(),
                    },
                ),
            ],
        };
        assert_eq!(
            report.outcome(RefreshStep::FeatureFlags),
            Some(&StepOutcome::Applied)
        );
        assert!(report.outcome(RefreshStep::RemoteAccount).is_none());
        assert_eq!(report.failed_steps(), vec![RefreshStep::LibraryWatcher]);
        assert_eq!(
            serde_json::to_value(&report.steps()[0].1).ok(),
            Some(serde_json::json!({ "outcome": "applied" }))
        );
    }

    #[tokio::test]
    async fn watcher_is_dropped_when_scanner_slot_is_empty() -> anyhow::Result<()> {
        let sandbox = Sandbox::new()?;
        let library = sandbox.library("anime")?;
        let events = EventBus::new();
        let metrics = Metrics::new()?;
        let mut registry = ModuleRegistry::new(events.clone(), metrics.clone());

        let scanner = registry
            .install(AutoScanner::new(
                RecordingScanJob::shared(),
                Duration::from_millis(50),
                metrics.clone(),
            ))
            .await?;
        let watcher = registry
            .install(WatcherModule::new(library.clone(), scanner.notifier()))
            .await?;
        assert!(watcher.is_watching());
        registry.remove::<AutoScanner>().await;

        let store = ConfigService::open(sandbox.data_dir()).await?;
        let settings = store
            .upsert_settings(SettingsPayload {
                library: Some(library_settings(&library)),
                ..SettingsPayload::default()
            })
            .await?;
        let catalog = AnilistCatalog::public()?;
        let report = SettingsCascade {
            registry: &mut registry,
            store: &store,
            catalog: &catalog,
            torrent_factory: &QbittorrentFactory,
            events: &events,
            metrics: &metrics,
        }
        .run(Some(&settings))
        .await;

        assert_eq!(
            report.outcome(RefreshStep::LibraryWatcher),
            Some(&StepOutcome::Skipped {
                reason: "auto-scanner not initialised"
            })
        );
        assert!(registry.get::<WatcherModule>().is_none());
        assert!(!watcher.is_watching());
        store.close().await;
        Ok(())
    }
}
