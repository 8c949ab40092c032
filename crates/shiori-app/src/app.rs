//! Application facade over the module registry.
//!
//! `App` owns the registry behind an async mutex; every cascade holds that lock
//! for its whole run, so two refreshes never interleave a watcher replacement.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use shiori_config::{Settings, SettingsPayload, SettingsStore};
use shiori_events::{Event, EventBus, ModuleKind};
use shiori_library::{AutoScanner, DEFAULT_SCAN_DEBOUNCE, ScanJob};
use shiori_telemetry::Metrics;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use crate::cascade::{RefreshReport, SettingsCascade};
use crate::error::{AppError, AppResult};
use crate::modules::{AutoDownloader, RemoteCatalog, TorrentClientFactory, UpdateChecker};
use crate::registry::{Module, ModuleRegistry, ModuleStatus, Registered};
use crate::updater::{SelfUpdater, UpdateProcedure};

/// Collaborators injected into [`App`].
pub struct AppDependencies {
    /// Settings and account persistence.
    pub store: Arc<dyn SettingsStore>,
    /// Remote catalog used for account hydration.
    pub catalog: Arc<dyn RemoteCatalog>,
    /// Torrent client constructor.
    pub torrent_factory: Arc<dyn TorrentClientFactory>,
    /// Work run by the auto-scanner.
    pub scan_job: Arc<dyn ScanJob>,
    /// Procedure behind the self-updater.
    pub update_procedure: Arc<dyn UpdateProcedure>,
    /// Shared event bus.
    pub events: EventBus,
    /// Shared metrics handle.
    pub metrics: Metrics,
    /// Quiet period of the auto-scanner.
    pub scan_debounce: Duration,
    /// Fixed poll interval for the auto-downloader, overriding its settings.
    pub downloader_poll: Option<Duration>,
}

impl AppDependencies {
    /// Dependencies with the default scan debounce and settings-driven polling.
    #[must_use]
    pub fn new(
        store: Arc<dyn SettingsStore>,
        catalog: Arc<dyn RemoteCatalog>,
        torrent_factory: Arc<dyn TorrentClientFactory>,
        scan_job: Arc<dyn ScanJob>,
        update_procedure: Arc<dyn UpdateProcedure>,
        events: EventBus,
        metrics: Metrics,
    ) -> Self {
        Self {
            store,
            catalog,
            torrent_factory,
            scan_job,
            update_procedure,
            events,
            metrics,
            scan_debounce: DEFAULT_SCAN_DEBOUNCE,
            downloader_poll: None,
        }
    }
}

/// The running service: registry, persistence and self-updater.
pub struct App {
    registry: Mutex<ModuleRegistry>,
    store: Arc<dyn SettingsStore>,
    catalog: Arc<dyn RemoteCatalog>,
    torrent_factory: Arc<dyn TorrentClientFactory>,
    scan_job: Arc<dyn ScanJob>,
    updater: Arc<SelfUpdater>,
    events: EventBus,
    metrics: Metrics,
    scan_debounce: Duration,
    downloader_poll: Option<Duration>,
}

impl App {
    /// Assemble the application. No module is started yet.
    #[must_use]
    pub fn new(deps: AppDependencies) -> Self {
        let updater = Arc::new(SelfUpdater::new(
            deps.update_procedure,
            deps.events.clone(),
            deps.metrics.clone(),
        ));
        Self {
            registry: Mutex::new(ModuleRegistry::new(deps.events.clone(), deps.metrics.clone())),
            store: deps.store,
            catalog: deps.catalog,
            torrent_factory: deps.torrent_factory,
            scan_job: deps.scan_job,
            updater,
            events: deps.events,
            metrics: deps.metrics,
            scan_debounce: deps.scan_debounce,
            downloader_poll: deps.downloader_poll,
        }
    }

    /// Construct and start the modules that live for the whole process:
    /// update checker, auto-scanner and auto-downloader.
    ///
    /// Call once per process; a second call replaces the instances and restarts
    /// their background loops.
    ///
    /// # Errors
    ///
    /// Returns an error if one of the modules fails to start.
    pub async fn init_modules_once(&self) -> AppResult<()> {
        let mut registry = self.registry.lock().await;
        install(&mut registry, UpdateChecker::new()).await?;
        install(
            &mut registry,
            AutoScanner::new(
                Arc::clone(&self.scan_job),
                self.scan_debounce,
                self.metrics.clone(),
            ),
        )
        .await?;
        let downloader = self
            .downloader_poll
            .map_or_else(AutoDownloader::new, AutoDownloader::with_poll_interval);
        install(&mut registry, downloader).await?;
        // Flags follow the settings; the scanner stays idle until a refresh enables it.
        registry.set_enabled::<AutoScanner>(false);
        info!("long-lived modules initialised");
        Ok(())
    }

    /// Read the stored settings and run the cascade.
    ///
    /// Missing settings are not an error: every step logs a warning and the
    /// settings-dependent modules stay absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings cannot be read for any other reason.
    #[instrument(name = "app.refresh_modules", skip(self))]
    pub async fn refresh_modules(&self) -> AppResult<RefreshReport> {
        let settings = match self.store.get_settings().await {
            Ok(settings) => Some(settings),
            Err(err) if err.is_not_found() => {
                warn!("no settings stored; modules not configured yet");
                None
            }
            Err(err) => return Err(AppError::config("settings.get", err)),
        };
        Ok(self.run_cascade(settings.as_ref()).await)
    }

    /// Run the cascade against `settings` without reading storage.
    pub async fn apply_settings(&self, settings: &Settings) -> RefreshReport {
        self.run_cascade(Some(settings)).await
    }

    /// Settings write path: store `payload`, announce the change and refresh.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings cannot be stored.
    #[instrument(name = "app.save_settings", skip_all)]
    pub async fn save_settings(&self, payload: SettingsPayload) -> AppResult<Settings> {
        let stored = self
            .store
            .upsert_settings(payload)
            .await
            .map_err(|err| AppError::config("settings.upsert", err))?;
        self.events.publish(Event::SettingsChanged {
            revision: stored.updated_at,
        });
        self.apply_settings(&stored).await;
        Ok(stored)
    }

    /// Replace the token the remote catalog uses.
    pub fn update_catalog_token(&self, token: Option<String>) {
        self.catalog.set_token(token);
    }

    /// Stop every module and close persistence.
    pub async fn cleanup(&self) {
        self.registry.lock().await.stop_all().await;
        self.store.close().await;
        info!("cleanup completed");
    }

    /// Self-update coordinator.
    #[must_use]
    pub fn self_updater(&self) -> Arc<SelfUpdater> {
        Arc::clone(&self.updater)
    }

    /// Module currently installed in `M`'s slot.
    pub async fn module<M: Registered>(&self) -> Option<Arc<M>> {
        self.registry.lock().await.get::<M>()
    }

    /// Status of every installed module.
    pub async fn module_status(&self) -> BTreeMap<ModuleKind, ModuleStatus> {
        self.registry.lock().await.status()
    }

    /// Shared event bus.
    #[must_use]
    pub const fn events(&self) -> &EventBus {
        &self.events
    }

    /// Shared metrics handle.
    #[must_use]
    pub const fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    async fn run_cascade(&self, settings: Option<&Settings>) -> RefreshReport {
        let mut registry = self.registry.lock().await;
        SettingsCascade {
            registry: &mut registry,
            store: self.store.as_ref(),
            catalog: self.catalog.as_ref(),
            torrent_factory: self.torrent_factory.as_ref(),
            events: &self.events,
            metrics: &self.metrics,
        }
        .run(settings)
        .await
    }
}

async fn install<M: Registered>(registry: &mut ModuleRegistry, module: M) -> AppResult<Arc<M>> {
    registry
        .install(module)
        .await
        .map_err(|err| AppError::module(<M as Module>::KIND, err))
}
