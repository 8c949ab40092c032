#![allow(dead_code, unreachable_pub)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use shiori_app::modules::{CollectionSummary, RemoteCatalog, TorrentClientFactory};
use shiori_app::{App, AppDependencies, AppResult, ModuleError, ModuleResult, UpdateProcedure};
use shiori_config::{ConfigService, TorrentSettings};
use shiori_events::EventBus;
use shiori_telemetry::Metrics;
use shiori_test_support::fixtures::Sandbox;
use shiori_test_support::mocks::{RecordingScanJob, RecordingTorrentClient};
use shiori_torrent::{TorrentClient, TorrentError, TorrentResult};

#[derive(Default)]
pub struct RecordingCatalog {
    tokens: Mutex<Vec<Option<String>>>,
    refreshed: Mutex<Vec<String>>,
    fail: AtomicBool,
}

impl RecordingCatalog {
    pub fn tokens(&self) -> Vec<Option<String>> {
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn refreshed(&self) -> Vec<String> {
        self.refreshed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn fail_next(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl RemoteCatalog for RecordingCatalog {
    fn set_token(&self, token: Option<String>) {
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(token);
    }

    async fn refresh_collection(&self, username: &str) -> ModuleResult<CollectionSummary> {
        if self.fail.swap(false, Ordering::SeqCst) {
            return Err(ModuleError::CatalogStatus {
                operation: "collection.fetch",
                status: 500,
            });
        }
        self.refreshed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(username.to_string());
        Ok(CollectionSummary {
            lists: 1,
            entries: 3,
        })
    }
}

#[derive(Default)]
pub struct RecordingFactory {
    built: AtomicUsize,
    reject: AtomicBool,
}

impl RecordingFactory {
    pub fn built(&self) -> usize {
        self.built.load(Ordering::SeqCst)
    }

    pub fn reject(&self) {
        self.reject.store(true, Ordering::SeqCst);
    }
}

impl TorrentClientFactory for RecordingFactory {
    fn build(&self, settings: &TorrentSettings) -> TorrentResult<Arc<dyn TorrentClient>> {
        if self.reject.load(Ordering::SeqCst) {
            return Err(TorrentError::Unsupported {
                operation: "client.build",
            });
        }
        self.built.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(RecordingTorrentClient::new(format!(
            "{}:{}",
            settings.qbittorrent_host, settings.qbittorrent_port
        ))))
    }
}

#[derive(Default)]
pub struct CountingUpdate {
    pub prepared: AtomicUsize,
    pub applied: AtomicUsize,
}

#[async_trait]
impl UpdateProcedure for CountingUpdate {
    async fn prepare(&self) -> AppResult<()> {
        self.prepared.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn apply(&self) -> AppResult<()> {
        self.applied.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct Harness {
    pub sandbox: Sandbox,
    pub store: Arc<ConfigService>,
    pub catalog: Arc<RecordingCatalog>,
    pub factory: Arc<RecordingFactory>,
    pub scans: Arc<RecordingScanJob>,
    pub update: Arc<CountingUpdate>,
    pub events: EventBus,
    pub metrics: Metrics,
    pub app: App,
}

impl Harness {
    pub async fn new() -> Result<Self> {
        let sandbox = Sandbox::new()?;
        let store = Arc::new(ConfigService::open(sandbox.data_dir()).await?);
        let catalog = Arc::new(RecordingCatalog::default());
        let factory = Arc::new(RecordingFactory::default());
        let scans = RecordingScanJob::shared();
        let update = Arc::new(CountingUpdate::default());
        let events = EventBus::new();
        let metrics = Metrics::new()?;

        let mut deps = AppDependencies::new(
            store.clone(),
            catalog.clone(),
            factory.clone(),
            scans.clone(),
            update.clone(),
            events.clone(),
            metrics.clone(),
        );
        deps.scan_debounce = Duration::from_millis(50);
        deps.downloader_poll = Some(Duration::from_millis(50));

        Ok(Self {
            sandbox,
            store,
            catalog,
            factory,
            scans,
            update,
            events,
            metrics,
            app: App::new(deps),
        })
    }

    pub async fn started() -> Result<Self> {
        let harness = Self::new().await?;
        harness.app.init_modules_once().await?;
        Ok(harness)
    }
}

pub fn same_client(left: &Arc<dyn TorrentClient>, right: &Arc<dyn TorrentClient>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(left).cast::<()>(),
        Arc::as_ptr(right).cast::<()>(),
    )
}
