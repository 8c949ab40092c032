//! Auto-scanner: turns library notifications into debounced scan runs.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use shiori_events::{Event, EventBus};
use shiori_telemetry::Metrics;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::error::LibraryResult;
use crate::notifier::{ScanNotifier, ScanRequests, scan_channel};

/// Quiet period used by the application.
pub const DEFAULT_SCAN_DEBOUNCE: Duration = Duration::from_secs(2);

/// Work performed once a debounced scan is due.
#[async_trait]
pub trait ScanJob: Send + Sync {
    /// Scan the library rooted at `path`.
    async fn scan(&self, path: &Path) -> LibraryResult<()>;
}

/// Scan job that announces the scan on the event bus for the scanning
/// subsystem to pick up.
#[derive(Debug, Clone)]
pub struct EventScanJob {
    events: EventBus,
}

impl EventScanJob {
    /// Publish scan requests onto `events`.
    #[must_use]
    pub const fn new(events: EventBus) -> Self {
        Self { events }
    }
}

#[async_trait]
impl ScanJob for EventScanJob {
    async fn scan(&self, path: &Path) -> LibraryResult<()> {
        self.events.publish(Event::LibraryScanRequested {
            path: path.display().to_string(),
        });
        Ok(())
    }
}

struct Shared {
    enabled: AtomicBool,
    library_path: RwLock<Option<PathBuf>>,
    job: Arc<dyn ScanJob>,
    metrics: Metrics,
    debounce: Duration,
}

impl Shared {
    fn library_path(&self) -> Option<PathBuf> {
        self.library_path
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Long-lived scanner started once per process.
///
/// Notifications arriving within the quiet period of each other collapse into a
/// single scan. Scans that come due while the scanner is disabled are dropped.
pub struct AutoScanner {
    shared: Arc<Shared>,
    notifier: ScanNotifier,
    requests: Mutex<Option<ScanRequests>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl AutoScanner {
    /// Build a disabled scanner around `job`.
    #[must_use]
    pub fn new(job: Arc<dyn ScanJob>, debounce: Duration, metrics: Metrics) -> Self {
        let (notifier, requests) = scan_channel();
        Self {
            shared: Arc::new(Shared {
                enabled: AtomicBool::new(false),
                library_path: RwLock::new(None),
                job,
                metrics,
                debounce,
            }),
            notifier,
            requests: Mutex::new(Some(requests)),
            task: Mutex::new(None),
        }
    }

    /// Spawn the processing loop. Returns `false` if it was already started.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) -> bool {
        let Some(requests) = self
            .requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        else {
            warn!("auto-scanner already started");
            return false;
        };
        let handle = tokio::spawn(run_loop(Arc::clone(&self.shared), requests));
        *self.task.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
        info!("auto-scanner started");
        true
    }

    /// Abort the processing loop.
    pub fn stop(&self) {
        if let Some(handle) = self.task.lock().unwrap_or_else(PoisonError::into_inner).take() {
            handle.abort();
            info!("auto-scanner stopped");
        }
    }

    /// Whether the processing loop is alive.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Toggle whether due scans are executed.
    pub fn set_enabled(&self, enabled: bool) {
        self.shared.enabled.store(enabled, Ordering::Release);
    }

    /// Whether due scans are executed.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.shared.enabled.load(Ordering::Acquire)
    }

    /// Point scans at a new library root, or none.
    pub fn set_library_path(&self, path: Option<PathBuf>) {
        *self
            .shared
            .library_path
            .write()
            .unwrap_or_else(PoisonError::into_inner) = path;
    }

    /// Library root scans currently target.
    #[must_use]
    pub fn library_path(&self) -> Option<PathBuf> {
        self.shared.library_path()
    }

    /// Notifier to hand to a library watcher.
    #[must_use]
    pub fn notifier(&self) -> ScanNotifier {
        self.notifier.clone()
    }

    /// Fire-and-forget scan request.
    pub fn notify(&self) {
        self.notifier.notify();
    }
}

impl std::fmt::Debug for AutoScanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutoScanner")
            .field("enabled", &self.is_enabled())
            .field("running", &self.is_running())
            .field("debounce", &self.shared.debounce)
            .finish_non_exhaustive()
    }
}

impl Drop for AutoScanner {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_loop(shared: Arc<Shared>, mut requests: ScanRequests) {
    while requests.recv().await.is_some() {
        shared.metrics.inc_library_notification();
        loop {
            match timeout(shared.debounce, requests.recv()).await {
                Ok(Some(())) => shared.metrics.inc_library_notification(),
                Ok(None) => return,
                Err(_) => break,
            }
        }

        if !shared.enabled.load(Ordering::Acquire) {
            debug!("auto-scan disabled; dropping scan");
            continue;
        }
        let Some(path) = shared.library_path() else {
            debug!("no library path; dropping scan");
            continue;
        };
        match shared.job.scan(&path).await {
            Ok(()) => {
                shared.metrics.inc_library_scan();
                info!(path = %path.display(), "library scan dispatched");
            }
            Err(err) => error!(path = %path.display(), error = %err, "library scan failed"),
        }
    }
}
