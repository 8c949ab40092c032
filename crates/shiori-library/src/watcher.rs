//! Filesystem observer for the library root.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{LibraryError, LibraryResult};
use crate::notifier::ScanNotifier;

/// Running watch over a single library root.
///
/// Create, modify and remove events anywhere below the root are forwarded as
/// bare notifications. After [`LibraryWatcher::stop`] no further notifications
/// leave this instance.
#[derive(Debug)]
pub struct LibraryWatcher {
    id: Uuid,
    path: PathBuf,
    active: Arc<AtomicBool>,
    watcher: Mutex<Option<RecommendedWatcher>>,
}

impl LibraryWatcher {
    /// Start watching `path`, forwarding changes to `notifier`.
    ///
    /// # Errors
    ///
    /// Returns [`LibraryError::Unreadable`] if `path` cannot be listed and
    /// [`LibraryError::Watch`] if the OS watch cannot be installed.
    pub fn start(path: impl Into<PathBuf>, notifier: ScanNotifier) -> LibraryResult<Self> {
        let path = path.into();
        std::fs::read_dir(&path).map_err(|source| LibraryError::Unreadable {
            path: path.clone(),
            source,
        })?;

        let id = Uuid::new_v4();
        let active = Arc::new(AtomicBool::new(true));
        let forwarding = Arc::clone(&active);
        let mut watcher =
            notify::recommended_watcher(move |result: notify::Result<notify::Event>| {
                if !forwarding.load(Ordering::Acquire) {
                    return;
                }
                match result {
                    Ok(event) if is_change(event.kind) => {
                        let queued = notifier.notify();
                        debug!(watcher = %id, queued, "library change forwarded");
                    }
                    Ok(_) => {}
                    Err(err) => warn!(watcher = %id, error = %err, "library watch error"),
                }
            })
            .map_err(|source| LibraryError::Watch {
                path: path.clone(),
                source,
            })?;
        watcher
            .watch(&path, RecursiveMode::Recursive)
            .map_err(|source| LibraryError::Watch {
                path: path.clone(),
                source,
            })?;

        info!(watcher = %id, path = %path.display(), "library watcher started");
        Ok(Self {
            id,
            path,
            active,
            watcher: Mutex::new(Some(watcher)),
        })
    }

    /// Unique identity of this watch instance.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Library root being observed.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the watch is still installed.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Detach the OS watch. Idempotent.
    pub fn stop(&self) {
        if !self.active.swap(false, Ordering::AcqRel) {
            return;
        }
        let watcher = self
            .watcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(mut watcher) = watcher {
            if let Err(err) = watcher.unwatch(&self.path) {
                debug!(watcher = %self.id, error = %err, "unwatch failed");
            }
        }
        info!(watcher = %self.id, path = %self.path.display(), "library watcher stopped");
    }
}

impl Drop for LibraryWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

const fn is_change(kind: EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::scan_channel;
    use std::time::Duration;
    use tokio::time::timeout;

    const DELIVERY: Duration = Duration::from_secs(5);

    #[test]
    fn missing_path_fails_fast() {
        let (notifier, _requests) = scan_channel();
        let result = LibraryWatcher::start("/definitely/not/a/library", notifier);
        assert!(matches!(result, Err(LibraryError::Unreadable { .. })));
    }

    #[tokio::test]
    async fn file_creation_is_forwarded() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let (notifier, mut requests) = scan_channel();
        let watcher = LibraryWatcher::start(root.path(), notifier)?;
        assert!(watcher.is_running());
        assert_eq!(watcher.path(), root.path());

        std::fs::write(root.path().join("episode-01.mkv"), b"data")?;
        let received = timeout(DELIVERY, requests.recv()).await?;
        assert_eq!(received, Some(()));
        Ok(())
    }

    #[tokio::test]
    async fn stopped_watcher_forwards_nothing() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let (notifier, mut requests) = scan_channel();
        let watcher = LibraryWatcher::start(root.path(), notifier)?;
        watcher.stop();
        watcher.stop();
        assert!(!watcher.is_running());

        std::fs::write(root.path().join("episode-02.mkv"), b"data")?;
        let received = timeout(Duration::from_millis(300), requests.recv()).await;
        assert!(received.is_err() || matches!(received, Ok(None)));
        Ok(())
    }

    #[test]
    fn every_instance_has_its_own_identity() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let (notifier, _requests) = scan_channel();
        let first = LibraryWatcher::start(root.path(), notifier.clone())?;
        let second = LibraryWatcher::start(root.path(), notifier)?;
        assert_ne!(first.id(), second.id());
        Ok(())
    }
}
