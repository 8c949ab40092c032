//! Library watcher and auto-scanner as registry modules.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use shiori_events::ModuleKind;
use shiori_library::{AutoScanner, LibraryWatcher, ScanNotifier};
use uuid::Uuid;

use crate::error::{ModuleError, ModuleResult};
use crate::registry::Module;

#[async_trait]
impl Module for AutoScanner {
    const KIND: ModuleKind = ModuleKind::AutoScanner;

    async fn start(&self) -> ModuleResult<()> {
        Self::start(self);
        Ok(())
    }

    async fn stop(&self) -> ModuleResult<()> {
        Self::stop(self);
        Ok(())
    }

    fn set_enabled(&self, enabled: bool) {
        Self::set_enabled(self, enabled);
    }
}

/// Watcher bound to one library root, forwarding into the auto-scanner.
#[derive(Debug)]
pub struct WatcherModule {
    path: PathBuf,
    notifier: ScanNotifier,
    watcher: Mutex<Option<LibraryWatcher>>,
}

impl WatcherModule {
    /// Describe a watcher over `path`; nothing is watched until started.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, notifier: ScanNotifier) -> Self {
        Self {
            path: path.into(),
            notifier,
            watcher: Mutex::new(None),
        }
    }

    /// Library root.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Identity of the live OS watch, if started.
    #[must_use]
    pub fn watch_id(&self) -> Option<Uuid> {
        self.watcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(LibraryWatcher::id)
    }

    /// Whether an OS watch is installed.
    #[must_use]
    pub fn is_watching(&self) -> bool {
        self.watcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(LibraryWatcher::is_running)
    }
}

#[async_trait]
impl Module for WatcherModule {
    const KIND: ModuleKind = ModuleKind::LibraryWatcher;

    async fn start(&self) -> ModuleResult<()> {
        let watcher = LibraryWatcher::start(self.path.clone(), self.notifier.clone())
            .map_err(|source| ModuleError::Library { source })?;
        let previous = self
            .watcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(watcher);
        if let Some(previous) = previous {
            previous.stop();
        }
        Ok(())
    }

    async fn stop(&self) -> ModuleResult<()> {
        let watcher = self
            .watcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(watcher) = watcher {
            watcher.stop();
        }
        Ok(())
    }

    fn detail(&self) -> Option<String> {
        Some(self.path.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shiori_library::scan_channel;

    #[tokio::test]
    async fn watcher_module_owns_one_watch_at_a_time() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let (notifier, _requests) = scan_channel();
        let module = WatcherModule::new(root.path(), notifier);
        assert!(!module.is_watching());

        module.start().await?;
        let first = module.watch_id();
        assert!(first.is_some());
        assert!(module.is_watching());

        module.stop().await?;
        assert!(module.watch_id().is_none());
        assert_eq!(module.detail(), Some(root.path().display().to_string()));
        Ok(())
    }

    #[tokio::test]
    async fn unreadable_root_fails_to_start() {
        let (notifier, _requests) = scan_channel();
        let module = WatcherModule::new("/definitely/not/here", notifier);
        let result = module.start().await;
        assert!(matches!(result, Err(ModuleError::Library { .. })));
        assert!(!module.is_watching());
    }
}
