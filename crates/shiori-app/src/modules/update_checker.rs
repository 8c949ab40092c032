//! Release check toggle.
//!
//! Only the enabled flag is owned here; when and how releases are compared is
//! decided by whoever triggers [`crate::updater::SelfUpdater`].

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use shiori_events::ModuleKind;
use tracing::debug;

use crate::error::ModuleResult;
use crate::registry::Module;

/// Update-check module created once per process.
#[derive(Debug)]
pub struct UpdateChecker {
    enabled: AtomicBool,
}

impl UpdateChecker {
    /// Checker with update checks turned on.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            enabled: AtomicBool::new(true),
        }
    }

    /// Whether update checks are on.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }
}

impl Default for UpdateChecker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Module for UpdateChecker {
    const KIND: ModuleKind = ModuleKind::UpdateChecker;

    async fn start(&self) -> ModuleResult<()> {
        Ok(())
    }

    async fn stop(&self) -> ModuleResult<()> {
        Ok(())
    }

    fn set_enabled(&self, enabled: bool) {
        debug!(enabled, "update check toggled");
        self.enabled.store(enabled, Ordering::Release);
    }
}
