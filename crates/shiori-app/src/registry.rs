//! Module registry: one typed slot per module kind.
//!
//! Every slot holds at most one [`ModuleHandle`]. Installing into an occupied
//! slot stops the previous occupant before the new module is started, and every
//! state change is published as [`Event::ModuleStateChanged`].

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use shiori_events::{Event, EventBus, ModuleKind, ModuleState};
use shiori_library::AutoScanner;
use shiori_telemetry::Metrics;
use tracing::{info, warn};

use crate::error::ModuleResult;
use crate::modules::{
    AutoDownloader, MediaPlayers, TorrentClientModule, UpdateChecker, WatcherModule,
};

/// Independently startable feature unit.
#[async_trait]
pub trait Module: Send + Sync + 'static {
    /// Slot this module occupies.
    const KIND: ModuleKind;

    /// Acquire resources and begin processing.
    async fn start(&self) -> ModuleResult<()>;

    /// Release resources and stop processing.
    async fn stop(&self) -> ModuleResult<()>;

    /// Apply the handle's enabled flag. Ignored by default.
    fn set_enabled(&self, enabled: bool) {
        let _ = enabled;
    }

    /// Short description attached to state-change events.
    fn detail(&self) -> Option<String> {
        None
    }
}

/// Module types that have a slot in [`ModuleRegistry`].
pub trait Registered: Module + Sized {
    #[doc(hidden)]
    fn slot(registry: &ModuleRegistry) -> &Option<ModuleHandle<Self>>;
    #[doc(hidden)]
    fn slot_mut(registry: &mut ModuleRegistry) -> &mut Option<ModuleHandle<Self>>;
}

/// Runtime state for one installed module.
#[derive(Debug)]
pub struct ModuleHandle<M> {
    state: ModuleState,
    enabled: bool,
    module: Arc<M>,
}

/// Externally visible status of an installed module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModuleStatus {
    /// Run state.
    pub state: ModuleState,
    /// Enabled flag.
    pub enabled: bool,
}

/// Typed slots for every module kind.
pub struct ModuleRegistry {
    update_checker: Option<ModuleHandle<UpdateChecker>>,
    auto_scanner: Option<ModuleHandle<AutoScanner>>,
    media_players: Option<ModuleHandle<MediaPlayers>>,
    torrent_client: Option<ModuleHandle<TorrentClientModule>>,
    auto_downloader: Option<ModuleHandle<AutoDownloader>>,
    library_watcher: Option<ModuleHandle<WatcherModule>>,
    events: EventBus,
    metrics: Metrics,
}

macro_rules! register_slot {
    ($module:ty, $field:ident) => {
        impl Registered for $module {
            fn slot(registry: &ModuleRegistry) -> &Option<ModuleHandle<Self>> {
                &registry.$field
            }

            fn slot_mut(registry: &mut ModuleRegistry) -> &mut Option<ModuleHandle<Self>> {
                &mut registry.$field
            }
        }
    };
}

register_slot!(UpdateChecker, update_checker);
register_slot!(AutoScanner, auto_scanner);
register_slot!(MediaPlayers, media_players);
register_slot!(TorrentClientModule, torrent_client);
register_slot!(AutoDownloader, auto_downloader);
register_slot!(WatcherModule, library_watcher);

impl ModuleRegistry {
    /// Empty registry publishing onto `events`.
    #[must_use]
    pub const fn new(events: EventBus, metrics: Metrics) -> Self {
        Self {
            update_checker: None,
            auto_scanner: None,
            media_players: None,
            torrent_client: None,
            auto_downloader: None,
            library_watcher: None,
            events,
            metrics,
        }
    }

    /// Stop whatever occupies `M`'s slot, then start and install `module`.
    ///
    /// If `module` fails to start the slot is left empty.
    ///
    /// # Errors
    ///
    /// Returns the start failure of `module`.
    pub async fn install<M: Registered>(&mut self, module: M) -> ModuleResult<Arc<M>> {
        if let Some(previous) = M::slot_mut(self).take() {
            self.stop_handle(previous).await;
        }

        let module = Arc::new(module);
        module.start().await?;
        let detail = module.detail();
        *M::slot_mut(self) = Some(ModuleHandle {
            state: ModuleState::Running,
            enabled: true,
            module: Arc::clone(&module),
        });
        info!(module = %M::KIND, detail = detail.as_deref(), "module started");
        self.publish_state(M::KIND, ModuleState::Running, detail);
        Ok(module)
    }

    /// Stop and drop the module in `M`'s slot. Returns whether one was present.
    pub async fn remove<M: Registered>(&mut self) -> bool {
        match M::slot_mut(self).take() {
            Some(handle) => {
                self.stop_handle(handle).await;
                true
            }
            None => false,
        }
    }

    /// Stop the module in `M`'s slot but keep its handle. Returns whether a
    /// running module was stopped.
    pub async fn stop<M: Registered>(&mut self) -> bool {
        let Some(handle) = M::slot_mut(self).as_mut() else {
            return false;
        };
        if handle.state != ModuleState::Running {
            return false;
        }
        handle.state = ModuleState::Stopped;
        let module = Arc::clone(&handle.module);
        if let Err(err) = module.stop().await {
            warn!(module = %M::KIND, error = %err, "module stop failed");
        }
        info!(module = %M::KIND, "module stopped");
        self.publish_state(M::KIND, ModuleState::Stopped, module.detail());
        true
    }

    /// Stop every running module, last cascade step first.
    pub async fn stop_all(&mut self) {
        self.stop::<WatcherModule>().await;
        self.stop::<AutoDownloader>().await;
        self.stop::<TorrentClientModule>().await;
        self.stop::<MediaPlayers>().await;
        self.stop::<AutoScanner>().await;
        self.stop::<UpdateChecker>().await;
    }

    /// Set the enabled flag on `M`'s handle. Returns `false` if the slot is empty.
    pub fn set_enabled<M: Registered>(&mut self, enabled: bool) -> bool {
        let Some(handle) = M::slot_mut(self).as_mut() else {
            return false;
        };
        handle.enabled = enabled;
        handle.module.set_enabled(enabled);
        true
    }

    /// Shared reference to the module in `M`'s slot.
    #[must_use]
    pub fn get<M: Registered>(&self) -> Option<Arc<M>> {
        M::slot(self).as_ref().map(|handle| Arc::clone(&handle.module))
    }

    /// Status of every occupied slot.
    #[must_use]
    pub fn status(&self) -> BTreeMap<ModuleKind, ModuleStatus> {
        let mut status = BTreeMap::new();
        collect_status(&mut status, &self.update_checker);
        collect_status(&mut status, &self.auto_scanner);
        collect_status(&mut status, &self.media_players);
        collect_status(&mut status, &self.torrent_client);
        collect_status(&mut status, &self.auto_downloader);
        collect_status(&mut status, &self.library_watcher);
        status
    }

    /// Number of modules in the running state.
    #[must_use]
    pub fn running_count(&self) -> usize {
        self.status()
            .values()
            .filter(|status| status.state == ModuleState::Running)
            .count()
    }

    async fn stop_handle<M: Registered>(&self, handle: ModuleHandle<M>) {
        if handle.state == ModuleState::Running {
            if let Err(err) = handle.module.stop().await {
                warn!(module = %M::KIND, error = %err, "module stop failed");
            }
            info!(module = %M::KIND, "module stopped");
            self.publish_state(M::KIND, ModuleState::Stopped, handle.module.detail());
        }
    }

    fn publish_state(&self, module: ModuleKind, state: ModuleState, detail: Option<String>) {
        self.events.publish(Event::ModuleStateChanged {
            module,
            state,
            detail,
        });
        self.metrics
            .set_modules_running(i64::try_from(self.running_count()).unwrap_or(i64::MAX));
    }
}

fn collect_status<M: Registered>(
    status: &mut BTreeMap<ModuleKind, ModuleStatus>,
    slot: &Option<ModuleHandle<M>>,
) {
    if let Some(handle) = slot {
        status.insert(
            M::KIND,
            ModuleStatus {
                state: handle.state,
                enabled: handle.enabled,
            },
        );
    }
}
