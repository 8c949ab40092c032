//! Self-update coordinator.
//!
//! [`SelfUpdater::start_self_update`] runs the preparation phase in a detached
//! task and fires the one-shot signal when the update is ready to be applied.
//! [`SelfUpdater::run`] applies it synchronously and is what update mode calls.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use shiori_events::{Event, EventBus};
use shiori_telemetry::Metrics;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::{AppError, AppResult};
use crate::signal::{OneShotSignal, SignalWaiter};

/// Directory under the data directory where updates are staged.
pub const UPDATE_DIR: &str = "update";
/// File name of the staged binary.
pub const STAGED_BINARY: &str = "shiori";
/// Suffix of the checksum file next to the staged binary.
pub const CHECKSUM_SUFFIX: &str = ".sha256";

/// Fetch/verify/replace procedure behind the coordinator.
#[async_trait]
pub trait UpdateProcedure: Send + Sync {
    /// Make the update ready to apply. Success is the point of no return.
    async fn prepare(&self) -> AppResult<()>;

    /// Install the update and hand over to the new binary.
    async fn apply(&self) -> AppResult<()>;
}

/// Coordinates update attempts and owns the self-update signal.
pub struct SelfUpdater {
    procedure: Arc<dyn UpdateProcedure>,
    signal: Arc<OneShotSignal>,
    in_flight: Arc<AtomicBool>,
    events: EventBus,
    metrics: Metrics,
}

impl SelfUpdater {
    /// Coordinator around `procedure`.
    #[must_use]
    pub fn new(procedure: Arc<dyn UpdateProcedure>, events: EventBus, metrics: Metrics) -> Self {
        Self {
            procedure,
            signal: Arc::new(OneShotSignal::new()),
            in_flight: Arc::new(AtomicBool::new(false)),
            events,
            metrics,
        }
    }

    /// Apply the update synchronously.
    ///
    /// # Errors
    ///
    /// Returns the procedure's failure.
    pub async fn run(&self) -> AppResult<()> {
        self.procedure.apply().await
    }

    /// Begin an asynchronous update attempt.
    ///
    /// Returns `None` if an attempt is already in flight or the signal has
    /// already fired.
    pub fn start_self_update(&self) -> Option<JoinHandle<()>> {
        if self.signal.is_fired() {
            debug!("self-update already signalled; trigger ignored");
            return None;
        }
        if self.in_flight.swap(true, Ordering::AcqRel) {
            warn!("self-update attempt already in flight");
            return None;
        }
        let procedure = Arc::clone(&self.procedure);
        let signal = Arc::clone(&self.signal);
        let in_flight = Arc::clone(&self.in_flight);
        let events = self.events.clone();
        let metrics = self.metrics.clone();
        Some(tokio::spawn(async move {
            info!("self-update started");
            match procedure.prepare().await {
                Ok(()) => {
                    if signal.fire() {
                        metrics.inc_self_update_signal();
                        events.publish(Event::SelfUpdateStarted);
                        info!("self-update ready; signalling shutdown");
                    }
                    in_flight.store(false, Ordering::Release);
                }
                Err(err) => {
                    error!(error = %err, "self-update preparation failed");
                    in_flight.store(false, Ordering::Release);
                }
            }
        }))
    }

    /// Wait handle for the self-update signal. Only the first call gets one.
    #[must_use]
    pub fn started(&self) -> Option<SignalWaiter> {
        self.signal.take_waiter()
    }

    /// Whether the self-update signal has fired.
    #[must_use]
    pub fn has_started(&self) -> bool {
        self.signal.is_fired()
    }

    /// Whether an attempt is still preparing.
    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}

/// Update from a binary staged under `<data_dir>/update/` with a SHA-256
/// checksum file next to it.
#[derive(Debug, Clone)]
pub struct StagedBinaryUpdate {
    staged: PathBuf,
    checksum: PathBuf,
    target: PathBuf,
    relaunch: bool,
}

impl StagedBinaryUpdate {
    /// Staged update replacing `target` and relaunching it afterwards.
    #[must_use]
    pub fn new(data_dir: &Path, target: impl Into<PathBuf>) -> Self {
        let staged = data_dir.join(UPDATE_DIR).join(STAGED_BINARY);
        let checksum = PathBuf::from(format!("{}{CHECKSUM_SUFFIX}", staged.display()));
        Self {
            staged,
            checksum,
            target: target.into(),
            relaunch: true,
        }
    }

    /// Staged update for the running executable.
    ///
    /// # Errors
    ///
    /// Returns an error if the current executable path cannot be resolved.
    pub fn for_current_exe(data_dir: &Path) -> AppResult<Self> {
        let target = std::env::current_exe()
            .map_err(|source| AppError::io("update.current_exe", None, source))?;
        Ok(Self::new(data_dir, target))
    }

    /// Skip relaunching the replaced binary.
    #[must_use]
    pub const fn without_relaunch(mut self) -> Self {
        self.relaunch = false;
        self
    }

    /// Location of the staged binary.
    #[must_use]
    pub fn staged_path(&self) -> &Path {
        &self.staged
    }

    /// Location of the checksum file.
    #[must_use]
    pub fn checksum_path(&self) -> &Path {
        &self.checksum
    }

    async fn verify(&self) -> AppResult<Vec<u8>> {
        let binary = match tokio::fs::read(&self.staged).await {
            Ok(binary) => binary,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(AppError::UpdateUnavailable {
                    path: self.staged.clone(),
                });
            }
            Err(source) => {
                return Err(AppError::io("update.read", Some(self.staged.clone()), source));
            }
        };
        let expected = tokio::fs::read_to_string(&self.checksum)
            .await
            .map_err(|source| AppError::io("update.checksum", Some(self.checksum.clone()), source))?;
        let expected = expected.split_whitespace().next().unwrap_or_default();
        let actual = hex::encode(Sha256::digest(&binary));
        if !actual.eq_ignore_ascii_case(expected) {
            return Err(AppError::UpdateChecksumMismatch {
                path: self.staged.clone(),
            });
        }
        Ok(binary)
    }

    async fn replace_target(&self, binary: &[u8]) -> AppResult<()> {
        let incoming = self.target.with_extension("new");
        tokio::fs::write(&incoming, binary)
            .await
            .map_err(|source| AppError::io("update.write", Some(incoming.clone()), source))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&incoming, std::fs::Permissions::from_mode(0o755))
                .await
                .map_err(|source| AppError::io("update.chmod", Some(incoming.clone()), source))?;
        }
        tokio::fs::rename(&incoming, &self.target)
            .await
            .map_err(|source| AppError::io("update.swap", Some(self.target.clone()), source))?;
        for leftover in [&self.staged, &self.checksum] {
            if let Err(err) = tokio::fs::remove_file(leftover).await {
                warn!(path = %leftover.display(), error = %err, "could not remove staged file");
            }
        }
        Ok(())
    }

    fn relaunch(&self) -> AppResult<()> {
        let args: Vec<String> = std::env::args()
            .skip(1)
            .filter(|arg| arg != "--update")
            .collect();
        std::process::Command::new(&self.target)
            .args(&args)
            .env_remove("SHIORI_UPDATE")
            .spawn()
            .map_err(|source| AppError::io("update.relaunch", Some(self.target.clone()), source))?;
        info!(target = %self.target.display(), "relaunched updated binary");
        Ok(())
    }
}

#[async_trait]
impl UpdateProcedure for StagedBinaryUpdate {
    async fn prepare(&self) -> AppResult<()> {
        self.verify().await.map(|_| ())
    }

    async fn apply(&self) -> AppResult<()> {
        let binary = self.verify().await?;
        self.replace_target(&binary).await?;
        info!(target = %self.target.display(), "binary replaced");
        if self.relaunch {
            self.relaunch()?;
        }
        Ok(())
    }
}
