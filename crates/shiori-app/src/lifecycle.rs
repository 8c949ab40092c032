//! Process lifecycle state machine.
//!
//! # Design
//!
//! - The two process modes are states of an explicit machine; [`transition`] is
//!   a pure table so every edge can be tested without running the real update.
//! - [`LifecycleController`] drives a [`LifecycleHooks`] implementation and owns
//!   the exit status. Cleanup always completes before the controller enters
//!   [`LifecycleState::Updating`].

use std::error::Error;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use shiori_events::{Event, EventBus};
use shiori_telemetry::record_app_mode;
use tracing::{error, info};

use crate::error::{AppError, AppResult};

/// Pause between a finished update and process exit so buffered output can flush.
pub const UPDATE_GRACE_PERIOD: Duration = Duration::from_secs(10);

/// States of the process lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// Modules are bootstrapped and the controller waits for the self-update signal.
    Serving,
    /// The self-update signal fired; cleanup is pending.
    UpdateRequested,
    /// The update procedure runs.
    Updating,
    /// The process is about to exit.
    Terminated,
}

impl LifecycleState {
    /// Initial state for a process started with or without the update flag.
    #[must_use]
    pub const fn initial(update_mode: bool) -> Self {
        if update_mode {
            Self::Updating
        } else {
            Self::Serving
        }
    }

    /// Stable label used in logs and events.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Serving => "serving",
            Self::UpdateRequested => "update_requested",
            Self::Updating => "updating",
            Self::Terminated => "terminated",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Inputs accepted by the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    /// The self-update signal fired while serving.
    SelfUpdateSignalled,
    /// Every module was stopped and persistence closed.
    CleanupCompleted,
    /// The update procedure returned, successfully or not.
    UpdateFinished,
    /// Serving ended without an update (interrupt or bootstrap failure).
    ShutdownRequested,
}

impl LifecycleEvent {
    /// Stable label used in logs and errors.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::SelfUpdateSignalled => "self_update_signalled",
            Self::CleanupCompleted => "cleanup_completed",
            Self::UpdateFinished => "update_finished",
            Self::ShutdownRequested => "shutdown_requested",
        }
    }
}

/// Transition table of the lifecycle.
///
/// # Errors
///
/// Returns [`AppError::InvalidTransition`] for any pair not in the table.
pub const fn transition(
    state: LifecycleState,
    event: LifecycleEvent,
) -> AppResult<LifecycleState> {
    match (state, event) {
        (LifecycleState::Serving, LifecycleEvent::SelfUpdateSignalled) => {
            Ok(LifecycleState::UpdateRequested)
        }
        (LifecycleState::Serving, LifecycleEvent::ShutdownRequested)
        | (LifecycleState::Updating, LifecycleEvent::UpdateFinished) => {
            Ok(LifecycleState::Terminated)
        }
        (LifecycleState::UpdateRequested, LifecycleEvent::CleanupCompleted) => {
            Ok(LifecycleState::Updating)
        }
        _ => Err(AppError::InvalidTransition {
            from: state.label(),
            event: event.label(),
        }),
    }
}

/// Why serving mode returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeOutcome {
    /// The self-update signal fired.
    SelfUpdate,
    /// The process was asked to shut down.
    Shutdown,
}

/// Side effects the controller drives.
#[async_trait]
pub trait LifecycleHooks: Send {
    /// Bootstrap modules, apply settings and block until serving should end.
    async fn serve(&mut self) -> AppResult<ServeOutcome>;

    /// Stop every module and close persistence.
    async fn cleanup(&mut self);

    /// Run the update procedure synchronously.
    async fn update(&mut self) -> AppResult<()>;
}

/// Process exit status chosen by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitStatus(u8);

impl ExitStatus {
    /// Normal shutdown or successful update.
    pub const SUCCESS: Self = Self(0);
    /// Failed update or failed bootstrap.
    pub const FAILURE: Self = Self(1);

    /// Numeric exit code.
    #[must_use]
    pub const fn code(self) -> u8 {
        self.0
    }

    /// Whether the status reports success.
    #[must_use]
    pub const fn is_success(self) -> bool {
        self.0 == 0
    }
}

impl From<ExitStatus> for std::process::ExitCode {
    fn from(status: ExitStatus) -> Self {
        Self::from(status.0)
    }
}

/// Sequential driver of the lifecycle.
pub struct LifecycleController<H> {
    hooks: H,
    state: LifecycleState,
    grace_period: Duration,
    events: Option<EventBus>,
}

impl<H: LifecycleHooks> LifecycleController<H> {
    /// Controller starting in update mode when `update_mode` is set.
    #[must_use]
    pub const fn new(hooks: H, update_mode: bool) -> Self {
        Self {
            hooks,
            state: LifecycleState::initial(update_mode),
            grace_period: UPDATE_GRACE_PERIOD,
            events: None,
        }
    }

    /// Override the post-update pause.
    #[must_use]
    pub const fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    /// Publish every transition on `events`.
    #[must_use]
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> LifecycleState {
        self.state
    }

    /// Access the hooks, mainly for inspection after [`Self::run`].
    #[must_use]
    pub const fn hooks(&self) -> &H {
        &self.hooks
    }

    /// Drive the machine until it terminates.
    pub async fn run(&mut self) -> ExitStatus {
        let mut status = ExitStatus::SUCCESS;
        record_app_mode(self.state.label());
        loop {
            let event = match self.state {
                LifecycleState::Terminated => break,
                LifecycleState::Serving => match self.hooks.serve().await {
                    Ok(ServeOutcome::SelfUpdate) => LifecycleEvent::SelfUpdateSignalled,
                    Ok(ServeOutcome::Shutdown) => {
                        self.hooks.cleanup().await;
                        LifecycleEvent::ShutdownRequested
                    }
                    Err(err) => {
                        error!(error = %render_error(&err), "serving failed");
                        self.hooks.cleanup().await;
                        status = ExitStatus::FAILURE;
                        LifecycleEvent::ShutdownRequested
                    }
                },
                LifecycleState::UpdateRequested => {
                    self.hooks.cleanup().await;
                    LifecycleEvent::CleanupCompleted
                }
                LifecycleState::Updating => {
                    println!("Running in update mode");
                    if let Err(err) = self.hooks.update().await {
                        let rendered = render_error(&err);
                        error!(error = %rendered, "update failed");
                        println!("{rendered}");
                        status = ExitStatus::FAILURE;
                    }
                    println!(
                        "Shutting down in {} seconds...",
                        self.grace_period.as_secs()
                    );
                    tokio::time::sleep(self.grace_period).await;
                    LifecycleEvent::UpdateFinished
                }
            };
            if let Err(err) = self.advance(event) {
                error!(error = %render_error(&err), "lifecycle stalled");
                return ExitStatus::FAILURE;
            }
        }
        status
    }

    fn advance(&mut self, event: LifecycleEvent) -> AppResult<()> {
        let next = transition(self.state, event)?;
        info!(from = %self.state, to = %next, event = event.label(), "lifecycle transition");
        if let Some(events) = &self.events {
            events.publish(Event::LifecycleTransition {
                from: self.state.label().to_string(),
                to: next.label().to_string(),
            });
        }
        record_app_mode(next.label());
        self.state = next;
        Ok(())
    }
}

/// Render an error with its whole source chain on one line.
#[must_use]
pub fn render_error(err: &dyn Error) -> String {
    let mut rendered = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}
