#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Shiori service lifecycle core.
//!
//! Layout: `registry.rs` (typed module slots), `cascade.rs` (settings refresh),
//! `app.rs` (facade), `lifecycle.rs` (process state machine), `updater.rs`
//! (self-update coordinator), `bootstrap.rs` (production wiring).

/// Application facade.
pub mod app;
/// Production wiring and entry point.
pub mod bootstrap;
/// Settings refresh cascade.
pub mod cascade;
/// Error types.
pub mod error;
/// Process lifecycle state machine.
pub mod lifecycle;
/// Feature modules.
pub mod modules;
/// Module registry.
pub mod registry;
/// Single-fire signal primitive.
pub mod signal;
/// Self-update coordinator.
pub mod updater;

pub use app::{App, AppDependencies};
pub use bootstrap::{AppHooks, run};
pub use cascade::{REFRESH_ORDER, RefreshReport, RefreshStep, SettingsCascade, StepOutcome};
pub use error::{AppError, AppResult, ModuleError, ModuleResult};
pub use lifecycle::{
    ExitStatus, LifecycleController, LifecycleEvent, LifecycleHooks, LifecycleState,
    ServeOutcome, UPDATE_GRACE_PERIOD, transition,
};
pub use registry::{Module, ModuleHandle, ModuleRegistry, ModuleStatus, Registered};
pub use signal::{OneShotSignal, SignalWaiter};
pub use updater::{SelfUpdater, StagedBinaryUpdate, UpdateProcedure};
