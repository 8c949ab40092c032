//! Production wiring of the lifecycle hooks and the binary entry point.

use std::sync::Arc;

use async_trait::async_trait;
use shiori_config::{ConfigOptions, ConfigService, SettingsStore};
use shiori_events::EventBus;
use shiori_library::EventScanJob;
use shiori_telemetry::{GlobalContextGuard, LogFormat, LoggingConfig, Metrics, init_logging};
use tracing::{info, warn};

use crate::app::{App, AppDependencies};
use crate::error::{AppError, AppResult};
use crate::lifecycle::{
    ExitStatus, LifecycleController, LifecycleHooks, LifecycleState, ServeOutcome, render_error,
};
use crate::modules::{AnilistCatalog, QbittorrentFactory};
use crate::updater::{SelfUpdater, StagedBinaryUpdate};

/// Hooks that bootstrap the real services from [`ConfigOptions`].
pub struct AppHooks {
    options: ConfigOptions,
    events: EventBus,
    metrics: Metrics,
    app: Option<App>,
}

impl AppHooks {
    /// Hooks for a process configured by `options`.
    #[must_use]
    pub const fn new(options: ConfigOptions, events: EventBus, metrics: Metrics) -> Self {
        Self {
            options,
            events,
            metrics,
            app: None,
        }
    }

    async fn build_app(&self) -> AppResult<App> {
        let store: Arc<dyn SettingsStore> = Arc::new(
            ConfigService::open(self.options.data_dir())
                .await
                .map_err(|err| AppError::config("config_service.open", err))?,
        );
        let catalog = AnilistCatalog::public().map_err(|source| AppError::Catalog {
            operation: "catalog.new",
            source,
        })?;
        let procedure = StagedBinaryUpdate::for_current_exe(self.options.data_dir())?;
        Ok(App::new(AppDependencies::new(
            store,
            Arc::new(catalog),
            Arc::new(QbittorrentFactory),
            Arc::new(EventScanJob::new(self.events.clone())),
            Arc::new(procedure),
            self.events.clone(),
            self.metrics.clone(),
        )))
    }
}

#[async_trait]
impl LifecycleHooks for AppHooks {
    async fn serve(&mut self) -> AppResult<ServeOutcome> {
        let built = self.build_app().await?;
        let app = self.app.insert(built);
        app.init_modules_once().await?;
        app.refresh_modules().await?;

        let updater = app.self_updater();
        let waiter = updater.started().ok_or(AppError::SignalAlreadyTaken)?;
        if let Some(delay) = self.options.self_update_after() {
            info!(delay_secs = delay.as_secs(), "self-update scheduled");
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                updater.start_self_update();
            });
        }

        info!("serving; waiting for the self-update signal");
        tokio::select! {
            fired = waiter.wait() => {
                if fired {
                    Ok(ServeOutcome::SelfUpdate)
                } else {
                    Ok(ServeOutcome::Shutdown)
                }
            }
            interrupted = tokio::signal::ctrl_c() => {
                if let Err(err) = interrupted {
                    warn!(error = %err, "interrupt listener failed");
                }
                info!("interrupt received");
                Ok(ServeOutcome::Shutdown)
            }
        }
    }

    async fn cleanup(&mut self) {
        if let Some(app) = self.app.take() {
            app.cleanup().await;
        }
    }

    async fn update(&mut self) -> AppResult<()> {
        let procedure = StagedBinaryUpdate::for_current_exe(self.options.data_dir())?;
        SelfUpdater::new(Arc::new(procedure), self.events.clone(), self.metrics.clone())
            .run()
            .await
    }
}

/// Boot the process described by `options` and run it to completion.
pub async fn run(options: ConfigOptions) -> ExitStatus {
    let logging = LoggingConfig {
        level: options.log_level(),
        format: LogFormat::from_name(options.log_format()),
        build_sha: option_env!("SHIORI_BUILD_SHA").unwrap_or("dev"),
    };
    if let Err(err) = init_logging(&logging) {
        eprintln!("{}", render_error(&AppError::telemetry("telemetry.init", err)));
        return ExitStatus::FAILURE;
    }
    let metrics = match Metrics::new() {
        Ok(metrics) => metrics,
        Err(err) => {
            eprintln!("{}", render_error(&AppError::telemetry("telemetry.metrics", err)));
            return ExitStatus::FAILURE;
        }
    };

    print_banner();
    let initial = LifecycleState::initial(options.update());
    let _context = GlobalContextGuard::new(initial.label());
    info!(
        data_dir = %options.data_dir().display(),
        update = options.update(),
        "shiori starting"
    );

    let events = EventBus::new();
    let hooks = AppHooks::new(options.clone(), events.clone(), metrics);
    let status = LifecycleController::new(hooks, options.update())
        .with_events(events)
        .run()
        .await;
    info!(code = status.code(), "shiori exiting");
    status
}

fn print_banner() {
    println!("Shiori v{}", env!("CARGO_PKG_VERSION"));
    println!("----------------------------------------");
}
