//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Exposes the counters and gauges relevant to the lifecycle core.

use std::sync::Arc;

use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{Result, TelemetryError};

/// Prometheus-backed metrics registry shared across services.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    settings_refresh_total: IntCounter,
    settings_refresh_steps_total: IntCounterVec,
    library_notifications_total: IntCounter,
    library_scans_total: IntCounter,
    self_update_signals_total: IntCounter,
    modules_running: IntGauge,
}

/// Snapshot of selected gauges and counters for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Number of settings cascades executed.
    pub settings_refresh_total: u64,
    /// Filesystem notifications forwarded to the scanner.
    pub library_notifications_total: u64,
    /// Library scans dispatched by the scanner.
    pub library_scans_total: u64,
    /// Times the self-update signal fired.
    pub self_update_signals_total: u64,
    /// Modules currently in the running state.
    pub modules_running: i64,
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be
    /// registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let settings_refresh_total = counter(
            "settings_refresh_total",
            "Settings cascades applied to the module registry",
        )?;
        let settings_refresh_steps_total = IntCounterVec::new(
            Opts::new(
                "settings_refresh_steps_total",
                "Settings cascade steps executed by outcome",
            ),
            &["step", "outcome"],
        )
        .map_err(|source| TelemetryError::MetricsCollector {
            name: "settings_refresh_steps_total",
            source,
        })?;
        let library_notifications_total = counter(
            "library_notifications_total",
            "Filesystem change notifications forwarded to the auto-scanner",
        )?;
        let library_scans_total =
            counter("library_scans_total", "Library scans started by the auto-scanner")?;
        let self_update_signals_total = counter(
            "self_update_signals_total",
            "Self-update completion signals fired",
        )?;
        let modules_running = IntGauge::with_opts(Opts::new(
            "modules_running",
            "Module handles currently running",
        ))
        .map_err(|source| TelemetryError::MetricsCollector {
            name: "modules_running",
            source,
        })?;

        register(&registry, "settings_refresh_total", &settings_refresh_total)?;
        register(
            &registry,
            "settings_refresh_steps_total",
            &settings_refresh_steps_total,
        )?;
        register(
            &registry,
            "library_notifications_total",
            &library_notifications_total,
        )?;
        register(&registry, "library_scans_total", &library_scans_total)?;
        register(
            &registry,
            "self_update_signals_total",
            &self_update_signals_total,
        )?;
        register(&registry, "modules_running", &modules_running)?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                settings_refresh_total,
                settings_refresh_steps_total,
                library_notifications_total,
                library_scans_total,
                self_update_signals_total,
                modules_running,
            }),
        })
    }

    /// Increment the settings cascade counter.
    pub fn inc_settings_refresh(&self) {
        self.inner.settings_refresh_total.inc();
    }

    /// Record the outcome of a single cascade step.
    pub fn inc_refresh_step(&self, step: &str, outcome: &str) {
        self.inner
            .settings_refresh_steps_total
            .with_label_values(&[step, outcome])
            .inc();
    }

    /// Increment the forwarded filesystem notification counter.
    pub fn inc_library_notification(&self) {
        self.inner.library_notifications_total.inc();
    }

    /// Increment the dispatched library scan counter.
    pub fn inc_library_scan(&self) {
        self.inner.library_scans_total.inc();
    }

    /// Increment the self-update signal counter.
    pub fn inc_self_update_signal(&self) {
        self.inner.self_update_signals_total.inc();
    }

    /// Set the running module gauge.
    pub fn set_modules_running(&self, count: i64) {
        self.inner.modules_running.set(count);
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|source| TelemetryError::MetricsEncode { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::MetricsUtf8 { source })
    }

    /// Take a point-in-time snapshot of the most relevant gauges and counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            settings_refresh_total: self.inner.settings_refresh_total.get(),
            library_notifications_total: self.inner.library_notifications_total.get(),
            library_scans_total: self.inner.library_scans_total.get(),
            self_update_signals_total: self.inner.self_update_signals_total.get(),
            modules_running: self.inner.modules_running.get(),
        }
    }
}

fn counter(name: &'static str, help: &str) -> Result<IntCounter> {
    IntCounter::with_opts(Opts::new(name, help))
        .map_err(|source| TelemetryError::MetricsCollector { name, source })
}

fn register<C>(registry: &Registry, name: &'static str, collector: &C) -> Result<()>
where
    C: prometheus::core::Collector + Clone + 'static,
{
    registry
        .register(Box::new(collector.clone()))
        .map_err(|source| TelemetryError::MetricsRegister { name, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_snapshot_reflects_updates() -> Result<()> {
        let metrics = Metrics::new()?;
        metrics.inc_settings_refresh();
        metrics.inc_refresh_step("library_watcher", "applied");
        metrics.inc_refresh_step("torrent_client", "skipped");
        metrics.inc_library_notification();
        metrics.inc_library_notification();
        metrics.inc_library_scan();
        metrics.inc_self_update_signal();
        metrics.set_modules_running(3);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.settings_refresh_total, 1);
        assert_eq!(snapshot.library_notifications_total, 2);
        assert_eq!(snapshot.library_scans_total, 1);
        assert_eq!(snapshot.self_update_signals_total, 1);
        assert_eq!(snapshot.modules_running, 3);

        let rendered = metrics.render()?;
        assert!(rendered.contains("settings_refresh_steps_total"));
        assert!(rendered.contains("outcome=\"skipped\""));
        assert!(rendered.contains("modules_running 3"));
        Ok(())
    }

    #[test]
    fn registries_are_independent() -> Result<()> {
        let first = Metrics::new()?;
        let second = Metrics::new()?;
        first.inc_library_scan();
        assert_eq!(second.snapshot().library_scans_total, 0);
        Ok(())
    }
}
