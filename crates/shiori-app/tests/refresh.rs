mod common;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, anyhow};
use common::{Harness, same_client};
use serde_json::json;
use shiori_app::modules::{
    AutoDownloader, MediaPlayers, TorrentClientModule, UpdateChecker, WatcherModule,
};
use shiori_app::{REFRESH_ORDER, RefreshStep, StepOutcome};
use shiori_config::{Account, SettingsPayload, SettingsStore, TorrentProvider};
use shiori_events::{Event, ModuleKind, ModuleState};
use shiori_library::AutoScanner;
use shiori_test_support::fixtures::{full_settings, library_settings};
use tokio::time::timeout;

#[tokio::test]
async fn fresh_data_dir_leaves_settings_dependent_modules_absent() -> Result<()> {
    let harness = Harness::started().await?;
    assert!(harness.store.get_settings().await.is_err());

    let report = harness.app.refresh_modules().await?;
    for step in REFRESH_ORDER {
        assert!(
            matches!(report.outcome(step), Some(StepOutcome::Skipped { .. })),
            "{step} should be skipped"
        );
    }

    let status = harness.app.module_status().await;
    assert_eq!(
        status.keys().copied().collect::<Vec<_>>(),
        vec![
            ModuleKind::UpdateChecker,
            ModuleKind::AutoScanner,
            ModuleKind::AutoDownloader,
        ]
    );
    assert!(harness.app.module::<WatcherModule>().await.is_none());
    assert!(harness.app.module::<TorrentClientModule>().await.is_none());
    assert!(harness.app.module::<MediaPlayers>().await.is_none());
    assert_eq!(harness.metrics.snapshot().settings_refresh_total, 1);
    Ok(())
}

#[tokio::test]
async fn settings_write_binds_watcher_scanner_and_torrent_client() -> Result<()> {
    let harness = Harness::started().await?;
    let library = harness.sandbox.library("anime")?;
    let mut stream = harness.events.subscribe(None);

    let stored = harness.app.save_settings(full_settings(&library)).await?;
    assert_eq!(stored.library_path(), Some(library.display().to_string().as_str()));

    let watcher = harness
        .app
        .module::<WatcherModule>()
        .await
        .ok_or_else(|| anyhow!("watcher missing"))?;
    assert_eq!(watcher.path(), library.as_path());
    assert!(watcher.is_watching());
    let status = harness.app.module_status().await;
    assert_eq!(
        status.get(&ModuleKind::LibraryWatcher).map(|status| status.state),
        Some(ModuleState::Running)
    );

    let scanner = harness
        .app
        .module::<AutoScanner>()
        .await
        .ok_or_else(|| anyhow!("scanner missing"))?;
    assert!(scanner.is_enabled());
    assert_eq!(scanner.library_path(), Some(library.clone()));

    let torrent = harness
        .app
        .module::<TorrentClientModule>()
        .await
        .ok_or_else(|| anyhow!("torrent client missing"))?;
    let downloader = harness
        .app
        .module::<AutoDownloader>()
        .await
        .ok_or_else(|| anyhow!("downloader missing"))?;
    let bound = downloader
        .torrent_client()
        .ok_or_else(|| anyhow!("downloader has no client"))?;
    assert!(same_client(&torrent.client(), &bound));
    assert_eq!(downloader.provider(), TorrentProvider::Nyaa);
    assert_eq!(downloader.settings().map(|settings| settings.rules.len()), Some(1));

    let kinds: Vec<&str> = stream
        .drain_ready()
        .iter()
        .map(|envelope| envelope.event.kind())
        .collect();
    assert_eq!(kinds.first(), Some(&"settings_changed"));
    Ok(())
}

#[tokio::test]
async fn unreadable_library_path_leaves_watcher_absent() -> Result<()> {
    let harness = Harness::started().await?;
    let payload = SettingsPayload {
        library: Some(library_settings(&harness.sandbox.missing_path())),
        ..SettingsPayload::default()
    };
    harness.store.upsert_settings(payload).await?;

    let report = harness.app.refresh_modules().await?;
    assert!(matches!(
        report.outcome(RefreshStep::LibraryWatcher),
        Some(StepOutcome::Failed { .. })
    ));
    assert_eq!(report.outcome(RefreshStep::FeatureFlags), Some(&StepOutcome::Applied));
    assert!(harness.app.module::<WatcherModule>().await.is_none());
    assert!(
        !harness
            .app
            .module_status()
            .await
            .contains_key(&ModuleKind::LibraryWatcher)
    );
    Ok(())
}

#[tokio::test]
async fn malformed_stored_section_fails_only_its_own_step() -> Result<()> {
    let harness = Harness::started().await?;
    let library = harness.sandbox.library("anime")?;
    harness.store.upsert_settings(full_settings(&library)).await?;

    let database = harness.store.database();
    let mut row = database
        .get_settings()
        .await?
        .ok_or_else(|| anyhow!("settings row missing"))?;
    row.media_player = Some(json!({ "vlcPort": "not-a-port" }));
    database.upsert_settings(&row).await?;
    let mut stream = harness.events.subscribe(None);

    let report = harness.app.refresh_modules().await?;
    assert_eq!(report.failed_steps(), vec![RefreshStep::MediaPlayers]);
    for step in [
        RefreshStep::FeatureFlags,
        RefreshStep::TorrentClient,
        RefreshStep::AutoDownloader,
        RefreshStep::LibraryWatcher,
    ] {
        assert_eq!(report.outcome(step), Some(&StepOutcome::Applied), "{step}");
    }

    assert!(harness.app.module::<MediaPlayers>().await.is_none());
    assert!(harness.app.module::<TorrentClientModule>().await.is_some());
    let watcher = harness
        .app
        .module::<WatcherModule>()
        .await
        .ok_or_else(|| anyhow!("watcher missing"))?;
    assert!(watcher.is_watching());
    assert_eq!(
        harness
            .app
            .module_status()
            .await
            .get(&ModuleKind::LibraryWatcher)
            .map(|status| status.state),
        Some(ModuleState::Running)
    );

    let degraded = stream.drain_ready().into_iter().find_map(|envelope| match envelope.event {
        Event::HealthChanged { degraded } => Some(degraded),
        _ => None,
    });
    assert_eq!(degraded, Some(vec!["media_players".to_string()]));
    Ok(())
}

#[tokio::test]
async fn missing_library_section_keeps_flags_and_watcher() -> Result<()> {
    let harness = Harness::started().await?;
    let library = harness.sandbox.library("anime")?;
    let mut section = library_settings(&library);
    section.disable_update_check = true;
    harness
        .app
        .save_settings(SettingsPayload {
            library: Some(section),
            ..SettingsPayload::default()
        })
        .await?;
    let before = harness
        .app
        .module::<WatcherModule>()
        .await
        .and_then(|watcher| watcher.watch_id());

    harness.app.save_settings(SettingsPayload::default()).await?;

    let checker = harness
        .app
        .module::<UpdateChecker>()
        .await
        .ok_or_else(|| anyhow!("update checker missing"))?;
    assert!(!checker.is_enabled());
    let scanner = harness
        .app
        .module::<AutoScanner>()
        .await
        .ok_or_else(|| anyhow!("scanner missing"))?;
    assert!(scanner.is_enabled());
    let after = harness
        .app
        .module::<WatcherModule>()
        .await
        .and_then(|watcher| watcher.watch_id());
    assert!(before.is_some());
    assert_eq!(before, after);
    Ok(())
}

#[tokio::test]
async fn changing_library_path_stops_old_watcher_before_starting_new() -> Result<()> {
    let harness = Harness::started().await?;
    let first = harness.sandbox.library("first")?;
    let second = harness.sandbox.library("second")?;

    let apply = |path: PathBuf| SettingsPayload {
        library: Some(library_settings(&path)),
        ..SettingsPayload::default()
    };
    harness.app.save_settings(apply(first.clone())).await?;
    let first_watcher = harness
        .app
        .module::<WatcherModule>()
        .await
        .ok_or_else(|| anyhow!("first watcher missing"))?;
    let first_id = first_watcher.watch_id();
    assert!(first_id.is_some());

    let mut stream = harness.events.subscribe(harness.events.last_event_id());
    harness.app.save_settings(apply(second.clone())).await?;
    let second_watcher = harness
        .app
        .module::<WatcherModule>()
        .await
        .ok_or_else(|| anyhow!("second watcher missing"))?;

    assert!(!first_watcher.is_watching());
    assert!(second_watcher.is_watching());
    assert!(second_watcher.watch_id().is_some());
    assert_ne!(first_id, second_watcher.watch_id());
    assert_eq!(second_watcher.path(), second.as_path());

    let watcher_events: Vec<(ModuleState, Option<String>)> = stream
        .drain_ready()
        .into_iter()
        .filter_map(|envelope| match envelope.event {
            Event::ModuleStateChanged {
                module: ModuleKind::LibraryWatcher,
                state,
                detail,
            } => Some((state, detail)),
            _ => None,
        })
        .collect();
    assert_eq!(
        watcher_events,
        vec![
            (ModuleState::Stopped, Some(first.display().to_string())),
            (ModuleState::Running, Some(second.display().to_string())),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn empty_library_path_removes_watcher() -> Result<()> {
    let harness = Harness::started().await?;
    let library = harness.sandbox.library("anime")?;
    harness.app.save_settings(full_settings(&library)).await?;
    assert!(harness.app.module::<WatcherModule>().await.is_some());

    let mut payload = full_settings(&library);
    if let Some(section) = payload.library.as_mut() {
        section.library_path = "   ".to_string();
    }
    harness.app.save_settings(payload).await?;
    assert!(harness.app.module::<WatcherModule>().await.is_none());
    Ok(())
}

#[tokio::test]
async fn torrent_factory_failure_keeps_previous_client() -> Result<()> {
    let harness = Harness::started().await?;
    let library = harness.sandbox.library("anime")?;
    harness.app.save_settings(full_settings(&library)).await?;
    let downloader = harness
        .app
        .module::<AutoDownloader>()
        .await
        .ok_or_else(|| anyhow!("downloader missing"))?;
    let original = downloader
        .torrent_client()
        .ok_or_else(|| anyhow!("client missing"))?;

    harness.factory.reject();
    let stored = harness.store.get_settings().await?;
    let report = harness.app.apply_settings(&stored).await;
    assert!(matches!(
        report.outcome(RefreshStep::TorrentClient),
        Some(StepOutcome::Failed { .. })
    ));
    assert_eq!(report.outcome(RefreshStep::LibraryWatcher), Some(&StepOutcome::Applied));
    let current = downloader
        .torrent_client()
        .ok_or_else(|| anyhow!("client dropped"))?;
    assert!(same_client(&original, &current));
    assert_eq!(harness.factory.built(), 1);
    Ok(())
}

#[tokio::test]
async fn account_hydration_runs_only_for_complete_accounts() -> Result<()> {
    let harness = Harness::started().await?;
    harness
        .store
        .upsert_account(Account {
            username: "shiori".into(),
            token: String::new(),
            viewer: Some(json!({ "id": 1 })),
        })
        .await?;
    let report = harness.app.refresh_modules().await?;
    assert!(matches!(
        report.outcome(RefreshStep::RemoteAccount),
        Some(StepOutcome::Skipped { .. })
    ));
    assert!(harness.catalog.refreshed().is_empty());

    harness
        .store
        .upsert_account(Account {
            username: "shiori".into(),
            token: "token-1".into(),
            viewer: Some(json!({ "id": 1 })),
        })
        .await?;
    let mut stream = harness.events.subscribe(harness.events.last_event_id());
    let report = harness.app.refresh_modules().await?;
    assert_eq!(report.outcome(RefreshStep::RemoteAccount), Some(&StepOutcome::Applied));
    assert_eq!(harness.catalog.refreshed(), vec!["shiori".to_string()]);
    assert_eq!(harness.catalog.tokens(), vec![Some("token-1".to_string())]);
    assert!(stream.drain_ready().iter().any(|envelope| matches!(
        &envelope.event,
        Event::AccountHydrated { username } if username == "shiori"
    )));

    harness.catalog.fail_next();
    let report = harness.app.refresh_modules().await?;
    assert!(matches!(
        report.outcome(RefreshStep::RemoteAccount),
        Some(StepOutcome::Failed { .. })
    ));
    Ok(())
}

#[tokio::test]
async fn library_changes_trigger_a_scan() -> Result<()> {
    let harness = Harness::started().await?;
    let library = harness.sandbox.library("anime")?;
    harness.app.save_settings(full_settings(&library)).await?;

    std::fs::write(library.join("episode-01.mkv"), b"frames")?;
    timeout(Duration::from_secs(10), harness.scans.wait_for_scan()).await?;
    assert_eq!(harness.scans.scans().first(), Some(&library));
    Ok(())
}

#[tokio::test]
async fn catalog_token_updates_are_forwarded() -> Result<()> {
    let harness = Harness::new().await?;
    harness.app.update_catalog_token(Some("fresh".into()));
    harness.app.update_catalog_token(None);
    assert_eq!(harness.catalog.tokens(), vec![Some("fresh".to_string()), None]);
    Ok(())
}
