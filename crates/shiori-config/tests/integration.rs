use serde_json::json;
use shiori_config::{
    Account, ConfigError, ConfigService, LibrarySettings, MEDIA_PLAYER_SECTION, SettingsPayload,
    SettingsStore, TorrentSettings,
};
use shiori_data::Database;

async fn service() -> anyhow::Result<ConfigService> {
    Ok(ConfigService::from_database(Database::in_memory().await?))
}

#[tokio::test]
async fn fresh_store_reports_settings_not_found() -> anyhow::Result<()> {
    let service = service().await?;
    let err = service.get_settings().await.err();
    assert!(matches!(err, Some(ConfigError::SettingsNotFound)));
    Ok(())
}

#[tokio::test]
async fn upsert_then_get_returns_the_same_sections() -> anyhow::Result<()> {
    let service = service().await?;
    let payload = SettingsPayload {
        library: Some(LibrarySettings {
            library_path: "/media/anime".into(),
            auto_scan: true,
            ..LibrarySettings::default()
        }),
        torrent: Some(TorrentSettings {
            qbittorrent_username: "admin".into(),
            ..TorrentSettings::default()
        }),
        ..SettingsPayload::default()
    };

    let stored = service.upsert_settings(payload.clone()).await?;
    let loaded = service.get_settings().await?;
    assert_eq!(stored, loaded);
    assert_eq!(loaded.library, payload.library);
    assert_eq!(loaded.torrent, payload.torrent);
    assert!(loaded.media_player.is_none());

    let cleared = service
        .upsert_settings(SettingsPayload {
            library: None,
            ..payload
        })
        .await?;
    assert!(cleared.library.is_none());
    assert!(service.get_settings().await?.library.is_none());
    Ok(())
}

#[tokio::test]
async fn malformed_stored_section_still_loads_the_others() -> anyhow::Result<()> {
    let service = service().await?;
    service
        .upsert_settings(SettingsPayload {
            library: Some(LibrarySettings {
                library_path: "/media/anime".into(),
                ..LibrarySettings::default()
            }),
            ..SettingsPayload::default()
        })
        .await?;
    let mut row = service
        .database()
        .get_settings()
        .await?
        .ok_or_else(|| anyhow::anyhow!("settings row missing"))?;
    row.media_player = Some(json!({ "vlcPort": "not-a-port" }));
    service.database().upsert_settings(&row).await?;

    let loaded = service.get_settings().await?;
    assert_eq!(loaded.library_path(), Some("/media/anime"));
    assert!(loaded.media_player.is_none());
    assert!(loaded.fault(MEDIA_PLAYER_SECTION).is_some());
    Ok(())
}

#[tokio::test]
async fn account_with_empty_token_is_not_found() -> anyhow::Result<()> {
    let service = service().await?;
    service
        .upsert_account(Account {
            username: "shiori".into(),
            token: String::new(),
            viewer: Some(json!({ "name": "shiori", "avatar": null })),
        })
        .await?;

    let err = service.get_account().await.err();
    assert!(matches!(err, Some(ConfigError::AccountNotFound)));
    Ok(())
}

#[tokio::test]
async fn complete_account_is_returned_and_last_write_wins() -> anyhow::Result<()> {
    let service = service().await?;
    assert!(matches!(
        service.get_account().await.err(),
        Some(ConfigError::AccountNotFound)
    ));

    let first = Account {
        username: "first".into(),
        token: "token-one".into(),
        viewer: Some(json!({ "name": "first" })),
    };
    let second = Account {
        username: "second".into(),
        token: "token-two".into(),
        viewer: Some(json!({ "name": "second" })),
    };
    service.upsert_account(first).await?;
    service.upsert_account(second.clone()).await?;

    assert_eq!(service.get_account().await?, second);
    Ok(())
}

#[tokio::test]
async fn open_creates_database_under_data_dir() -> anyhow::Result<()> {
    let temp = tempfile::tempdir()?;
    let data_dir = temp.path().join("data");
    let service = ConfigService::open(&data_dir).await?;
    service.upsert_settings(SettingsPayload::default()).await?;
    service.close().await;
    assert!(shiori_data::database_path(&data_dir).exists());
    Ok(())
}
