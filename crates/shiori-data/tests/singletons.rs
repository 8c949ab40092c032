use anyhow::Result;
use chrono::{TimeZone, Utc};
use serde_json::json;
use shiori_data::{ACCOUNT_ROW_ID, AccountRow, Database, SETTINGS_ROW_ID, SettingsRow};

fn settings_row(library_path: &str) -> SettingsRow {
    SettingsRow {
        id: 42,
        updated_at: Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).single().unwrap_or_default(),
        library: Some(json!({ "libraryPath": library_path, "autoScan": true })),
        media_player: None,
        torrent: Some(json!({ "qbittorrentHost": "127.0.0.1" })),
        auto_downloader: None,
    }
}

#[tokio::test]
async fn fresh_database_has_no_settings() -> Result<()> {
    let database = Database::in_memory().await?;
    assert!(database.get_settings().await?.is_none());
    assert!(database.get_account().await?.is_none());
    Ok(())
}

#[tokio::test]
async fn settings_upsert_is_a_singleton_and_keeps_absent_sections() -> Result<()> {
    let database = Database::in_memory().await?;

    let stored = database.upsert_settings(&settings_row("/media/one")).await?;
    assert_eq!(stored.id, SETTINGS_ROW_ID);

    database.upsert_settings(&settings_row("/media/two")).await?;
    let loaded = database
        .get_settings()
        .await?
        .ok_or_else(|| anyhow::anyhow!("settings row missing"))?;

    assert_eq!(loaded.id, SETTINGS_ROW_ID);
    assert_eq!(loaded.library, Some(json!({ "libraryPath": "/media/two", "autoScan": true })));
    assert!(loaded.media_player.is_none());
    assert!(loaded.auto_downloader.is_none());
    assert_eq!(loaded.updated_at, settings_row("x").updated_at);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM settings")
        .fetch_one(database.pool())
        .await?;
    assert_eq!(count, 1);
    Ok(())
}

#[tokio::test]
async fn account_upsert_is_last_write_wins() -> Result<()> {
    let database = Database::in_memory().await?;
    database
        .upsert_account(&AccountRow {
            id: 7,
            username: "first".into(),
            token: "token-a".into(),
            viewer: Some(json!({ "name": "first" })),
        })
        .await?;
    database
        .upsert_account(&AccountRow {
            id: 9,
            username: "second".into(),
            token: String::new(),
            viewer: None,
        })
        .await?;

    let account = database
        .get_account()
        .await?
        .ok_or_else(|| anyhow::anyhow!("account row missing"))?;
    assert_eq!(account.id, ACCOUNT_ROW_ID);
    assert_eq!(account.username, "second");
    assert!(account.token.is_empty());
    assert!(account.viewer.is_none());
    Ok(())
}

#[tokio::test]
async fn file_database_persists_across_reopen() -> Result<()> {
    let temp = tempfile::tempdir()?;
    {
        let database = Database::open(temp.path()).await?;
        database.upsert_settings(&settings_row("/media/anime")).await?;
        database.close().await;
    }
    let reopened = Database::open(temp.path()).await?;
    let loaded = reopened.get_settings().await?;
    assert_eq!(
        loaded.and_then(|row| row.library),
        Some(json!({ "libraryPath": "/media/anime", "autoScan": true }))
    );
    Ok(())
}
