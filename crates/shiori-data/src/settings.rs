//! Singleton settings row.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use sqlx::types::Json;

use crate::error::{Result, map_query_err};
use crate::store::Database;

/// Primary key of the only settings row.
pub const SETTINGS_ROW_ID: i64 = 1;

const SELECT_SETTINGS_SQL: &str = r"
    SELECT id, updated_at, library, media_player, torrent, auto_downloader
    FROM settings
    WHERE id = ?1
";

const UPSERT_SETTINGS_SQL: &str = r"
    INSERT INTO settings (id, updated_at, library, media_player, torrent, auto_downloader)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
    ON CONFLICT (id) DO UPDATE
    SET
        updated_at = excluded.updated_at,
        library = excluded.library,
        media_player = excluded.media_player,
        torrent = excluded.torrent,
        auto_downloader = excluded.auto_downloader
";

/// Raw projection of the `settings` table. Absent sections are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsRow {
    /// Primary key (always [`SETTINGS_ROW_ID`] once stored).
    pub id: i64,
    /// Time of the last write.
    pub updated_at: DateTime<Utc>,
    /// Library section document.
    pub library: Option<Value>,
    /// Media player section document.
    pub media_player: Option<Value>,
    /// Torrent client section document.
    pub torrent: Option<Value>,
    /// Auto-downloader section document.
    pub auto_downloader: Option<Value>,
}

impl SettingsRow {
    fn from_row(row: &SqliteRow) -> std::result::Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            updated_at: row.try_get("updated_at")?,
            library: json_column(row, "library")?,
            media_player: json_column(row, "media_player")?,
            torrent: json_column(row, "torrent")?,
            auto_downloader: json_column(row, "auto_downloader")?,
        })
    }
}

fn json_column(row: &SqliteRow, column: &str) -> std::result::Result<Option<Value>, sqlx::Error> {
    let value = row.try_get::<Option<Json<Value>>, _>(column)?;
    Ok(value
        .map(|Json(value)| value)
        .filter(|value| !value.is_null()))
}

impl Database {
    /// Load the settings row, returning `None` when nothing has been stored yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a column cannot be decoded.
    pub async fn get_settings(&self) -> Result<Option<SettingsRow>> {
        let row = sqlx::query(SELECT_SETTINGS_SQL)
            .bind(SETTINGS_ROW_ID)
            .fetch_optional(self.pool())
            .await
            .map_err(map_query_err("settings.get"))?;
        row.as_ref()
            .map(SettingsRow::from_row)
            .transpose()
            .map_err(map_query_err("settings.decode"))
    }

    /// Insert or replace the settings row; the stored id is always forced to
    /// [`SETTINGS_ROW_ID`].
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn upsert_settings(&self, settings: &SettingsRow) -> Result<SettingsRow> {
        sqlx::query(UPSERT_SETTINGS_SQL)
            .bind(SETTINGS_ROW_ID)
            .bind(settings.updated_at)
            .bind(settings.library.clone().map(Json))
            .bind(settings.media_player.clone().map(Json))
            .bind(settings.torrent.clone().map(Json))
            .bind(settings.auto_downloader.clone().map(Json))
            .execute(self.pool())
            .await
            .map_err(map_query_err("settings.upsert"))?;
        Ok(SettingsRow {
            id: SETTINGS_ROW_ID,
            ..settings.clone()
        })
    }
}
