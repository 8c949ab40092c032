//! Singleton account row for the remote catalog session.

use serde_json::Value;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use sqlx::types::Json;

use crate::error::{Result, map_query_err};
use crate::store::Database;

/// Fixed identifier of the account row.
pub const ACCOUNT_ROW_ID: i64 = 1;

const SELECT_ACCOUNT_SQL: &str = r"
    SELECT id, username, token, viewer
    FROM account
    ORDER BY id DESC
    LIMIT 1
";

const UPSERT_ACCOUNT_SQL: &str = r"
    INSERT INTO account (id, username, token, viewer)
    VALUES (?1, ?2, ?3, ?4)
    ON CONFLICT (id) DO UPDATE
    SET
        username = excluded.username,
        token = excluded.token,
        viewer = excluded.viewer
";

/// Raw projection of the `account` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountRow {
    /// Primary key.
    pub id: i64,
    /// Remote username.
    pub username: String,
    /// Remote API token.
    pub token: String,
    /// Cached remote profile document.
    pub viewer: Option<Value>,
}

impl AccountRow {
    fn from_row(row: &SqliteRow) -> std::result::Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            token: row.try_get("token")?,
            viewer: row
                .try_get::<Option<Json<Value>>, _>("viewer")?
                .map(|Json(value)| value)
                .filter(|value| !value.is_null()),
        })
    }
}

impl Database {
    /// Load the most recent account row, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a column cannot be decoded.
    pub async fn get_account(&self) -> Result<Option<AccountRow>> {
        let row = sqlx::query(SELECT_ACCOUNT_SQL)
            .fetch_optional(self.pool())
            .await
            .map_err(map_query_err("account.get"))?;
        row.as_ref()
            .map(AccountRow::from_row)
            .transpose()
            .map_err(map_query_err("account.decode"))
    }

    /// Insert or replace the account row keyed by [`ACCOUNT_ROW_ID`] (last write wins).
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn upsert_account(&self, account: &AccountRow) -> Result<AccountRow> {
        sqlx::query(UPSERT_ACCOUNT_SQL)
            .bind(ACCOUNT_ROW_ID)
            .bind(&account.username)
            .bind(&account.token)
            .bind(account.viewer.clone().map(Json))
            .execute(self.pool())
            .await
            .map_err(map_query_err("account.upsert"))?;
        Ok(AccountRow {
            id: ACCOUNT_ROW_ID,
            ..account.clone()
        })
    }
}
