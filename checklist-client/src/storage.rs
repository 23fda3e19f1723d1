use checklist_core::User;
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqlitePoolOptions, Row, SqlitePool};
use uuid::Uuid;

use crate::errors::ClientResult;

pub const CURRENT_USER_KEY: &str = "currentUser";
pub const ANONYMOUS_SESSION_KEY: &str = "anonymousSession";

/// What the CLI remembers between runs after a login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredUser {
    pub user: User,
    pub session_id: Uuid,
}

/// Small key/value table on SQLite, holding the signed-in user.
pub struct LocalStorage {
    pool: SqlitePool,
}

impl LocalStorage {
    pub async fn new(database_url: &str) -> ClientResult<Self> {
        // one connection, so `sqlite::memory:` sees a single database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(database_url)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS local_storage (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }

    async fn get(&self, key: &str) -> ClientResult<Option<String>> {
        let row = sqlx::query("SELECT value FROM local_storage WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(row.try_get("value")?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str) -> ClientResult<()> {
        sqlx::query(
            "INSERT INTO local_storage (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> ClientResult<()> {
        sqlx::query("DELETE FROM local_storage WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn save_user(&self, stored: &StoredUser) -> ClientResult<()> {
        self.set(CURRENT_USER_KEY, &serde_json::to_string(stored)?).await
    }

    /// Unreadable records count as logged out.
    pub async fn load_user(&self) -> ClientResult<Option<StoredUser>> {
        let Some(value) = self.get(CURRENT_USER_KEY).await? else {
            return Ok(None);
        };

        match serde_json::from_str(&value) {
            Ok(stored) => Ok(Some(stored)),
            Err(e) => {
                tracing::warn!(%e, "Discarding unreadable stored user");
                Ok(None)
            }
        }
    }

    pub async fn clear_user(&self) -> ClientResult<()> {
        self.remove(CURRENT_USER_KEY).await
    }

    /// Session over the shared checklist, reused while logged out.
    pub async fn save_anonymous_session(&self, session_id: Uuid) -> ClientResult<()> {
        self.set(ANONYMOUS_SESSION_KEY, &session_id.to_string()).await
    }

    pub async fn load_anonymous_session(&self) -> ClientResult<Option<Uuid>> {
        Ok(self
            .get(ANONYMOUS_SESSION_KEY)
            .await?
            .and_then(|value| Uuid::parse_str(&value).ok()))
    }

    pub async fn clear_anonymous_session(&self) -> ClientResult<()> {
        self.remove(ANONYMOUS_SESSION_KEY).await
    }
}
