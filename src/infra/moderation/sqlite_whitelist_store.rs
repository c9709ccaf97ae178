// SQLite-backed whitelist store for the anti-spam system.
//
// Tables:
// - spam_whitelist: channels exempt from rate limiting

use crate::core::moderation::{SpamError, WhitelistEntry, WhitelistStore};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Row, Sqlite};

pub struct SqliteWhitelistStore {
    pool: Pool<Sqlite>,
}

impl SqliteWhitelistStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Run database migrations to create required tables.
    pub async fn migrate(&self) -> Result<(), SpamError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS spam_whitelist (
                channel_id INTEGER PRIMARY KEY,
                guild_id INTEGER NOT NULL,
                added_at INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| SpamError::StorageError(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl WhitelistStore for SqliteWhitelistStore {
    async fn load_all(&self) -> Result<Vec<WhitelistEntry>, SpamError> {
        let rows = sqlx::query("SELECT channel_id, guild_id FROM spam_whitelist")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| SpamError::StorageError(e.to_string()))?;

        Ok(rows
            .iter()
            .map(|row| WhitelistEntry {
                channel_id: row.get::<i64, _>("channel_id") as u64,
                guild_id: row.get::<i64, _>("guild_id") as u64,
            })
            .collect())
    }

    async fn add(&self, entry: WhitelistEntry) -> Result<(), SpamError> {
        sqlx::query(
            r#"
            INSERT INTO spam_whitelist (channel_id, guild_id, added_at)
            VALUES (?, ?, ?)
            ON CONFLICT(channel_id) DO UPDATE SET guild_id = excluded.guild_id
            "#,
        )
        .bind(entry.channel_id as i64)
        .bind(entry.guild_id as i64)
        .bind(Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(|e| SpamError::StorageError(e.to_string()))?;
        Ok(())
    }

    async fn remove(&self, channel_id: u64) -> Result<(), SpamError> {
        sqlx::query("DELETE FROM spam_whitelist WHERE channel_id = ?")
            .bind(channel_id as i64)
            .execute(&self.pool)
            .await
            .map_err(|e| SpamError::StorageError(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;
    use tempfile::TempDir;

    async fn open(dir: &TempDir) -> SqliteWhitelistStore {
        let path = dir.path().join("moderation.db");
        let pool = SqlitePoolOptions::new()
            .connect(&format!("sqlite://{}?mode=rwc", path.display()))
            .await
            .unwrap();
        let store = SqliteWhitelistStore::new(pool);
        store.migrate().await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_whitelist_survives_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = open(&dir).await;
            store
                .add(WhitelistEntry {
                    channel_id: 10,
                    guild_id: 1,
                })
                .await
                .unwrap();
            store
                .add(WhitelistEntry {
                    channel_id: 11,
                    guild_id: 1,
                })
                .await
                .unwrap();
            store.remove(11).await.unwrap();
        }

        let store = open(&dir).await;
        let entries = store.load_all().await.unwrap();
        assert_eq!(
            entries,
            vec![WhitelistEntry {
                channel_id: 10,
                guild_id: 1
            }]
        );
    }

    #[tokio::test]
    async fn test_adding_twice_keeps_one_row() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir).await;
        let entry = WhitelistEntry {
            channel_id: 10,
            guild_id: 1,
        };
        store.add(entry).await.unwrap();
        store.add(entry).await.unwrap();
        store.remove(99).await.unwrap();

        assert_eq!(store.load_all().await.unwrap().len(), 1);
    }
}
