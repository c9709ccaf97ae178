// SQLite-backed giveaway store - survives restarts.
//
// Tables:
// - giveaways: one row per live giveaway (manual winners as a JSON array)
// - giveaway_entries: (giveaway_id, user_id) pairs, primary key enforces uniqueness
// - retired_giveaways: ids of removed giveaways so they are never reused
//
// Times are stored as unix milliseconds so `end_time <= ?` compares numerically.

use crate::core::giveaway::{Giveaway, GiveawayError, GiveawayStore, JoinOutcome};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite};
use std::path::Path;

pub struct SqliteGiveawayStore {
    pool: Pool<Sqlite>,
}

fn storage_err(e: sqlx::Error) -> GiveawayError {
    GiveawayError::StorageError(e.to_string())
}

impl SqliteGiveawayStore {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Ensure the file exists if it's a file path
        let path_str = database_url.trim_start_matches("sqlite://");
        if !database_url.contains(":memory:") && !Path::new(path_str).exists() {
            if let Some(parent) = Path::new(path_str).parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::File::create(path_str)?;
        }

        let conn_str = if database_url.starts_with("sqlite:") {
            database_url.to_string()
        } else {
            format!("sqlite://{}", database_url)
        };

        let pool = SqlitePoolOptions::new().connect(&conn_str).await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS giveaways (
                id INTEGER PRIMARY KEY,
                guild_id INTEGER NOT NULL,
                channel_id INTEGER NOT NULL,
                prize TEXT NOT NULL,
                host_id INTEGER NOT NULL,
                end_time INTEGER NOT NULL,
                manual_winners TEXT NOT NULL DEFAULT '[]',
                finalizing BOOLEAN NOT NULL DEFAULT 0
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_giveaways_end_time ON giveaways(end_time);
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS giveaway_entries (
                giveaway_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                joined_at INTEGER NOT NULL,
                PRIMARY KEY (giveaway_id, user_id)
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS retired_giveaways (
                id INTEGER PRIMARY KEY,
                retired_at INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn load_entries(&self, id: u64) -> Result<Vec<u64>, GiveawayError> {
        let rows = sqlx::query(
            "SELECT user_id FROM giveaway_entries WHERE giveaway_id = ? ORDER BY rowid",
        )
        .bind(id as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(rows
            .iter()
            .map(|row| row.get::<i64, _>("user_id") as u64)
            .collect())
    }

    /// Build a record from a `giveaways` row plus its entries.
    async fn hydrate(&self, row: &SqliteRow) -> Result<Giveaway, GiveawayError> {
        let id = row.get::<i64, _>("id") as u64;
        let end_ms: i64 = row.get("end_time");
        let end_time = DateTime::<Utc>::from_timestamp_millis(end_ms).ok_or_else(|| {
            GiveawayError::StorageError(format!("giveaway {} has an invalid end time", id))
        })?;

        let winners_json: String = row.get("manual_winners");
        let manual_winners: Vec<u64> = serde_json::from_str(&winners_json).map_err(|e| {
            GiveawayError::StorageError(format!("giveaway {} manual winners: {}", id, e))
        })?;

        Ok(Giveaway {
            id,
            guild_id: row.get::<i64, _>("guild_id") as u64,
            channel_id: row.get::<i64, _>("channel_id") as u64,
            prize: row.get("prize"),
            host_id: row.get::<i64, _>("host_id") as u64,
            end_time,
            entries: self.load_entries(id).await?,
            manual_winners,
            finalizing: row.get("finalizing"),
        })
    }

    async fn hydrate_all(&self, rows: Vec<SqliteRow>) -> Result<Vec<Giveaway>, GiveawayError> {
        let mut giveaways = Vec::with_capacity(rows.len());
        for row in &rows {
            giveaways.push(self.hydrate(row).await?);
        }
        Ok(giveaways)
    }
}

#[async_trait]
impl GiveawayStore for SqliteGiveawayStore {
    async fn insert(&self, giveaway: Giveaway) -> Result<(), GiveawayError> {
        let id = giveaway.id;
        let winners_json = serde_json::to_string(&giveaway.manual_winners)
            .map_err(|e| GiveawayError::StorageError(e.to_string()))?;

        let mut tx = self.pool.begin().await.map_err(storage_err)?;

        let retired = sqlx::query("SELECT 1 FROM retired_giveaways WHERE id = ?")
            .bind(id as i64)
            .fetch_optional(&mut *tx)
            .await
            .map_err(storage_err)?;
        if retired.is_some() {
            return Err(GiveawayError::DuplicateId(id));
        }

        let inserted = sqlx::query(
            r#"
            INSERT OR IGNORE INTO giveaways
                (id, guild_id, channel_id, prize, host_id, end_time, manual_winners, finalizing)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id as i64)
        .bind(giveaway.guild_id as i64)
        .bind(giveaway.channel_id as i64)
        .bind(&giveaway.prize)
        .bind(giveaway.host_id as i64)
        .bind(giveaway.end_time.timestamp_millis())
        .bind(&winners_json)
        .bind(giveaway.finalizing)
        .execute(&mut *tx)
        .await
        .map_err(storage_err)?;

        if inserted.rows_affected() == 0 {
            return Err(GiveawayError::DuplicateId(id));
        }

        let joined_at = Utc::now().timestamp_millis();
        for user_id in &giveaway.entries {
            sqlx::query(
                "INSERT OR IGNORE INTO giveaway_entries (giveaway_id, user_id, joined_at) VALUES (?, ?, ?)",
            )
            .bind(id as i64)
            .bind(*user_id as i64)
            .bind(joined_at)
            .execute(&mut *tx)
            .await
            .map_err(storage_err)?;
        }

        tx.commit().await.map_err(storage_err)?;
        Ok(())
    }

    async fn get(&self, id: u64) -> Result<Option<Giveaway>, GiveawayError> {
        let row = sqlx::query("SELECT * FROM giveaways WHERE id = ?")
            .bind(id as i64)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;

        match row {
            Some(row) => Ok(Some(self.hydrate(&row).await?)),
            None => Ok(None),
        }
    }

    async fn add_entry(&self, id: u64, user_id: u64) -> Result<JoinOutcome, GiveawayError> {
        // Single statement: insert only if the giveaway is live and the pair is new.
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO giveaway_entries (giveaway_id, user_id, joined_at)
            SELECT ?, ?, ?
            WHERE EXISTS (SELECT 1 FROM giveaways WHERE id = ? AND finalizing = 0)
            "#,
        )
        .bind(id as i64)
        .bind(user_id as i64)
        .bind(Utc::now().timestamp_millis())
        .bind(id as i64)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        if result.rows_affected() == 1 {
            return Ok(JoinOutcome::Joined);
        }

        let live = sqlx::query("SELECT 1 FROM giveaways WHERE id = ? AND finalizing = 0")
            .bind(id as i64)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;

        Ok(if live.is_some() {
            JoinOutcome::AlreadyJoined
        } else {
            JoinOutcome::NotFound
        })
    }

    async fn set_manual_winners(&self, id: u64, winners: &[u64]) -> Result<bool, GiveawayError> {
        let winners_json =
            serde_json::to_string(winners).map_err(|e| GiveawayError::StorageError(e.to_string()))?;

        let result =
            sqlx::query("UPDATE giveaways SET manual_winners = ? WHERE id = ? AND finalizing = 0")
                .bind(&winners_json)
                .bind(id as i64)
                .execute(&self.pool)
                .await
                .map_err(storage_err)?;

        Ok(result.rows_affected() == 1)
    }

    async fn list_expired(&self, now: DateTime<Utc>) -> Result<Vec<Giveaway>, GiveawayError> {
        let rows = sqlx::query("SELECT * FROM giveaways WHERE end_time <= ? ORDER BY end_time")
            .bind(now.timestamp_millis())
            .fetch_all(&self.pool)
            .await
            .map_err(storage_err)?;

        self.hydrate_all(rows).await
    }

    async fn list_active(&self, guild_id: u64) -> Result<Vec<Giveaway>, GiveawayError> {
        let rows = sqlx::query(
            "SELECT * FROM giveaways WHERE guild_id = ? AND finalizing = 0 ORDER BY end_time, id",
        )
        .bind(guild_id as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        self.hydrate_all(rows).await
    }

    async fn mark_finalizing(&self, id: u64) -> Result<bool, GiveawayError> {
        let result = sqlx::query("UPDATE giveaways SET finalizing = 1 WHERE id = ? AND finalizing = 0")
            .bind(id as i64)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;

        Ok(result.rows_affected() == 1)
    }

    async fn clear_finalizing(&self, id: u64) -> Result<bool, GiveawayError> {
        let result = sqlx::query("UPDATE giveaways SET finalizing = 0 WHERE id = ? AND finalizing = 1")
            .bind(id as i64)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;

        Ok(result.rows_affected() == 1)
    }

    async fn remove(&self, id: u64) -> Result<bool, GiveawayError> {
        let mut tx = self.pool.begin().await.map_err(storage_err)?;

        sqlx::query("DELETE FROM giveaway_entries WHERE giveaway_id = ?")
            .bind(id as i64)
            .execute(&mut *tx)
            .await
            .map_err(storage_err)?;

        let deleted = sqlx::query("DELETE FROM giveaways WHERE id = ?")
            .bind(id as i64)
            .execute(&mut *tx)
            .await
            .map_err(storage_err)?;

        sqlx::query("INSERT OR IGNORE INTO retired_giveaways (id, retired_at) VALUES (?, ?)")
            .bind(id as i64)
            .bind(Utc::now().timestamp_millis())
            .execute(&mut *tx)
            .await
            .map_err(storage_err)?;

        tx.commit().await.map_err(storage_err)?;
        Ok(deleted.rows_affected() == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    async fn open(dir: &TempDir) -> SqliteGiveawayStore {
        let path = dir.path().join("giveaways.db");
        SqliteGiveawayStore::new(path.to_str().unwrap())
            .await
            .unwrap()
    }

    fn giveaway(id: u64, end_secs: i64) -> Giveaway {
        Giveaway {
            id,
            guild_id: 10,
            channel_id: 20,
            prize: "Nitro".to_string(),
            host_id: 30,
            end_time: Utc.timestamp_opt(end_secs, 0).unwrap(),
            entries: Vec::new(),
            manual_winners: Vec::new(),
            finalizing: false,
        }
    }

    #[tokio::test]
    async fn test_roundtrip_survives_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = open(&dir).await;
            store.insert(giveaway(1, 100)).await.unwrap();
            assert_eq!(store.add_entry(1, 5).await.unwrap(), JoinOutcome::Joined);
            assert_eq!(store.add_entry(1, 6).await.unwrap(), JoinOutcome::Joined);
            assert!(store.set_manual_winners(1, &[6, 5]).await.unwrap());
        }

        let store = open(&dir).await;
        let stored = store.get(1).await.unwrap().unwrap();
        assert_eq!(stored.entries, vec![5, 6]);
        assert_eq!(stored.manual_winners, vec![6, 5]);
        assert_eq!(stored.end_time, Utc.timestamp_opt(100, 0).unwrap());
        assert!(!stored.finalizing);
    }

    #[tokio::test]
    async fn test_entries_are_unique() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir).await;
        store.insert(giveaway(1, 100)).await.unwrap();

        assert_eq!(store.add_entry(1, 5).await.unwrap(), JoinOutcome::Joined);
        assert_eq!(
            store.add_entry(1, 5).await.unwrap(),
            JoinOutcome::AlreadyJoined
        );
        assert_eq!(store.add_entry(2, 5).await.unwrap(), JoinOutcome::NotFound);
        assert_eq!(store.get(1).await.unwrap().unwrap().entries, vec![5]);
    }

    #[tokio::test]
    async fn test_finalizing_blocks_changes() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir).await;
        store.insert(giveaway(1, 100)).await.unwrap();

        assert!(store.mark_finalizing(1).await.unwrap());
        assert!(!store.mark_finalizing(1).await.unwrap());
        assert_eq!(store.add_entry(1, 5).await.unwrap(), JoinOutcome::NotFound);
        assert!(!store.set_manual_winners(1, &[5]).await.unwrap());
        assert!(store.get(1).await.unwrap().unwrap().finalizing);

        assert!(store.clear_finalizing(1).await.unwrap());
        assert!(!store.clear_finalizing(1).await.unwrap());
        assert_eq!(store.add_entry(1, 5).await.unwrap(), JoinOutcome::Joined);
    }

    #[tokio::test]
    async fn test_expiry_listing() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir).await;
        store.insert(giveaway(1, 10)).await.unwrap();
        store.insert(giveaway(2, 20)).await.unwrap();

        let at = |secs| Utc.timestamp_opt(secs, 0).unwrap();
        assert!(store.list_expired(at(9)).await.unwrap().is_empty());

        let expired = store.list_expired(at(10)).await.unwrap();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].id, 1);

        assert_eq!(store.list_expired(at(25)).await.unwrap().len(), 2);
        assert_eq!(store.list_active(10).await.unwrap().len(), 2);
        assert!(store.list_active(11).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_removed_ids_are_retired() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir).await;
        store.insert(giveaway(1, 100)).await.unwrap();
        store.add_entry(1, 5).await.unwrap();

        assert!(store.remove(1).await.unwrap());
        assert!(!store.remove(1).await.unwrap());
        assert!(store.get(1).await.unwrap().is_none());
        assert!(matches!(
            store.insert(giveaway(1, 100)).await,
            Err(GiveawayError::DuplicateId(1))
        ));
        assert!(matches!(
            store.insert(giveaway(2, 100)).await,
            Ok(())
        ));
        assert!(matches!(
            store.insert(giveaway(2, 100)).await,
            Err(GiveawayError::DuplicateId(2))
        ));
    }
}
