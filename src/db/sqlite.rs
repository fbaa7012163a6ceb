//! On-device routine store backed by SQLite.
//!
//! Each routine is kept as its JSON document next to its position, so
//! fields the app adds later survive a round trip through the store.

use crate::db::LocalStore;
use crate::error::{StoreError, StoreResult};
use crate::models::RoutineRecord;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;

const CREATE_ROUTINES: &str = r#"
    CREATE TABLE IF NOT EXISTS routines (
        routine_id TEXT PRIMARY KEY NOT NULL,
        position   INTEGER NOT NULL,
        body       TEXT NOT NULL
    )
"#;

#[derive(sqlx::FromRow)]
struct RoutineRow {
    routine_id: String,
    body: String,
}

/// SQLite-backed [`LocalStore`].
#[derive(Clone)]
pub struct SqliteLocalStore {
    pool: SqlitePool,
}

impl SqliteLocalStore {
    /// Open (creating if needed) the database file at `path`.
    pub async fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| StoreError(e.to_string()))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Self::from_pool(pool).await
    }

    /// Wrap an existing pool, creating the schema if missing.
    pub async fn from_pool(pool: SqlitePool) -> StoreResult<Self> {
        sqlx::query(CREATE_ROUTINES).execute(&pool).await?;
        Ok(Self { pool })
    }

    /// Insert or update a single routine, appending new ones at the end.
    pub async fn upsert(&self, routine: &RoutineRecord) -> StoreResult<()> {
        let body = serde_json::to_string(routine)?;
        sqlx::query(
            r#"
            INSERT INTO routines (routine_id, position, body)
            VALUES (?, (SELECT COALESCE(MAX(position), -1) + 1 FROM routines), ?)
            ON CONFLICT(routine_id) DO UPDATE SET body = excluded.body
            "#,
        )
        .bind(&routine.routine_id)
        .bind(&body)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl LocalStore for SqliteLocalStore {
    async fn list(&self) -> StoreResult<Vec<RoutineRecord>> {
        let rows: Vec<RoutineRow> =
            sqlx::query_as("SELECT routine_id, body FROM routines ORDER BY position")
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter()
            .map(|row| {
                serde_json::from_str(&row.body).map_err(|e| {
                    StoreError(format!("Corrupt routine {}: {}", row.routine_id, e))
                })
            })
            .collect()
    }

    async fn replace_all(&self, records: &[RoutineRecord]) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM routines")
            .execute(&mut *tx)
            .await?;

        for (position, routine) in records.iter().enumerate() {
            let body = serde_json::to_string(routine)?;
            sqlx::query(
                "INSERT OR REPLACE INTO routines (routine_id, position, body) VALUES (?, ?, ?)",
            )
            .bind(&routine.routine_id)
            .bind(position as i64)
            .bind(&body)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::debug!(count = records.len(), "Replaced local routines");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_replace_all_then_list_keeps_order() {
        let temp_dir = tempdir().unwrap();
        let store = SqliteLocalStore::open(&temp_dir.path().join("routines.db"))
            .await
            .unwrap();

        store.upsert(&RoutineRecord::new("stale", "Stale")).await.unwrap();

        let records = vec![
            RoutineRecord::new("z", "Last alphabetically"),
            RoutineRecord::new("a", "First alphabetically"),
        ];
        store.replace_all(&records).await.unwrap();

        assert_eq!(store.list().await.unwrap(), records);
    }

    #[tokio::test]
    async fn test_upsert_updates_in_place() {
        let temp_dir = tempdir().unwrap();
        let store = SqliteLocalStore::open(&temp_dir.path().join("nested/dir/routines.db"))
            .await
            .unwrap();

        store.upsert(&RoutineRecord::new("a", "A")).await.unwrap();
        store.upsert(&RoutineRecord::new("b", "B")).await.unwrap();
        store.upsert(&RoutineRecord::new("a", "A renamed")).await.unwrap();

        let routines = store.list().await.unwrap();
        assert_eq!(routines.len(), 2);
        assert_eq!(routines[0].name, "A renamed");
        assert_eq!(routines[1].routine_id, "b");
    }

    #[tokio::test]
    async fn test_empty_store_lists_nothing() {
        let temp_dir = tempdir().unwrap();
        let store = SqliteLocalStore::open(&temp_dir.path().join("empty.db"))
            .await
            .unwrap();
        assert!(store.list().await.unwrap().is_empty());
    }
}
