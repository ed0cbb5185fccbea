use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::time::Instant;

use crate::errors::{Result, StudyError};
use crate::log_db_operation;

const CARDS_KEY: &str = "cards";

/// Durable home of the serialized card set.
///
/// Implementations must replace the stored snapshot atomically: a reader sees either
/// the previous payload or the new one, never a mix.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// `Ok(None)` when nothing has been written yet.
    async fn load(&self) -> Result<Option<String>>;

    async fn save(&self, payload: &str) -> Result<()>;
}

/// SQLite-backed snapshot store: one row per key in a small key-value table.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url).await?;
        let db = Database { pool };
        db.migrate().await?;
        Ok(db)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS card_store (
                key TEXT PRIMARY KEY,
                payload TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        log_db_operation!(info, "migrate", "card_store table ready");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl SnapshotStore for Database {
    async fn load(&self) -> Result<Option<String>> {
        let started = Instant::now();
        let row = sqlx::query("SELECT payload FROM card_store WHERE key = ?1")
            .bind(CARDS_KEY)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                log_db_operation!(error, "load_snapshot", error = e);
                StudyError::from(e)
            })?;

        let payload = match row {
            Some(row) => Some(row.try_get::<String, _>("payload")?),
            None => None,
        };

        log_db_operation!(
            debug,
            "load_snapshot",
            bytes = payload.as_ref().map_or(0, |p| p.len()),
            duration_ms = started.elapsed().as_millis() as u64
        );
        Ok(payload)
    }

    async fn save(&self, payload: &str) -> Result<()> {
        let started = Instant::now();
        sqlx::query(
            r#"
            INSERT INTO card_store (key, payload, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET payload = excluded.payload, updated_at = excluded.updated_at
            "#,
        )
        .bind(CARDS_KEY)
        .bind(payload)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            log_db_operation!(error, "save_snapshot", error = e);
            StudyError::from(e)
        })?;

        log_db_operation!(
            debug,
            "save_snapshot",
            bytes = payload.len(),
            duration_ms = started.elapsed().as_millis() as u64
        );
        Ok(())
    }
}
