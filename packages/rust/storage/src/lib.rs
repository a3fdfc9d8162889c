//! libSQL storage layer (local file).
//!
//! The [`Storage`] struct wraps a libSQL database holding two things:
//! - dataset snapshots, so the full-table download is memoized across runs
//! - the AI response cache, keyed by task, prompt hash and model

mod migrations;

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use libsql::{Connection, Database, params};
use sha2::{Digest, Sha256};
use tenderpilot_shared::{Result, TenderPilotError};
use uuid::Uuid;

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
}

/// A stored CSV download.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Snapshot identifier (UUID v7).
    pub id: String,
    /// URL the body was downloaded from.
    pub source: String,
    /// When the body was last downloaded.
    pub fetched_at: DateTime<Utc>,
    /// SHA-256 of the body.
    pub content_hash: String,
    /// Raw CSV text.
    pub body: String,
}

impl Snapshot {
    /// Age of the snapshot relative to `now`.
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.fetched_at
    }
}

fn storage_err(e: impl std::fmt::Display) -> TenderPilotError {
    TenderPilotError::Storage(e.to_string())
}

impl Storage {
    /// Open or create a database at `path`.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| TenderPilotError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(storage_err)?;

        let conn = db.connect().map_err(storage_err)?;

        let storage = Self { db, conn };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        TenderPilotError::Storage(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    // -----------------------------------------------------------------------
    // Dataset snapshots
    // -----------------------------------------------------------------------

    /// Store a downloaded body. Re-downloading an identical body only bumps
    /// its `fetched_at`.
    pub async fn insert_snapshot(
        &self,
        source: &str,
        body: &str,
        fetched_at: DateTime<Utc>,
    ) -> Result<Snapshot> {
        let id = Uuid::now_v7().to_string();
        let hash = content_hash(body);
        let fetched = fetched_at.to_rfc3339_opts(SecondsFormat::Micros, true);
        self.conn
            .execute(
                "INSERT INTO dataset_snapshots (id, source, fetched_at, content_hash, byte_len, body)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(source, content_hash) DO UPDATE SET
                   fetched_at = excluded.fetched_at",
                params![
                    id.as_str(),
                    source,
                    fetched.as_str(),
                    hash.as_str(),
                    body.len() as i64,
                    body
                ],
            )
            .await
            .map_err(storage_err)?;

        self.latest_snapshot(source)
            .await?
            .ok_or_else(|| TenderPilotError::Storage("snapshot vanished after insert".into()))
    }

    /// Most recently fetched snapshot for `source`.
    pub async fn latest_snapshot(&self, source: &str) -> Result<Option<Snapshot>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, source, fetched_at, content_hash, body
                 FROM dataset_snapshots
                 WHERE source = ?1
                 ORDER BY fetched_at DESC
                 LIMIT 1",
                params![source],
            )
            .await
            .map_err(storage_err)?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_snapshot(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(storage_err(e)),
        }
    }

    /// Keep only the `keep` newest snapshots for `source`. Returns rows removed.
    pub async fn prune_snapshots(&self, source: &str, keep: u32) -> Result<u64> {
        self.conn
            .execute(
                "DELETE FROM dataset_snapshots
                 WHERE source = ?1 AND id NOT IN (
                   SELECT id FROM dataset_snapshots
                   WHERE source = ?1
                   ORDER BY fetched_at DESC
                   LIMIT ?2
                 )",
                params![source, keep],
            )
            .await
            .map_err(storage_err)
    }

    // -----------------------------------------------------------------------
    // AI cache
    // -----------------------------------------------------------------------

    /// Look up a cached AI response.
    pub async fn get_ai_cache(
        &self,
        task: &str,
        prompt_hash: &str,
        model_id: &str,
    ) -> Result<Option<String>> {
        let mut rows = self
            .conn
            .query(
                "SELECT result_text FROM ai_cache
                 WHERE task = ?1 AND prompt_hash = ?2 AND model_id = ?3",
                params![task, prompt_hash, model_id],
            )
            .await
            .map_err(storage_err)?;

        match rows.next().await {
            Ok(Some(row)) => {
                let result: String = row.get(0).map_err(storage_err)?;
                Ok(Some(result))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(storage_err(e)),
        }
    }

    /// Store an AI response in the cache (upserts).
    pub async fn set_ai_cache(
        &self,
        task: &str,
        prompt_hash: &str,
        model_id: &str,
        tender_ref: Option<&str>,
        result_text: &str,
    ) -> Result<()> {
        let id = Uuid::now_v7().to_string();
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        self.conn
            .execute(
                "INSERT INTO ai_cache (id, task, prompt_hash, model_id, tender_ref, result_text, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(task, prompt_hash, model_id) DO UPDATE SET
                   result_text = excluded.result_text,
                   created_at = excluded.created_at",
                params![id.as_str(), task, prompt_hash, model_id, tender_ref, result_text, now.as_str()],
            )
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    /// Drop cached AI responses, all of them or only one task's. Returns rows removed.
    pub async fn clear_ai_cache(&self, task: Option<&str>) -> Result<u64> {
        let removed = match task {
            Some(task) => self
                .conn
                .execute("DELETE FROM ai_cache WHERE task = ?1", params![task])
                .await,
            None => self.conn.execute("DELETE FROM ai_cache", params![]).await,
        };
        removed.map_err(storage_err)
    }
}

/// Hex SHA-256 of a snapshot body.
pub fn content_hash(body: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(body.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Convert a database row to a [`Snapshot`].
fn row_to_snapshot(row: &libsql::Row) -> Result<Snapshot> {
    Ok(Snapshot {
        id: row.get::<String>(0).map_err(storage_err)?,
        source: row.get::<String>(1).map_err(storage_err)?,
        fetched_at: {
            let s: String = row.get(2).map_err(storage_err)?;
            DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| TenderPilotError::Storage(format!("invalid date: {e}")))?
        },
        content_hash: row.get::<String>(3).map_err(storage_err)?,
        body: row.get::<String>(4).map_err(storage_err)?,
    })
}
