//! SQL migration definitions for the TenderPilot database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a set of SQL statements executed as one batch.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: dataset_snapshots, ai_cache",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version   INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Downloaded CSV bodies, one row per distinct body per source
CREATE TABLE IF NOT EXISTS dataset_snapshots (
    id           TEXT PRIMARY KEY,
    source       TEXT NOT NULL,
    fetched_at   TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    byte_len     INTEGER NOT NULL,
    body         TEXT NOT NULL,
    UNIQUE(source, content_hash)
);

CREATE INDEX IF NOT EXISTS idx_snapshots_source ON dataset_snapshots(source, fetched_at);

-- LLM response cache
CREATE TABLE IF NOT EXISTS ai_cache (
    id          TEXT PRIMARY KEY,
    task        TEXT NOT NULL,
    prompt_hash TEXT NOT NULL,
    model_id    TEXT NOT NULL,
    tender_ref  TEXT,
    result_text TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    UNIQUE(task, prompt_hash, model_id)
);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
