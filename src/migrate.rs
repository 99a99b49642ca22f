//! Ordered, versioned schema migrations.
//!
//! Each entry in [`SCHEMA`] is one opaque SQL batch. The runner reads the
//! persisted version (0 when the database is new) and applies the pending
//! suffix strictly in index order. Every step commits together with its
//! version bump in a single transaction, so the persisted version can never
//! run ahead of the schema and a failed step leaves no partial state behind.
//!
//! Migrations run at open time, before the pool is handed to concurrent
//! callers.

use sqlx::SqlitePool;

use crate::error::StoreError;

/// The full migration history. Index n migrates the store to version n + 1.
///
/// The search index is an FTS5 external-content table over `recipes`; it is
/// kept in step by the store's write path rather than by triggers, so the
/// same insert transaction always carries both writes. The `'rebuild'`
/// command at the end of version 1 populates the index for stores that
/// already hold recipes when search is first introduced.
pub const SCHEMA: &[&str] = &[
    // version 1: recipes, the usage ledger, and the search index.
    r#"
CREATE TABLE metadata (
  id INTEGER PRIMARY KEY,
  schema_version INTEGER
);

CREATE TABLE IF NOT EXISTS recipes (
  url TEXT PRIMARY KEY,
  summary TEXT,
  last_access DATETIME,
  hit_count INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS usage (
  ts DATETIME DEFAULT CURRENT_TIMESTAMP,
  url TEXT,
  length_in INTEGER,
  length_out INTEGER,
  tokens_in INTEGER,
  tokens_out INTEGER
);

DROP TABLE IF EXISTS recipes_fts;

CREATE VIRTUAL TABLE recipes_fts USING fts5(
  url UNINDEXED,
  summary,
  content='recipes',
  prefix='1 2 3',
  tokenize='porter unicode61'
);

INSERT INTO recipes_fts (recipes_fts) VALUES ('rebuild');
"#,
    // version 2: session registry.
    r#"
CREATE TABLE session (
  email TEXT,
  nonce TEXT
);
"#,
    // version 3: enforce one live nonce per email.
    r#"
CREATE TABLE new_session (
  email TEXT UNIQUE,
  nonce TEXT
);
INSERT INTO new_session SELECT * FROM session;
DROP TABLE session;
ALTER TABLE new_session RENAME TO session;
"#,
];

/// Bring the store to the current schema version.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), StoreError> {
    apply(pool, SCHEMA).await
}

/// Apply the pending suffix of `steps` to the store.
pub async fn apply(pool: &SqlitePool, steps: &[&str]) -> Result<(), StoreError> {
    let current = schema_version(pool).await?;

    for (idx, step) in steps.iter().enumerate().skip(current as usize) {
        let version = idx as i64 + 1;

        let mut tx = pool.begin().await?;
        sqlx::raw_sql(step)
            .execute(&mut *tx)
            .await
            .map_err(|source| StoreError::Migration { version, source })?;
        sqlx::query(
            "INSERT INTO metadata (id, schema_version) VALUES (0, ?1) \
             ON CONFLICT (id) DO UPDATE SET schema_version = ?1",
        )
        .bind(version)
        .execute(&mut *tx)
        .await
        .map_err(|source| StoreError::Migration { version, source })?;
        tx.commit().await?;
    }

    Ok(())
}

/// The persisted schema version, or 0 for a database that has never been
/// migrated.
pub async fn schema_version(pool: &SqlitePool) -> Result<i64, StoreError> {
    // The metadata table itself only exists from version 1 on.
    let exists: bool = sqlx::query_scalar(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type = 'table' AND name = 'metadata'",
    )
    .fetch_one(pool)
    .await?;

    if !exists {
        return Ok(0);
    }

    Ok(
        sqlx::query_scalar("SELECT schema_version FROM metadata WHERE id = 0")
            .fetch_optional(pool)
            .await?
            .unwrap_or(0),
    )
}
