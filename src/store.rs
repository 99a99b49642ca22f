//! The document store: keyed recipe summaries, ranked views, full-text
//! search, the usage ledger, and the session registry.
//!
//! All operations are bounded units of work against the pooled SQLite
//! handle. The one compound write (a recipe insert plus its derived search
//! index row) runs inside a single transaction, so the index can never
//! diverge from the recipe table. Cancelling a pending operation (dropping
//! its future) rolls the open transaction back.

use sqlx::{Row, SqlitePool};
use tracing::{debug, warn};

use crate::config::Config;
use crate::db;
use crate::error::StoreError;
use crate::migrate;
use crate::models::{RecipeEntry, SearchResult, UsageRecord};

/// Handle to an open, fully-migrated recipe store. Cheap to clone.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open the configured database file and bring it to the current schema
    /// version. A migration failure here must abort startup; the store is
    /// unusable until it succeeds.
    pub async fn open(config: &Config) -> Result<Self, StoreError> {
        let pool = db::connect(config).await?;
        migrate::run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    /// Open a fully-migrated private in-memory store.
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        let pool = db::connect_in_memory().await?;
        migrate::run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    /// Wrap an already-connected, already-migrated pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Store the summary for a url.
    ///
    /// Fails with [`StoreError::Conflict`] if the url is already present and
    /// with [`StoreError::MalformedPayload`] if the summary is not valid
    /// JSON. Validation happens inside the write itself, so a failed insert
    /// leaves neither a recipe row nor a search entry behind. The sentinel
    /// summary `""` is valid JSON and therefore always accepted.
    pub async fn insert(&self, url: &str, summary: &str) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO recipes (url, summary, last_access, hit_count) \
             VALUES (?1, json(?2), datetime('now'), 0)",
        )
        .bind(url)
        .bind(summary)
        .execute(&mut *tx)
        .await
        .map_err(map_insert_error)?;

        // Derived index row, same unit of work as the document write.
        sqlx::query(
            "INSERT INTO recipes_fts (rowid, url, summary) \
             SELECT rowid, url, summary FROM recipes WHERE url = ?1",
        )
        .bind(url)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// The stored summary for a url, if any. A hit advances `last_access`;
    /// the bump is best-effort and may race benignly with other readers.
    pub async fn get(&self, url: &str) -> Result<Option<String>, StoreError> {
        let summary: Option<String> =
            sqlx::query_scalar("SELECT summary FROM recipes WHERE url = ?1")
                .bind(url)
                .fetch_optional(&self.pool)
                .await?;

        if summary.is_some() {
            if let Err(e) =
                sqlx::query("UPDATE recipes SET last_access = datetime('now') WHERE url = ?1")
                    .bind(url)
                    .execute(&self.pool)
                    .await
            {
                debug!(url, error = %e, "failed to advance last_access");
            }
        }

        Ok(summary)
    }

    /// Count one access for a url. The increment happens in the storage
    /// layer, so concurrent hits on the same key are never lost. An absent
    /// url is a no-op; failures are logged and swallowed.
    pub async fn hit(&self, url: &str) {
        let res = sqlx::query("UPDATE recipes SET hit_count = hit_count + 1 WHERE url = ?1")
            .bind(url)
            .execute(&self.pool)
            .await;

        if let Err(e) = res {
            warn!(url, error = %e, "failed to record hit");
        }
    }

    /// The most recently accessed recipes, newest first.
    pub async fn recents(&self, count: i64) -> Result<Vec<RecipeEntry>, StoreError> {
        self.list_by("last_access", count).await
    }

    /// The most frequently accessed recipes, most popular first.
    pub async fn favorites(&self, count: i64) -> Result<Vec<RecipeEntry>, StoreError> {
        self.list_by("hit_count", count).await
    }

    async fn list_by(&self, order: &str, count: i64) -> Result<Vec<RecipeEntry>, StoreError> {
        // Recipes holding the sentinel summary were fetched but yielded
        // nothing extractable; they never appear in listings.
        let query = format!(
            "SELECT summary ->> '$.title' AS title, url, \
                    (summary ->> '$.ingredients' IS NOT NULL) \
                    AND (summary ->> '$.method' IS NOT NULL) AS has_summary \
             FROM recipes WHERE summary != '\"\"' ORDER BY {order} DESC LIMIT ?1"
        );

        let rows = sqlx::query(&query)
            .bind(count)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(|row| RecipeEntry {
                title: row.get("title"),
                url: row.get("url"),
                has_summary: row.get("has_summary"),
            })
            .collect())
    }

    /// Search stored recipes, best match first.
    ///
    /// An empty pattern yields an empty result. A pattern ending in a letter
    /// has its final token widened to a prefix query; quoted phrases pass
    /// through exact.
    pub async fn search(&self, pattern: &str) -> Result<Vec<SearchResult>, StoreError> {
        if pattern.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            "SELECT summary ->> '$.title' AS title, url \
             FROM recipes_fts WHERE recipes_fts MATCH ?1 ORDER BY rank",
        )
        .bind(match_expression(pattern))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| SearchResult {
                title: row.get("title"),
                url: row.get("url"),
            })
            .collect())
    }

    /// Recompute every search entry from the recipe table. Needed once when
    /// search is introduced over an existing store, and available for repair
    /// if rows were ever written behind the store's back.
    pub async fn rebuild_search_index(&self) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO recipes_fts (recipes_fts) VALUES ('rebuild')")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Append one record to the usage ledger. Bookkeeping only: failures are
    /// logged and swallowed, never surfaced to the caller.
    pub async fn usage(&self, record: &UsageRecord) {
        let res = sqlx::query(
            "INSERT INTO usage (url, length_in, length_out, tokens_in, tokens_out) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&record.url)
        .bind(record.length_in)
        .bind(record.length_out)
        .bind(record.tokens_in)
        .bind(record.tokens_out)
        .execute(&self.pool)
        .await;

        if let Err(e) = res {
            warn!(url = %record.url, error = %e, "failed to append usage record");
        }
    }

    /// The live nonce registered for an email, if any. This read is the
    /// decision oracle for the authentication chain, so unlike the
    /// bookkeeping writes its failures do surface.
    pub async fn get_session(&self, email: &str) -> Result<Option<String>, StoreError> {
        Ok(
            sqlx::query_scalar("SELECT nonce FROM session WHERE email = ?1")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    /// Register a nonce for an email, replacing and invalidating any prior
    /// one. Called by the login-issuance path.
    pub async fn put_session(&self, email: &str, nonce: &str) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO session (email, nonce) VALUES (?1, ?2) \
             ON CONFLICT (email) DO UPDATE SET nonce = excluded.nonce",
        )
        .bind(email)
        .bind(nonce)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// Massage a user pattern into an FTS5 match expression. A trailing letter
/// widens the final token into a prefix query; any other trailing character
/// (a digit, or the closing quote of a phrase) leaves the pattern exact.
fn match_expression(pattern: &str) -> String {
    let mut expr = pattern.to_string();
    if expr.chars().next_back().is_some_and(char::is_alphabetic) {
        expr.push('*');
    }
    expr
}

fn map_insert_error(e: sqlx::Error) -> StoreError {
    if let Some(db) = e.as_database_error() {
        if db.is_unique_violation() {
            return StoreError::Conflict;
        }
        // SQLite's json() raises exactly this message on invalid input.
        if db.message().contains("malformed JSON") {
            return StoreError::MalformedPayload;
        }
    }
    StoreError::Unavailable(e)
}

#[cfg(test)]
mod tests {
    use super::match_expression;

    #[test]
    fn trailing_letter_becomes_prefix_query() {
        assert_eq!(match_expression("one thr"), "one thr*");
    }

    #[test]
    fn quoted_phrase_is_left_exact() {
        assert_eq!(match_expression("\"one thr\""), "\"one thr\"");
    }

    #[test]
    fn trailing_digit_is_left_alone() {
        assert_eq!(match_expression("route 66"), "route 66");
    }
}
