//! Database statistics and health overview.
//!
//! Provides a quick summary of what's stored: recipe counts, ledger and
//! session counts, schema version, and how fresh the store is. Used by
//! `pantry stats` to give confidence that inserts and migrations are working
//! as expected.

use anyhow::Result;
use chrono::NaiveDateTime;

use crate::config::Config;
use crate::db;
use crate::migrate;

/// Run the stats command: query the database and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;

    let version = migrate::schema_version(&pool).await?;

    let total_recipes: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM recipes")
        .fetch_one(&pool)
        .await?;

    let with_summary: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM recipes WHERE summary != '\"\"'")
            .fetch_one(&pool)
            .await?;

    let usage_rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM usage")
        .fetch_one(&pool)
        .await?;

    let sessions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM session")
        .fetch_one(&pool)
        .await?;

    let last_access: Option<String> =
        sqlx::query_scalar("SELECT MAX(last_access) FROM recipes")
            .fetch_one(&pool)
            .await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("Recipe Pantry — Database Stats");
    println!("==============================");
    println!();
    println!("  Database:       {}", config.db.path.display());
    println!("  Size:           {}", format_bytes(db_size));
    println!("  Schema version: {}", version);
    println!();
    println!("  Recipes:        {}", total_recipes);
    println!(
        "  With summary:   {} / {}",
        with_summary, total_recipes
    );
    println!("  Usage records:  {}", usage_rows);
    println!("  Sessions:       {}", sessions);
    println!(
        "  Last access:    {}",
        match last_access {
            Some(ts) => format_age(&ts),
            None => "never".to_string(),
        }
    );
    println!();

    pool.close().await;
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// Format a stored `datetime('now')` timestamp as a relative age.
fn format_age(stored: &str) -> String {
    let Ok(then) = NaiveDateTime::parse_from_str(stored, "%Y-%m-%d %H:%M:%S") else {
        return stored.to_string();
    };

    let delta = chrono::Utc::now()
        .naive_utc()
        .signed_duration_since(then)
        .num_seconds();

    if delta < 0 {
        return stored.to_string();
    }

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if delta < 86400 * 30 {
        let days = delta / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else {
        stored.to_string()
    }
}
