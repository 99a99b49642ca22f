//! # Recipe Pantry CLI (`pantry`)
//!
//! The `pantry` binary is the admin and development interface to the recipe
//! store. It provides commands for database initialization, direct inserts,
//! ranked listings, search, session management, and statistics.
//!
//! ## Usage
//!
//! ```bash
//! pantry --config ./config/pantry.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `pantry init` | Create the SQLite database and run schema migrations |
//! | `pantry add <url> <summary>` | Store a summary JSON for a url |
//! | `pantry show <url>` | Print the stored summary for a url |
//! | `pantry search "<pattern>"` | Search stored recipes |
//! | `pantry recents` | List the most recently accessed recipes |
//! | `pantry favorites` | List the most frequently accessed recipes |
//! | `pantry hit <url>` | Record a popularity hit for a url |
//! | `pantry reindex` | Rebuild the search index from the recipe table |
//! | `pantry session get <email>` | Print the live nonce for an email |
//! | `pantry session put <email> <nonce>` | Register a nonce for an email |
//! | `pantry stats` | Print database statistics |

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use recipe_pantry::config;
use recipe_pantry::models::RecipeEntry;
use recipe_pantry::stats;
use recipe_pantry::store::Store;

/// Recipe Pantry CLI — a recipe summary store with ranked views and
/// full-text search.
#[derive(Parser)]
#[command(
    name = "pantry",
    about = "Recipe Pantry — a recipe summary store with ranked views and full-text search",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/pantry.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and applies any pending migrations.
    /// This command is idempotent — running it multiple times is safe.
    Init,

    /// Store a summary for a url.
    ///
    /// The summary must be valid JSON; pass `'""'` to record that a page was
    /// fetched but yielded nothing extractable.
    Add {
        url: String,
        /// Summary JSON.
        summary: String,
    },

    /// Print the stored summary for a url.
    Show { url: String },

    /// Search stored recipes.
    ///
    /// A pattern ending in a letter treats the final token as a prefix;
    /// quote a phrase to match it exactly.
    Search { pattern: String },

    /// List the most recently accessed recipes.
    Recents {
        /// Maximum number of entries to list.
        #[arg(long)]
        count: Option<i64>,
    },

    /// List the most frequently accessed recipes.
    Favorites {
        /// Maximum number of entries to list.
        #[arg(long)]
        count: Option<i64>,
    },

    /// Record a popularity hit for a url.
    Hit { url: String },

    /// Rebuild the search index from the recipe table.
    Reindex,

    /// Inspect or issue session nonces.
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },

    /// Print database statistics.
    Stats,
}

/// Session registry subcommands.
#[derive(Subcommand)]
enum SessionAction {
    /// Print the live nonce for an email, if any.
    Get { email: String },

    /// Register a nonce for an email, replacing any prior one.
    Put { email: String, nonce: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let store = Store::open(&cfg).await?;
            store.close().await;
            println!("Database initialized successfully.");
        }
        Commands::Add { url, summary } => {
            let store = Store::open(&cfg).await?;
            store.insert(&url, &summary).await?;
            println!("Stored {}.", url);
        }
        Commands::Show { url } => {
            let store = Store::open(&cfg).await?;
            match store.get(&url).await? {
                Some(summary) => print_summary(&summary),
                None => println!("No recipe stored for {}.", url),
            }
        }
        Commands::Search { pattern } => {
            let store = Store::open(&cfg).await?;
            let results = store.search(&pattern).await?;
            if results.is_empty() {
                println!("No results.");
            }
            for (i, hit) in results.iter().enumerate() {
                println!(
                    "{}. {} — {}",
                    i + 1,
                    hit.title.as_deref().unwrap_or("(untitled)"),
                    hit.url
                );
            }
        }
        Commands::Recents { count } => {
            let store = Store::open(&cfg).await?;
            let entries = store
                .recents(count.unwrap_or(cfg.lists.default_count))
                .await?;
            print_listing(&entries);
        }
        Commands::Favorites { count } => {
            let store = Store::open(&cfg).await?;
            let entries = store
                .favorites(count.unwrap_or(cfg.lists.default_count))
                .await?;
            print_listing(&entries);
        }
        Commands::Hit { url } => {
            let store = Store::open(&cfg).await?;
            store.hit(&url).await;
            println!("Recorded hit for {}.", url);
        }
        Commands::Reindex => {
            let store = Store::open(&cfg).await?;
            store.rebuild_search_index().await?;
            println!("Search index rebuilt.");
        }
        Commands::Session { action } => {
            let store = Store::open(&cfg).await?;
            match action {
                SessionAction::Get { email } => match store.get_session(&email).await? {
                    Some(nonce) => println!("{}", nonce),
                    None => println!("No session registered for {}.", email),
                },
                SessionAction::Put { email, nonce } => {
                    store.put_session(&email, &nonce).await?;
                    println!("Session registered for {}.", email);
                }
            }
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
    }

    Ok(())
}

fn print_listing(entries: &[RecipeEntry]) {
    if entries.is_empty() {
        println!("Nothing stored yet.");
    }
    for (i, entry) in entries.iter().enumerate() {
        println!(
            "{}. {} — {}{}",
            i + 1,
            entry.title.as_deref().unwrap_or("(untitled)"),
            entry.url,
            if entry.has_summary { "" } else { "  [partial]" }
        );
    }
}

/// Pretty-print a stored summary. The store keeps summaries minified; the
/// round-trip through `serde_json` is purely cosmetic.
fn print_summary(summary: &str) {
    match serde_json::from_str::<serde_json::Value>(summary) {
        Ok(value) => match serde_json::to_string_pretty(&value) {
            Ok(pretty) => println!("{}", pretty),
            Err(_) => println!("{}", summary),
        },
        Err(_) => println!("{}", summary),
    }
}
