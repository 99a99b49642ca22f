use sqlx::SqlitePool;

use recipe_pantry::config::{Config, DbConfig};
use recipe_pantry::db;
use recipe_pantry::error::StoreError;
use recipe_pantry::migrate;
use recipe_pantry::models::UsageRecord;
use recipe_pantry::store::Store;

/// A migrated in-memory store plus a raw handle to the same pool for
/// fixtures and direct assertions.
async fn setup() -> (Store, SqlitePool) {
    let pool = db::connect_in_memory().await.expect("connect");
    migrate::run_migrations(&pool).await.expect("migrate");
    (Store::new(pool.clone()), pool)
}

#[tokio::test]
async fn insert_then_get_roundtrips() {
    let (store, _pool) = setup().await;

    store
        .insert("http://example.com", r#"{"title":"recipe"}"#)
        .await
        .unwrap();

    let summary = store.get("http://example.com").await.unwrap();
    assert_eq!(summary.as_deref(), Some(r#"{"title":"recipe"}"#));

    assert_eq!(store.get("http://foo.com").await.unwrap(), None);
}

#[tokio::test]
async fn duplicate_insert_is_a_conflict() {
    let (store, _pool) = setup().await;

    store
        .insert("http://example.com", r#"{"title":"recipe"}"#)
        .await
        .unwrap();
    let err = store
        .insert("http://example.com", r#"{"title":"recipe"}"#)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Conflict));
}

#[tokio::test]
async fn malformed_summary_leaves_nothing_behind() {
    let (store, pool) = setup().await;

    let err = store.insert("http://example.com", "recipe").await.unwrap_err();
    assert!(matches!(err, StoreError::MalformedPayload));

    // No document, no search entry.
    assert_eq!(store.get("http://example.com").await.unwrap(), None);
    assert!(store.search("recipe").await.unwrap().is_empty());

    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM recipes")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(rows, 0);
}

#[tokio::test]
async fn sentinel_summary_is_always_accepted() {
    let (store, _pool) = setup().await;

    let err = store.insert("http://example.com", "oops").await.unwrap_err();
    assert!(matches!(err, StoreError::MalformedPayload));

    // The retry path with the empty-string sentinel must never fail the
    // same way.
    store.insert("http://example.com", r#""""#).await.unwrap();
    assert_eq!(
        store.get("http://example.com").await.unwrap().as_deref(),
        Some(r#""""#)
    );
}

#[tokio::test]
async fn listings_exclude_sentinel_summaries() {
    let (store, _pool) = setup().await;

    store
        .insert("http://example.com", r#"{"title":"recipe"}"#)
        .await
        .unwrap();
    store
        .insert("http://example2.com", r#"{"title":"recipe2"}"#)
        .await
        .unwrap();
    store.insert("http://example3.com", r#""""#).await.unwrap();

    let recents = store.recents(5).await.unwrap();
    assert_eq!(recents.len(), 2);
    assert!(recents.iter().all(|e| e.url != "http://example3.com"));

    let faves = store.favorites(5).await.unwrap();
    assert_eq!(faves.len(), 2);
    assert!(faves.iter().all(|e| e.url != "http://example3.com"));
}

#[tokio::test]
async fn listings_report_summary_completeness() {
    let (store, _pool) = setup().await;

    store
        .insert(
            "http://example.com",
            r#"{"title":"full","ingredients":["flour"],"method":["mix"]}"#,
        )
        .await
        .unwrap();
    store
        .insert("http://example2.com", r#"{"title":"bare"}"#)
        .await
        .unwrap();

    let recents = store.recents(5).await.unwrap();
    let full = recents.iter().find(|e| e.url == "http://example.com").unwrap();
    let bare = recents
        .iter()
        .find(|e| e.url == "http://example2.com")
        .unwrap();
    assert!(full.has_summary);
    assert!(!bare.has_summary);
    assert_eq!(full.title.as_deref(), Some("full"));
}

#[tokio::test]
async fn favorites_follow_hit_counts() {
    let (store, _pool) = setup().await;

    store
        .insert("http://example.com", r#"{"title":"recipe"}"#)
        .await
        .unwrap();
    store
        .insert("http://example2.com", r#"{"title":"recipe2"}"#)
        .await
        .unwrap();

    for _ in 0..3 {
        store.hit("http://example2.com").await;
    }

    let faves = store.favorites(1).await.unwrap();
    assert_eq!(faves.len(), 1);
    assert_eq!(faves[0].url, "http://example2.com");
}

#[tokio::test]
async fn hit_on_absent_url_is_a_noop() {
    let (store, pool) = setup().await;

    store
        .insert("http://example.com", r#"{"title":"recipe"}"#)
        .await
        .unwrap();
    store.hit("http://nowhere.example").await;

    let count: i64 =
        sqlx::query_scalar("SELECT hit_count FROM recipes WHERE url = 'http://example.com'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn concurrent_hits_are_all_counted() {
    let (store, pool) = setup().await;

    store
        .insert("http://example.com", r#"{"title":"recipe"}"#)
        .await
        .unwrap();

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..32 {
        let store = store.clone();
        tasks.spawn(async move { store.hit("http://example.com").await });
    }
    while let Some(res) = tasks.join_next().await {
        res.unwrap();
    }

    let count: i64 =
        sqlx::query_scalar("SELECT hit_count FROM recipes WHERE url = 'http://example.com'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(count, 32);
}

#[tokio::test]
async fn get_advances_last_access() {
    let (store, pool) = setup().await;

    // Seed with fixed timestamps so the initial ordering is unambiguous.
    sqlx::query(
        "INSERT INTO recipes (url, summary, last_access, hit_count) \
         VALUES ('http://example.com', '{\"title\":\"recipe\"}', '2016-03-29', 0)",
    )
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query(
        "INSERT INTO recipes (url, summary, last_access, hit_count) \
         VALUES ('http://example2.com', '{\"title\":\"recipe2\"}', '2016-03-30', 0)",
    )
    .execute(&pool)
    .await
    .unwrap();

    let recents = store.recents(1).await.unwrap();
    assert_eq!(recents.len(), 1);
    assert_eq!(recents[0].url, "http://example2.com");
    assert_eq!(recents[0].title.as_deref(), Some("recipe2"));

    // Reading the older recipe makes it the freshest.
    assert!(store.get("http://example.com").await.unwrap().is_some());

    let recents = store.recents(1).await.unwrap();
    assert_eq!(recents.len(), 1);
    assert_eq!(recents[0].url, "http://example.com");
    assert_eq!(recents[0].title.as_deref(), Some("recipe"));
}

#[tokio::test]
async fn insert_advances_last_access() {
    let (store, pool) = setup().await;

    sqlx::query(
        "INSERT INTO recipes (url, summary, last_access, hit_count) \
         VALUES ('http://example2.com', '{\"title\":\"recipe2\"}', '2016-03-30', 0)",
    )
    .execute(&pool)
    .await
    .unwrap();

    let recents = store.recents(1).await.unwrap();
    assert_eq!(recents[0].url, "http://example2.com");

    store
        .insert("http://example.com", r#"{"title":"recipe"}"#)
        .await
        .unwrap();

    let recents = store.recents(1).await.unwrap();
    assert_eq!(recents[0].url, "http://example.com");
}

#[tokio::test]
async fn search_matches_tokens_prefixes_and_phrases() {
    let (store, _pool) = setup().await;

    store
        .insert("http://example.com", r#"{"title":"one two"}"#)
        .await
        .unwrap();
    store
        .insert("http://example2.com", r#"{"title":"one three"}"#)
        .await
        .unwrap();

    // Both titles carry "one".
    assert_eq!(store.search("one").await.unwrap().len(), 2);

    // All tokens must match.
    assert_eq!(store.search("one two").await.unwrap().len(), 1);
    assert_eq!(store.search("one two three").await.unwrap().len(), 0);

    // The final token is widened to a prefix.
    let hits = store.search("one thr").await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].url, "http://example2.com");
    assert_eq!(hits[0].title.as_deref(), Some("one three"));

    // Quoted phrases match exactly, with no prefix widening.
    assert_eq!(store.search("\"one three\"").await.unwrap().len(), 1);
    assert_eq!(store.search("\"one thr\"").await.unwrap().len(), 0);
}

#[tokio::test]
async fn empty_search_pattern_yields_nothing() {
    let (store, _pool) = setup().await;

    store
        .insert("http://example.com", r#"{"title":"recipe"}"#)
        .await
        .unwrap();

    assert!(store.search("").await.unwrap().is_empty());
}

#[tokio::test]
async fn rebuild_recovers_rows_written_behind_the_store() {
    let (store, pool) = setup().await;

    // A row inserted around the write-path facade has no index entry...
    sqlx::query(
        "INSERT INTO recipes (url, summary, last_access, hit_count) \
         VALUES ('http://example.com', '{\"title\":\"orphan dish\"}', datetime('now'), 0)",
    )
    .execute(&pool)
    .await
    .unwrap();
    assert!(store.search("orphan").await.unwrap().is_empty());

    // ...until the index is rebuilt from the recipe table.
    store.rebuild_search_index().await.unwrap();
    assert_eq!(store.search("orphan").await.unwrap().len(), 1);
}

#[tokio::test]
async fn usage_appends_records() {
    let (store, pool) = setup().await;

    let record = UsageRecord {
        url: "http://example.com".into(),
        length_in: 4096,
        length_out: 512,
        tokens_in: 1024,
        tokens_out: 128,
    };
    store.usage(&record).await;
    store.usage(&record).await;

    let rows: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM usage WHERE url = 'http://example.com' AND tokens_in = 1024",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(rows, 2);
}

#[tokio::test]
async fn session_registry_keeps_only_the_latest_nonce() {
    let (store, pool) = setup().await;

    assert_eq!(store.get_session("a@example.com").await.unwrap(), None);

    store.put_session("a@example.com", "n1").await.unwrap();
    store.put_session("a@example.com", "n2").await.unwrap();

    assert_eq!(
        store.get_session("a@example.com").await.unwrap().as_deref(),
        Some("n2")
    );

    let rows: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM session WHERE email = 'a@example.com'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(rows, 1);
}

#[tokio::test]
async fn store_and_index_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = Config {
        db: DbConfig {
            path: dir.path().join("pantry.db"),
        },
        lists: Default::default(),
        auth: Default::default(),
    };

    {
        let store = Store::open(&cfg).await.unwrap();
        store
            .insert("http://example.com", r#"{"title":"persistent pie"}"#)
            .await
            .unwrap();
        store.close().await;
    }

    let store = Store::open(&cfg).await.unwrap();
    assert!(store.get("http://example.com").await.unwrap().is_some());
    assert_eq!(store.search("persistent").await.unwrap().len(), 1);
    store.close().await;
}
