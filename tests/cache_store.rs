// tests/cache_store.rs
use hotboard::cache::{CacheStore, FileCacheStore, LastUpdateRegistry};
use hotboard::{CacheError, Item, Snapshot};

fn snap(category: &str, titles: &[&str], ts: i64) -> Snapshot {
    let items = titles.iter().map(|t| Item::new(*t, 1, "src")).collect();
    Snapshot::new(category, items, ts)
}

#[tokio::test]
async fn file_store_round_trips_and_overwrites_wholesale() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FileCacheStore::new(dir.path().join("cache"));

    store.save("tech", &snap("tech", &["a", "b", "c"], 100)).await.unwrap();
    store.save("tech", &snap("tech", &["z"], 200)).await.unwrap();

    let loaded = store.load("tech").await.unwrap().expect("snapshot");
    assert_eq!(loaded, snap("tech", &["z"], 200), "no merge with the older snapshot");
}

#[tokio::test]
async fn file_store_keeps_one_file_per_category_and_no_temp_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FileCacheStore::new(dir.path());

    store.save("tech", &snap("tech", &["t"], 1)).await.unwrap();
    store.save("ai-tools", &snap("ai-tools", &["a"], 1)).await.unwrap();

    let mut names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, vec!["ai-tools.json", "tech.json"]);

    assert_eq!(
        store.load("ai-tools").await.unwrap().unwrap().items[0].title,
        "a"
    );
}

#[tokio::test]
async fn corrupt_snapshot_is_a_json_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("tech.json"), b"{\"category\":").unwrap();
    let store = FileCacheStore::new(dir.path());
    assert!(matches!(store.load("tech").await, Err(CacheError::Json(_))));
}

#[tokio::test]
async fn snapshot_file_uses_frontend_field_names() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FileCacheStore::new(dir.path());
    let s = Snapshot::new(
        "tech",
        vec![Item::new("t", 42, "36Kr").with_url("https://36kr.com/p/1")],
        1_760_000_000,
    );
    store.save("tech", &s).await.unwrap();

    let raw = std::fs::read_to_string(dir.path().join("tech.json")).unwrap();
    let v: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(v["fetched_at"], 1_760_000_000);
    assert_eq!(v["items"][0]["hot"], 42);
    assert_eq!(v["items"][0]["source"], "36Kr");
}

#[tokio::test]
async fn registry_file_is_a_flat_category_map() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("last_update.json");
    let reg = LastUpdateRegistry::load(&path).await;
    reg.record("tech", 10).await.unwrap();
    reg.record("workplace", 20).await.unwrap();

    let raw = std::fs::read_to_string(&path).unwrap();
    let v: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(v, serde_json::json!({"tech": 10, "workplace": 20}));
}
