// tests/config_load.rs
use std::io::Write;

use hotboard::config::{seed, AppConfig, SeedData, ENV_CONFIG_PATH};
use hotboard::Orchestrator;
use serial_test::serial;

const SAMPLE_TOML: &str = r#"
[storage]
cache_dir = "temp/cache"
registry_path = "temp/last_update.json"

[fetch]
timeout_secs = 8
pace_min_ms = 0
pace_max_ms = 0

[refresh]
scheduler_interval_secs = 900
empty_backoff_base_secs = 0

[[categories]]
id = "tech"
display_name = "科技"
refresh_interval_secs = 3600
source_label = "科技媒体"
source = { kind = "tophub", nodes_per_fetch = 1 }

[[categories]]
id = "ai-tools"
refresh_interval_secs = 7200
max_items = 10
source = { kind = "sspai" }
"#;

#[test]
#[serial]
fn env_path_takes_precedence() {
    let mut f = tempfile::NamedTempFile::new().expect("tmp");
    f.write_all(SAMPLE_TOML.as_bytes()).unwrap();

    std::env::set_var(ENV_CONFIG_PATH, f.path());
    let cfg = AppConfig::load_default();
    std::env::remove_var(ENV_CONFIG_PATH);

    let cfg = cfg.expect("config loads");
    assert_eq!(cfg.fetch.timeout_secs, 8);
    assert_eq!(cfg.fetch.retries, 3, "unset fields keep defaults");
    assert_eq!(cfg.refresh.scheduler_interval_secs, 900);
    assert_eq!(cfg.categories.len(), 2);
    assert_eq!(cfg.categories[1].max_items, 10);
}

#[test]
#[serial]
fn env_path_to_missing_file_is_an_error() {
    std::env::set_var(ENV_CONFIG_PATH, "/definitely/not/here.toml");
    let res = AppConfig::load_default();
    std::env::remove_var(ENV_CONFIG_PATH);
    assert!(res.is_err());
}

#[test]
#[serial]
fn seed_env_override_is_honoured() {
    let mut f = tempfile::NamedTempFile::new().expect("tmp");
    f.write_all(br#"{"tech": [{"title": "override", "hot": 1, "source": "x"}]}"#)
        .unwrap();

    std::env::set_var(seed::ENV_SEED_PATH, f.path());
    let seeds = SeedData::load_default();
    std::env::remove_var(seed::ENV_SEED_PATH);

    let seeds = seeds.expect("seed loads");
    assert_eq!(seeds.get("tech")[0].title, "override");
    assert!(seeds.get("workplace").is_empty());
}

#[tokio::test]
async fn orchestrator_from_config_rejects_category_without_seed() {
    let mut cfg = AppConfig::from_toml_str(SAMPLE_TOML).unwrap();
    cfg.storage.cache_dir = None;
    cfg.storage.registry_path = None;

    let only_tech = SeedData::from_json_str(r#"{"tech": [{"title": "t", "hot": 1}]}"#).unwrap();
    let err = Orchestrator::from_config(&cfg, only_tech).await.err().expect("must fail");
    assert!(format!("{err:#}").contains("ai-tools"), "{err:#}");
}

#[tokio::test]
async fn builtin_config_and_bundled_seed_build_an_orchestrator() {
    let mut cfg = AppConfig::builtin();
    cfg.storage.cache_dir = None;
    cfg.storage.registry_path = None;
    let orch = Orchestrator::from_config(&cfg, SeedData::bundled().unwrap())
        .await
        .expect("builtin wiring");
    let ids: Vec<_> = orch.categories().map(|b| b.id.as_str()).collect();
    assert_eq!(ids, vec!["workplace", "ai-tools", "tech"]);
}

#[test]
fn shipped_config_file_matches_builtin_categories() {
    let cfg = AppConfig::load_from(std::path::Path::new("config/hotboard.toml"))
        .expect("shipped config parses");
    let ids: Vec<_> = cfg.categories.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["workplace", "ai-tools", "tech"]);
    let kinds: Vec<_> = cfg.categories.iter().map(|c| c.source.kind()).collect();
    assert_eq!(kinds, vec!["maimai", "sspai", "tophub"]);
    assert_eq!(cfg.categories[1].refresh_interval_secs, 7200);
}

#[tokio::test]
async fn adapter_budget_comes_from_config() {
    let mut cfg = AppConfig::builtin();
    cfg.storage.cache_dir = None;
    cfg.storage.registry_path = None;
    cfg.fetch.timeout_secs = 4;
    cfg.fetch.adapter_timeout_secs = 12;
    let orch = Orchestrator::from_config(&cfg, SeedData::bundled().unwrap())
        .await
        .expect("builtin wiring");
    for b in orch.categories() {
        assert_eq!(b.fetch_timeout, std::time::Duration::from_secs(12), "{}", b.id);
    }
}
