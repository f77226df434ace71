// src/config/mod.rs
//! Application configuration (TOML).
//!
//! Lookup order for the file:
//! 1) `$HOTBOARD_CONFIG_PATH`
//! 2) `config/hotboard.toml`
//! 3) built-in defaults (the three original categories)

pub mod seed;

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use once_cell::sync::OnceCell;
use regex::Regex;
use serde::Deserialize;

pub use seed::SeedData;

pub const ENV_CONFIG_PATH: &str = "HOTBOARD_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/hotboard.toml";

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
    #[serde(default)]
    pub categories: Vec<CategoryConfig>,
}

/// Where snapshots and the last-update registry live. `None` keeps them in memory.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    #[serde(default)]
    pub registry_path: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            cache_dir: Some(PathBuf::from("temp/cache")),
            registry_path: Some(PathBuf::from("temp/last_update.json")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Budget for one whole adapter fetch, retries and pacing included.
    #[serde(default = "default_adapter_timeout_secs")]
    pub adapter_timeout_secs: u64,
    #[serde(default = "default_retries")]
    pub retries: u8,
    #[serde(default = "default_pace_min_ms")]
    pub pace_min_ms: u64,
    #[serde(default = "default_pace_max_ms")]
    pub pace_max_ms: u64,
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string()
}
fn default_timeout_secs() -> u64 {
    5
}
fn default_adapter_timeout_secs() -> u64 {
    15
}
fn default_retries() -> u8 {
    3
}
fn default_pace_min_ms() -> u64 {
    1000
}
fn default_pace_max_ms() -> u64 {
    3000
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            adapter_timeout_secs: default_adapter_timeout_secs(),
            retries: default_retries(),
            pace_min_ms: default_pace_min_ms(),
            pace_max_ms: default_pace_max_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshConfig {
    /// Background refresh period; 0 disables the scheduler.
    #[serde(default)]
    pub scheduler_interval_secs: u64,
    /// Deadline for one whole get-all pass; 0 means none.
    #[serde(default = "default_request_deadline_secs")]
    pub request_deadline_secs: u64,
    /// First backoff step after an empty fetch; 0 disables the backoff.
    #[serde(default = "default_empty_backoff_base_secs")]
    pub empty_backoff_base_secs: u64,
    #[serde(default = "default_empty_backoff_max_secs")]
    pub empty_backoff_max_secs: u64,
}

fn default_request_deadline_secs() -> u64 {
    30
}
fn default_empty_backoff_base_secs() -> u64 {
    60
}
fn default_empty_backoff_max_secs() -> u64 {
    3600
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            scheduler_interval_secs: 0,
            request_deadline_secs: default_request_deadline_secs(),
            empty_backoff_base_secs: default_empty_backoff_base_secs(),
            empty_backoff_max_secs: default_empty_backoff_max_secs(),
        }
    }
}

/// One category and the source it is bound to.
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryConfig {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    pub refresh_interval_secs: u64,
    #[serde(default = "default_max_items")]
    pub max_items: usize,
    /// Label given to items that arrive without one.
    #[serde(default)]
    pub source_label: String,
    pub source: SourceConfig,
}

fn default_max_items() -> usize {
    20
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceConfig {
    Tophub {
        #[serde(default = "default_tophub_base")]
        base_url: String,
        #[serde(default = "default_tophub_nodes")]
        nodes: Vec<TophubNode>,
        #[serde(default = "default_nodes_per_fetch")]
        nodes_per_fetch: usize,
        #[serde(default = "default_items_per_node")]
        items_per_node: usize,
    },
    Sspai {
        #[serde(default = "default_sspai_base")]
        base_url: String,
        #[serde(default = "default_sspai_api")]
        api_url: String,
        #[serde(default = "default_sspai_tag_path")]
        tag_path: String,
        #[serde(default = "default_sspai_prefix")]
        title_prefix: String,
    },
    Maimai {
        #[serde(default = "default_maimai_base")]
        base_url: String,
        #[serde(default = "default_maimai_feed")]
        feed_url: String,
        #[serde(default = "default_maimai_company")]
        company_url: String,
        /// Env var holding the session cookie.
        #[serde(default = "default_maimai_cookie_env")]
        cookie_env: String,
    },
    Rss {
        url: String,
        #[serde(default)]
        label: String,
    },
}

impl SourceConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            SourceConfig::Tophub { .. } => "tophub",
            SourceConfig::Sspai { .. } => "sspai",
            SourceConfig::Maimai { .. } => "maimai",
            SourceConfig::Rss { .. } => "rss",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TophubNode {
    pub label: String,
    pub path: String,
}

fn default_tophub_base() -> String {
    "https://tophub.today".to_string()
}
fn default_tophub_nodes() -> Vec<TophubNode> {
    [
        ("36Kr", "/n/Q1Vd5Ko85R"),
        ("虎嗅网", "/n/74Kvx59dkx"),
        ("少数派", "/n/Y2KeDGQdNp"),
        ("FreeBuf", "/n/NX5pOXVzB7"),
    ]
    .into_iter()
    .map(|(label, path)| TophubNode {
        label: label.to_string(),
        path: path.to_string(),
    })
    .collect()
}
fn default_nodes_per_fetch() -> usize {
    2
}
fn default_items_per_node() -> usize {
    15
}
fn default_sspai_base() -> String {
    "https://sspai.com".to_string()
}
fn default_sspai_api() -> String {
    "https://sspai.com/api/v1/articles?limit=20&offset=0&is_matrix=1&sort=matrix_at".to_string()
}
fn default_sspai_tag_path() -> String {
    "/tag/AI".to_string()
}
fn default_sspai_prefix() -> String {
    "AI工具: ".to_string()
}
fn default_maimai_base() -> String {
    "https://maimai.cn".to_string()
}
fn default_maimai_feed() -> String {
    "https://maimai.cn/api/feed/list?u=&page=0&channel=1".to_string()
}
fn default_maimai_company() -> String {
    "https://maimai.cn/api/gossip/v2/hot_list".to_string()
}
fn default_maimai_cookie_env() -> String {
    "MAIMAI_COOKIE".to_string()
}

impl AppConfig {
    /// Built-in configuration mirroring the three original categories.
    pub fn builtin() -> Self {
        Self {
            storage: StorageConfig::default(),
            fetch: FetchConfig::default(),
            refresh: RefreshConfig::default(),
            categories: vec![
                CategoryConfig {
                    id: "workplace".into(),
                    display_name: "大厂八卦职场新闻".into(),
                    refresh_interval_secs: 3600,
                    max_items: 20,
                    source_label: "脉脉".into(),
                    source: SourceConfig::Maimai {
                        base_url: default_maimai_base(),
                        feed_url: default_maimai_feed(),
                        company_url: default_maimai_company(),
                        cookie_env: default_maimai_cookie_env(),
                    },
                },
                CategoryConfig {
                    id: "ai-tools".into(),
                    display_name: "AI工具".into(),
                    refresh_interval_secs: 7200,
                    max_items: 20,
                    source_label: "少数派AI专栏".into(),
                    source: SourceConfig::Sspai {
                        base_url: default_sspai_base(),
                        api_url: default_sspai_api(),
                        tag_path: default_sspai_tag_path(),
                        title_prefix: default_sspai_prefix(),
                    },
                },
                CategoryConfig {
                    id: "tech".into(),
                    display_name: "科技".into(),
                    refresh_interval_secs: 3600,
                    max_items: 20,
                    source_label: "科技媒体".into(),
                    source: SourceConfig::Tophub {
                        base_url: default_tophub_base(),
                        nodes: default_tophub_nodes(),
                        nodes_per_fetch: default_nodes_per_fetch(),
                        items_per_node: default_items_per_node(),
                    },
                },
            ],
        }
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: AppConfig = toml::from_str(s).context("parsing hotboard config")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// Load using env var + fallbacks (see module docs).
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            return Self::load_from(&pb);
        }
        let default_path = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default_path.exists() {
            return Self::load_from(&default_path);
        }
        tracing::info!("no config file found, using built-in categories");
        Ok(Self::builtin())
    }

    /// Basic sanity checks. Seed coverage is checked when the orchestrator is built.
    pub fn validate(&self) -> Result<()> {
        if self.categories.is_empty() {
            return Err(anyhow!("at least one [[categories]] entry is required"));
        }
        if self.fetch.timeout_secs == 0 {
            return Err(anyhow!("fetch.timeout_secs must be > 0"));
        }
        if self.fetch.adapter_timeout_secs == 0 {
            return Err(anyhow!("fetch.adapter_timeout_secs must be > 0"));
        }
        if self.fetch.pace_min_ms > self.fetch.pace_max_ms {
            return Err(anyhow!("fetch.pace_min_ms must be <= fetch.pace_max_ms"));
        }

        let mut seen = HashSet::new();
        for c in &self.categories {
            if !is_slug(&c.id) {
                return Err(anyhow!("category id '{}' must match [a-z0-9_-]+", c.id));
            }
            if !seen.insert(c.id.as_str()) {
                return Err(anyhow!("duplicate category id '{}'", c.id));
            }
            if c.refresh_interval_secs == 0 {
                return Err(anyhow!("category '{}': refresh_interval_secs must be > 0", c.id));
            }
            if c.max_items == 0 {
                return Err(anyhow!("category '{}': max_items must be > 0", c.id));
            }
            if let SourceConfig::Tophub { nodes, .. } = &c.source {
                if nodes.is_empty() {
                    return Err(anyhow!("category '{}': tophub needs at least one node", c.id));
                }
            }
        }
        Ok(())
    }
}

fn is_slug(s: &str) -> bool {
    static RE_SLUG: OnceCell<Regex> = OnceCell::new();
    let re = RE_SLUG.get_or_init(|| Regex::new(r"^[a-z0-9_-]+$").expect("slug regex"));
    re.is_match(s)
}
