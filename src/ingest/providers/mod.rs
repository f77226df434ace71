// src/ingest/providers/mod.rs
pub mod maimai;
pub mod rss;
pub mod sspai;
pub mod tophub;

use std::sync::Arc;

use anyhow::Result;
use reqwest::Client;
use scraper::Selector;

use crate::config::{CategoryConfig, FetchConfig, SourceConfig};
use crate::error::FetchError;
use crate::ingest::http::Pacing;
use crate::ingest::SourceAdapter;

/// Build the live adapter a category is bound to.
pub fn build_adapter(
    category: &CategoryConfig,
    fetch: &FetchConfig,
    client: Client,
) -> Result<Arc<dyn SourceAdapter>> {
    let pacing = Pacing::from_config(fetch);
    let retries = fetch.retries;
    let adapter: Arc<dyn SourceAdapter> = match &category.source {
        SourceConfig::Tophub {
            base_url,
            nodes,
            nodes_per_fetch,
            items_per_node,
        } => Arc::new(
            tophub::TophubAdapter::http(client, base_url, nodes.clone())
                .with_nodes_per_fetch(*nodes_per_fetch)
                .with_items_per_node(*items_per_node)
                .with_pacing(pacing)
                .with_retries(retries),
        ),
        SourceConfig::Sspai {
            base_url,
            api_url,
            tag_path,
            title_prefix,
        } => Arc::new(
            sspai::SspaiAdapter::http(client, base_url, api_url, tag_path)
                .with_title_prefix(title_prefix)
                .with_pacing(pacing)
                .with_retries(retries),
        ),
        SourceConfig::Maimai {
            base_url,
            feed_url,
            company_url,
            cookie_env,
        } => {
            let cookie = std::env::var(cookie_env).ok().filter(|c| !c.trim().is_empty());
            if cookie.is_none() {
                tracing::warn!(target: "ingest", category = %category.id, env = %cookie_env, "no maimai cookie set; upstream will likely reject");
            }
            Arc::new(
                maimai::MaimaiAdapter::http(client, base_url, feed_url, company_url, cookie)
                    .with_pacing(pacing)
                    .with_retries(retries),
            )
        }
        SourceConfig::Rss { url, label } => {
            let label = if label.is_empty() {
                category.source_label.as_str()
            } else {
                label.as_str()
            };
            Arc::new(rss::RssAdapter::http(client, url, label).with_retries(retries))
        }
    };
    Ok(adapter)
}

pub(crate) fn selector(s: &str) -> Result<Selector, FetchError> {
    Selector::parse(s).map_err(|e| FetchError::parse(format!("selector '{s}': {e:?}")))
}

/// Resolve `href` against `base`, falling back to the raw value.
pub(crate) fn absolute_url(base: &str, href: &str) -> String {
    let href = href.trim();
    if href.is_empty() {
        return String::new();
    }
    match url::Url::parse(base).and_then(|b| b.join(href)) {
        Ok(u) => u.to_string(),
        Err(_) => href.to_string(),
    }
}
