// src/ingest/providers/tophub.rs
//! TopHub board pages (`/n/<node>`): a random sample of nodes per fetch,
//! paced, each contributing its top entries.

use async_trait::async_trait;
use metrics::counter;
use once_cell::sync::OnceCell;
use rand::seq::SliceRandom;
use regex::Regex;
use reqwest::Client;
use scraper::Html;

use super::{absolute_url, selector};
use crate::config::TophubNode;
use crate::error::FetchError;
use crate::ingest::http::{get_text, Pacing};
use crate::ingest::{normalize_text, strip_rank_prefix, Mode, SourceAdapter};
use crate::model::Item;

const ACCEPT_HTML: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";

pub struct TophubAdapter {
    /// Fixture mode: one captured page per node label.
    mode: Mode<Vec<(String, String)>>,
    client: Client,
    base_url: String,
    nodes: Vec<TophubNode>,
    nodes_per_fetch: usize,
    items_per_node: usize,
    pacing: Pacing,
    retries: u8,
}

impl TophubAdapter {
    pub fn http(client: Client, base_url: &str, nodes: Vec<TophubNode>) -> Self {
        Self {
            mode: Mode::Http,
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            nodes,
            nodes_per_fetch: 2,
            items_per_node: 15,
            pacing: Pacing::none(),
            retries: 3,
        }
    }

    /// Parse captured node pages instead of fetching; every page is used.
    pub fn from_fixtures(base_url: &str, pages: Vec<(String, String)>) -> Self {
        Self {
            mode: Mode::Fixture(pages),
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            nodes: Vec::new(),
            nodes_per_fetch: usize::MAX,
            items_per_node: 15,
            pacing: Pacing::none(),
            retries: 1,
        }
    }

    pub fn with_nodes_per_fetch(mut self, n: usize) -> Self {
        self.nodes_per_fetch = n.max(1);
        self
    }

    pub fn with_items_per_node(mut self, n: usize) -> Self {
        self.items_per_node = n.max(1);
        self
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_retries(mut self, retries: u8) -> Self {
        self.retries = retries;
        self
    }

    /// Parse one node page into items labelled with the node name.
    pub fn parse_page(
        &self,
        html: &str,
        label: &str,
    ) -> Result<Vec<Item>, FetchError> {
        let sel_link = selector(".cc-cd-cb-l a")?;
        let sel_title = selector(".t")?;
        let sel_hot = selector(".e")?;
        let sel_hot_fallback = selector(".cc-cd-cb-ll")?;

        let doc = Html::parse_document(html);
        let mut out = Vec::new();
        for (i, a) in doc.select(&sel_link).take(self.items_per_node).enumerate() {
            let raw_title = match a.select(&sel_title).next() {
                Some(t) => t.text().collect::<String>(),
                None => a.text().collect::<String>(),
            };
            let title = normalize_text(strip_rank_prefix(raw_title.trim()));
            if title.is_empty() {
                continue;
            }

            let hot_text = a
                .select(&sel_hot)
                .next()
                .or_else(|| a.select(&sel_hot_fallback).next())
                .map(|e| e.text().collect::<String>())
                .unwrap_or_default();
            let hot = parse_hot(&hot_text)
                .unwrap_or(((self.items_per_node - i) as u64) * 1000);

            let href = a.value().attr("href").unwrap_or_default();
            out.push(Item::new(title, hot, label).with_url(absolute_url(&self.base_url, href)));
        }
        Ok(out)
    }

    fn sample_nodes(&self) -> Vec<&TophubNode> {
        let mut picked: Vec<&TophubNode> = self.nodes.iter().collect();
        picked.shuffle(&mut rand::rng());
        picked.truncate(self.nodes_per_fetch);
        picked
    }

    async fn fetch_http(&self) -> Result<Vec<Item>, FetchError> {
        let headers = [
            ("Accept", ACCEPT_HTML),
            ("Accept-Language", "zh-CN,zh;q=0.9,en;q=0.8"),
        ];
        let referer = format!("{}/", self.base_url);
        let nodes = self.sample_nodes();

        let mut out = Vec::new();
        let mut last_err = None;
        let mut ok_nodes = 0usize;
        for (idx, node) in nodes.iter().enumerate() {
            if idx > 0 {
                self.pacing.pause().await;
            }
            let url = format!("{}{}", self.base_url, node.path);
            let mut h = headers.to_vec();
            h.push(("Referer", referer.as_str()));
            match get_text(&self.client, &url, &h, self.retries).await {
                Ok(body) => match self.parse_page(&body, &node.label) {
                    Ok(items) => {
                        tracing::debug!(target: "ingest", node = %node.label, items = items.len(), "tophub node parsed");
                        ok_nodes += 1;
                        out.extend(items);
                    }
                    Err(e) => {
                        tracing::warn!(target: "ingest", node = %node.label, error = %e, "tophub parse failed");
                        last_err = Some(e);
                    }
                },
                Err(e) => {
                    tracing::warn!(target: "ingest", node = %node.label, error = %e, "tophub node fetch failed");
                    counter!("hotboard_provider_errors_total", "provider" => "tophub").increment(1);
                    last_err = Some(e);
                }
            }
        }

        match (ok_nodes, last_err) {
            (0, Some(e)) => Err(e),
            _ => Ok(out),
        }
    }
}

#[async_trait]
impl SourceAdapter for TophubAdapter {
    async fn fetch(&self) -> Result<Vec<Item>, FetchError> {
        match &self.mode {
            Mode::Fixture(pages) => {
                let mut out = Vec::new();
                for (label, html) in pages {
                    out.extend(self.parse_page(html, label)?);
                }
                Ok(out)
            }
            Mode::Http => self.fetch_http().await,
        }
    }

    fn name(&self) -> &str {
        "tophub"
    }
}

/// Parse board heat text such as `"1.2万"`, `"35k"`, `"999+"` or `"12,345 热度"`.
pub fn parse_hot(s: &str) -> Option<u64> {
    static RE_HOT: OnceCell<Regex> = OnceCell::new();
    let re = RE_HOT.get_or_init(|| {
        Regex::new(r"(\d+(?:\.\d+)?)\s*(亿|万|[wWkK])?").expect("hot regex")
    });
    let cleaned: String = s.chars().filter(|c| *c != ',' && *c != '+').collect();
    let caps = re.captures(&cleaned)?;
    let n: f64 = caps.get(1)?.as_str().parse().ok()?;
    let mult = match caps.get(2).map(|m| m.as_str()) {
        Some("亿") => 100_000_000.0,
        Some("万") | Some("w") | Some("W") => 10_000.0,
        Some("k") | Some("K") => 1_000.0,
        _ => 1.0,
    };
    Some((n * mult).round() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_heat_suffixes() {
        assert_eq!(parse_hot("1.2万"), Some(12_000));
        assert_eq!(parse_hot("35k"), Some(35_000));
        assert_eq!(parse_hot("999+"), Some(999));
        assert_eq!(parse_hot("12,345 热度"), Some(12_345));
        assert_eq!(parse_hot("3亿"), Some(300_000_000));
        assert_eq!(parse_hot(""), None);
        assert_eq!(parse_hot("热"), None);
    }

    #[test]
    fn sample_respects_nodes_per_fetch() {
        let nodes = (0..4)
            .map(|i| TophubNode {
                label: format!("n{i}"),
                path: format!("/n/{i}"),
            })
            .collect();
        let a = TophubAdapter::http(Client::new(), "https://tophub.today", nodes)
            .with_nodes_per_fetch(2);
        let picked = a.sample_nodes();
        assert_eq!(picked.len(), 2);
        assert_ne!(picked[0].label, picked[1].label);
    }

    #[test]
    fn unparsable_heat_falls_back_to_position() {
        let html = r#"<div class="cc-cd-cb-l">
            <a href="/l?e=1"><span class="s">1</span><span class="t">First</span><span class="e">hot</span></a>
            <a href="/l?e=2"><span class="s">2</span><span class="t">Second</span></a>
        </div>"#;
        let a = TophubAdapter::from_fixtures("https://tophub.today", vec![]).with_items_per_node(15);
        let items = a.parse_page(html, "36Kr").unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].hot_score, 15_000);
        assert_eq!(items[1].hot_score, 14_000);
        assert_eq!(items[0].url.as_deref(), Some("https://tophub.today/l?e=1"));
        assert_eq!(items[0].source_label, "36Kr");
    }
}
