// src/ingest/providers/sspai.rs
//! SSPAI: article API filtered to AI-tagged posts, plus the AI tag page.
//! Heat = likes + 2 × comments.

use async_trait::async_trait;
use metrics::counter;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use serde_json::Value;

use super::{absolute_url, selector};
use crate::error::FetchError;
use crate::ingest::http::{get_text, Pacing};
use crate::ingest::{normalize_text, Mode, SourceAdapter};
use crate::model::Item;

pub const SOURCE_LABEL: &str = "少数派AI专栏";
const AI_TAG_NEEDLES: [&str; 3] = ["ai", "人工智能", "chatgpt"];
const MAX_PER_CHANNEL: usize = 20;

/// Captured payloads for fixture mode; `None` behaves like a failed channel.
#[derive(Debug, Clone, Default)]
pub struct SspaiFixture {
    pub api_json: Option<String>,
    pub tag_html: Option<String>,
}

pub struct SspaiAdapter {
    mode: Mode<SspaiFixture>,
    client: Client,
    base_url: String,
    api_url: String,
    tag_path: String,
    title_prefix: String,
    pacing: Pacing,
    retries: u8,
}

#[derive(Debug, Deserialize)]
struct ApiArticle {
    #[serde(default)]
    id: Value,
    #[serde(default)]
    title: String,
    #[serde(default)]
    tags: Vec<ApiTag>,
    #[serde(default)]
    like_count: u64,
    #[serde(default)]
    comment_count: u64,
}

#[derive(Debug, Deserialize)]
struct ApiTag {
    #[serde(default)]
    name: String,
}

impl SspaiAdapter {
    pub fn http(client: Client, base_url: &str, api_url: &str, tag_path: &str) -> Self {
        Self {
            mode: Mode::Http,
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_url: api_url.to_string(),
            tag_path: tag_path.to_string(),
            title_prefix: String::new(),
            pacing: Pacing::none(),
            retries: 3,
        }
    }

    pub fn from_fixture(base_url: &str, fixture: SspaiFixture) -> Self {
        Self {
            mode: Mode::Fixture(fixture),
            ..Self::http(Client::new(), base_url, "", "")
        }
    }

    pub fn with_title_prefix(mut self, prefix: &str) -> Self {
        self.title_prefix = prefix.to_string();
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

    fn titled(&self, title: &str) -> String {
        format!("{}{}", self.title_prefix, title)
    }

    /// Articles from the API body (`{"data": [...]}` or a bare array),
    /// keeping only AI-tagged ones.
    pub fn parse_api(&self, body: &str) -> Result<Vec<Item>, FetchError> {
        let v: Value = serde_json::from_str(body).map_err(FetchError::parse)?;
        let list = match v {
            Value::Array(a) => a,
            Value::Object(mut o) => match o.remove("data") {
                Some(Value::Array(a)) => a,
                _ => return Err(FetchError::parse("sspai api: no data array")),
            },
            _ => return Err(FetchError::parse("sspai api: unexpected shape")),
        };

        let mut out = Vec::new();
        for raw in list.into_iter().take(MAX_PER_CHANNEL) {
            let art: ApiArticle = match serde_json::from_value(raw) {
                Ok(a) => a,
                Err(e) => {
                    tracing::debug!(target: "ingest", error = %e, "skipping malformed sspai article");
                    continue;
                }
            };
            if !is_ai_article(&art.tags) {
                continue;
            }
            let title = normalize_text(&art.title);
            if title.is_empty() {
                continue;
            }
            let id = match &art.id {
                Value::Number(n) => n.to_string(),
                Value::String(s) => s.clone(),
                _ => String::new(),
            };
            let url = if id.is_empty() {
                String::new()
            } else {
                format!("{}/post/{id}", self.base_url)
            };
            let hot = art.like_count + art.comment_count * 2;
            out.push(Item::new(self.titled(&title), hot, SOURCE_LABEL).with_url(url));
        }
        Ok(out)
    }

    /// Cards from the tag page (`.article-card`, or `.brief` on older layouts).
    pub fn parse_tag_page(&self, html: &str) -> Result<Vec<Item>, FetchError> {
        let sel_card = selector(".article-card")?;
        let sel_brief = selector(".brief")?;
        let sel_title = selector(".title")?;
        let sel_h2 = selector("h2")?;
        let sel_link = selector("a")?;
        let sel_like = selector(".like-count")?;
        let sel_comment = selector(".comment-count")?;

        let doc = Html::parse_document(html);
        let mut cards: Vec<_> = doc.select(&sel_card).collect();
        if cards.is_empty() {
            cards = doc.select(&sel_brief).collect();
        }

        let mut out = Vec::new();
        for card in cards.into_iter().take(MAX_PER_CHANNEL) {
            let Some(title_el) = card
                .select(&sel_title)
                .next()
                .or_else(|| card.select(&sel_h2).next())
            else {
                continue;
            };
            let title = normalize_text(&title_el.text().collect::<String>());
            if title.is_empty() {
                continue;
            }
            let Some(link) = card.select(&sel_link).next() else {
                continue;
            };
            let href = link.value().attr("href").unwrap_or_default();
            let hot = count(&card, &sel_like) + count(&card, &sel_comment) * 2;
            out.push(
                Item::new(self.titled(&title), hot, SOURCE_LABEL)
                    .with_url(absolute_url(&self.base_url, href)),
            );
        }
        Ok(out)
    }

    async fn api_channel(&self) -> Result<Vec<Item>, FetchError> {
        let referer = format!("{}/", self.base_url);
        let body = get_text(&self.client, &self.api_url, &[("Referer", referer.as_str())], self.retries).await?;
        self.parse_api(&body)
    }

    async fn tag_channel(&self) -> Result<Vec<Item>, FetchError> {
        let url = format!("{}{}", self.base_url, self.tag_path);
        let referer = format!("{}/", self.base_url);
        let body = get_text(&self.client, &url, &[("Referer", referer.as_str())], self.retries).await?;
        self.parse_tag_page(&body)
    }
}

fn count(card: &ElementRef<'_>, sel: &Selector) -> u64 {
    card.select(sel)
        .next()
        .and_then(|e| e.text().collect::<String>().trim().parse().ok())
        .unwrap_or(0)
}

fn is_ai_article(tags: &[ApiTag]) -> bool {
    tags.iter().any(|t| {
        let name = t.name.to_lowercase();
        AI_TAG_NEEDLES.iter().any(|n| name.contains(n))
    })
}

/// Concatenate both channels; fail only when both failed.
fn combine(
    api: Result<Vec<Item>, FetchError>,
    tag: Result<Vec<Item>, FetchError>,
) -> Result<Vec<Item>, FetchError> {
    match (api, tag) {
        (Err(e), Err(_)) => Err(e),
        (api, tag) => {
            let mut out = Vec::new();
            for (channel, res) in [("api", api), ("tag", tag)] {
                match res {
                    Ok(items) => out.extend(items),
                    Err(e) => {
                        tracing::warn!(target: "ingest", channel, error = %e, "sspai channel failed");
                        counter!("hotboard_provider_errors_total", "provider" => "sspai").increment(1);
                    }
                }
            }
            Ok(out)
        }
    }
}

#[async_trait]
impl SourceAdapter for SspaiAdapter {
    async fn fetch(&self) -> Result<Vec<Item>, FetchError> {
        match &self.mode {
            Mode::Fixture(f) => {
                let missing = || FetchError::parse("no fixture");
                let api = f
                    .api_json
                    .as_deref()
                    .ok_or_else(missing)
                    .and_then(|s| self.parse_api(s));
                let tag = f
                    .tag_html
                    .as_deref()
                    .ok_or_else(missing)
                    .and_then(|s| self.parse_tag_page(s));
                combine(api, tag)
            }
            Mode::Http => {
                let api = self.api_channel().await;
                self.pacing.pause().await;
                let tag = self.tag_channel().await;
                combine(api, tag)
            }
        }
    }

    fn name(&self) -> &str {
        "sspai"
    }
}
