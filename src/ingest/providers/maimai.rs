// src/ingest/providers/maimai.rs
//! Maimai workplace gossip: the hot feed and the company hot list.
//!
//! Both endpoints answer `{"code": 0, "data": {"list": [...]}}`; any other
//! code means the session was refused. Authentication is a browser cookie
//! supplied through the environment.

use async_trait::async_trait;
use metrics::counter;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::error::FetchError;
use crate::ingest::http::{get_text, Pacing};
use crate::ingest::{normalize_text, truncate_chars, Mode, SourceAdapter};
use crate::model::Item;

pub const FEED_LABEL: &str = "脉脉热门";
pub const COMPANY_LABEL: &str = "脉脉公司热榜";
const FEED_TITLE_CHARS: usize = 80;
const MAX_PER_CHANNEL: usize = 20;

#[derive(Debug, Clone, Default)]
pub struct MaimaiFixture {
    pub feed_json: Option<String>,
    pub company_json: Option<String>,
}

pub struct MaimaiAdapter {
    mode: Mode<MaimaiFixture>,
    client: Client,
    base_url: String,
    feed_url: String,
    company_url: String,
    cookie: Option<String>,
    pacing: Pacing,
    retries: u8,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default = "missing_code")]
    code: i64,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    data: Option<ListData>,
}

fn missing_code() -> i64 {
    -1
}

#[derive(Debug, Deserialize)]
struct ListData {
    #[serde(default)]
    list: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct FeedEntry {
    #[serde(default)]
    id: Value,
    #[serde(default)]
    text: String,
    #[serde(default)]
    like_cnt: u64,
    #[serde(default)]
    comment_cnt: u64,
    #[serde(default)]
    company: Option<Company>,
}

#[derive(Debug, Deserialize)]
struct Company {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct CompanyEntry {
    #[serde(default)]
    id: Value,
    #[serde(default)]
    title: String,
    #[serde(default)]
    hot: u64,
    #[serde(default)]
    company_name: String,
}

impl MaimaiAdapter {
    pub fn http(
        client: Client,
        base_url: &str,
        feed_url: &str,
        company_url: &str,
        cookie: Option<String>,
    ) -> Self {
        Self {
            mode: Mode::Http,
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            feed_url: feed_url.to_string(),
            company_url: company_url.to_string(),
            cookie,
            pacing: Pacing::none(),
            retries: 3,
        }
    }

    pub fn from_fixture(base_url: &str, fixture: MaimaiFixture) -> Self {
        Self {
            mode: Mode::Fixture(fixture),
            ..Self::http(Client::new(), base_url, "", "", None)
        }
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_retries(mut self, retries: u8) -> Self {
        self.retries = retries;
        self
    }

    fn detail_url(&self, id: &Value) -> String {
        match id {
            Value::Number(n) => format!("{}/web/gossip_detail/{n}", self.base_url),
            Value::String(s) if !s.is_empty() => format!("{}/web/gossip_detail/{s}", self.base_url),
            _ => String::new(),
        }
    }

    /// Hot feed: title is the post text cut to 80 chars, heat = likes + comments.
    pub fn parse_feed(&self, body: &str) -> Result<Vec<Item>, FetchError> {
        let mut out = Vec::new();
        for raw in unwrap_list(body)?.into_iter().take(MAX_PER_CHANNEL) {
            let Ok(e) = serde_json::from_value::<FeedEntry>(raw) else {
                continue;
            };
            let text = normalize_text(&e.text);
            if text.is_empty() {
                continue;
            }
            let title = with_company(
                e.company.as_ref().map(|c| c.name.as_str()),
                truncate_chars(&text, FEED_TITLE_CHARS),
            );
            out.push(
                Item::new(title, e.like_cnt + e.comment_cnt, FEED_LABEL)
                    .with_url(self.detail_url(&e.id)),
            );
        }
        Ok(out)
    }

    /// Company hot list: title and heat come straight from the payload.
    pub fn parse_company(&self, body: &str) -> Result<Vec<Item>, FetchError> {
        let mut out = Vec::new();
        for raw in unwrap_list(body)?.into_iter().take(MAX_PER_CHANNEL) {
            let Ok(e) = serde_json::from_value::<CompanyEntry>(raw) else {
                continue;
            };
            let title = normalize_text(&e.title);
            if title.is_empty() {
                continue;
            }
            let title = with_company(Some(e.company_name.as_str()), title);
            out.push(Item::new(title, e.hot, COMPANY_LABEL).with_url(self.detail_url(&e.id)));
        }
        Ok(out)
    }

    async fn get(&self, url: &str) -> Result<String, FetchError> {
        let origin = self.base_url.as_str();
        let mut headers = vec![("Referer", origin), ("Origin", origin)];
        if let Some(c) = &self.cookie {
            headers.push(("Cookie", c.as_str()));
        }
        get_text(&self.client, url, &headers, self.retries).await
    }
}

fn with_company(company: Option<&str>, title: String) -> String {
    match company.map(str::trim) {
        Some(name) if !name.is_empty() => format!("[{name}] {title}"),
        _ => title,
    }
}

fn unwrap_list(body: &str) -> Result<Vec<Value>, FetchError> {
    let env: Envelope = serde_json::from_str(body).map_err(FetchError::parse)?;
    if env.code != 0 {
        return Err(FetchError::Rejected(format!(
            "code {}: {}",
            env.code,
            env.msg.as_deref().unwrap_or("unknown error")
        )));
    }
    Ok(env.data.map(|d| d.list).unwrap_or_default())
}

fn combine(
    feed: Result<Vec<Item>, FetchError>,
    company: Result<Vec<Item>, FetchError>,
) -> Result<Vec<Item>, FetchError> {
    match (feed, company) {
        (Err(e), Err(_)) => Err(e),
        (feed, company) => {
            let mut out = Vec::new();
            for (channel, res) in [("feed", feed), ("company", company)] {
                match res {
                    Ok(items) => out.extend(items),
                    Err(e) => {
                        tracing::warn!(target: "ingest", channel, error = %e, "maimai channel failed");
                        counter!("hotboard_provider_errors_total", "provider" => "maimai").increment(1);
                    }
                }
            }
            Ok(out)
        }
    }
}

#[async_trait]
impl SourceAdapter for MaimaiAdapter {
    async fn fetch(&self) -> Result<Vec<Item>, FetchError> {
        match &self.mode {
            Mode::Fixture(f) => {
                let missing = || FetchError::parse("no fixture");
                let feed = f
                    .feed_json
                    .as_deref()
                    .ok_or_else(missing)
                    .and_then(|s| self.parse_feed(s));
                let company = f
                    .company_json
                    .as_deref()
                    .ok_or_else(missing)
                    .and_then(|s| self.parse_company(s));
                combine(feed, company)
            }
            Mode::Http => {
                let feed = match self.get(&self.feed_url).await {
                    Ok(body) => self.parse_feed(&body),
                    Err(e) => Err(e),
                };
                self.pacing.pause().await;
                let company = match self.get(&self.company_url).await {
                    Ok(body) => self.parse_company(&body),
                    Err(e) => Err(e),
                };
                combine(feed, company)
            }
        }
    }

    fn name(&self) -> &str {
        "maimai"
    }
}
