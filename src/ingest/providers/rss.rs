// src/ingest/providers/rss.rs
//! Generic RSS 2.0 feed. Feeds carry no popularity signal, so heat is a
//! recency rank: newest item first, `(n - index) * 100`.

use async_trait::async_trait;
use metrics::histogram;
use quick_xml::de::from_str;
use reqwest::Client;
use serde::Deserialize;
use time::{format_description::well_known::Rfc2822, OffsetDateTime};

use crate::error::FetchError;
use crate::ingest::http::get_text;
use crate::ingest::{normalize_text, Mode, SourceAdapter};
use crate::model::Item;

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
}

fn parse_rfc2822_to_unix(ts: &str) -> Option<i64> {
    OffsetDateTime::parse(ts.trim(), &Rfc2822)
        .ok()
        .map(|dt| dt.unix_timestamp())
}

pub struct RssAdapter {
    mode: Mode<String>,
    client: Client,
    url: String,
    label: String,
    retries: u8,
}

impl RssAdapter {
    pub fn http(client: Client, url: &str, label: &str) -> Self {
        Self {
            mode: Mode::Http,
            client,
            url: url.to_string(),
            label: label.to_string(),
            retries: 3,
        }
    }

    pub fn from_fixture_str(xml: &str, label: &str) -> Self {
        Self {
            mode: Mode::Fixture(xml.to_string()),
            ..Self::http(Client::new(), "", label)
        }
    }

    pub fn with_retries(mut self, retries: u8) -> Self {
        self.retries = retries;
        self
    }

    pub fn parse_items_from_str(&self, s: &str) -> Result<Vec<Item>, FetchError> {
        let t0 = std::time::Instant::now();
        let xml_clean = scrub_html_entities_for_xml(s);
        let rss: Rss = from_str(&xml_clean).map_err(|e| FetchError::parse(format!("rss xml: {e}")))?;

        let mut entries: Vec<(String, Option<String>, Option<i64>)> = rss
            .channel
            .item
            .into_iter()
            .filter_map(|it| {
                let title = normalize_text(it.title.as_deref().unwrap_or_default());
                if title.is_empty() {
                    return None;
                }
                let ts = it.pub_date.as_deref().and_then(parse_rfc2822_to_unix);
                Some((title, it.link, ts))
            })
            .collect();

        // Newest first; undated entries keep feed order after dated ones.
        entries.sort_by(|a, b| match (a.2, b.2) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });

        let n = entries.len() as u64;
        let out = entries
            .into_iter()
            .enumerate()
            .map(|(i, (title, link, _))| {
                let item = Item::new(title, (n - i as u64) * 100, self.label.as_str());
                match link {
                    Some(l) => item.with_url(l.trim()),
                    None => item,
                }
            })
            .collect();

        histogram!("hotboard_parse_ms", "provider" => "rss").record(t0.elapsed().as_secs_f64() * 1_000.0);
        Ok(out)
    }
}

#[async_trait]
impl SourceAdapter for RssAdapter {
    async fn fetch(&self) -> Result<Vec<Item>, FetchError> {
        match &self.mode {
            Mode::Fixture(s) => self.parse_items_from_str(s),
            Mode::Http => {
                let body = get_text(&self.client, &self.url, &[], self.retries).await?;
                self.parse_items_from_str(&body)
            }
        }
    }

    fn name(&self) -> &str {
        "rss"
    }
}

/// quick-xml only knows the XML entities; feeds routinely use HTML ones.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}
