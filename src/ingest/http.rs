// src/ingest/http.rs
//! Shared HTTP plumbing for adapters: client construction, retried GETs and
//! randomized request pacing.

use std::time::Duration;

use rand::Rng;
use reqwest::Client;

use crate::config::FetchConfig;
use crate::error::FetchError;

/// Build the client every adapter shares.
pub fn build_client(cfg: &FetchConfig) -> Result<Client, FetchError> {
    let client = Client::builder()
        .user_agent(cfg.user_agent.as_str())
        .connect_timeout(Duration::from_secs(cfg.timeout_secs.clamp(1, 5)))
        .timeout(Duration::from_secs(cfg.timeout_secs))
        .build()?;
    Ok(client)
}

/// GET `url` and return the body, retrying transient failures with
/// exponential backoff (500ms, 1s, 2s, ...).
pub async fn get_text(
    client: &Client,
    url: &str,
    headers: &[(&str, &str)],
    max_retries: u8,
) -> Result<String, FetchError> {
    let max_retries = max_retries.max(1);
    let mut attempt: u8 = 0;
    loop {
        attempt += 1;
        match get_once(client, url, headers).await {
            Ok(body) => return Ok(body),
            Err(e) if e.is_transient() && attempt < max_retries => {
                tracing::debug!(target: "ingest", url, attempt, error = %e, "retrying");
                tokio::time::sleep(Duration::from_millis(500u64 << (attempt - 1).min(6))).await;
            }
            Err(e) => return Err(e),
        }
    }
}

async fn get_once(client: &Client, url: &str, headers: &[(&str, &str)]) -> Result<String, FetchError> {
    let mut req = client.get(url);
    for (k, v) in headers {
        req = req.header(*k, *v);
    }
    let resp = req.send().await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }
    Ok(resp.text().await?)
}

/// Random delay in `[min_ms, max_ms]`, used between requests to the same upstream.
#[derive(Debug, Clone, Copy)]
pub struct Pacing {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl Pacing {
    pub fn none() -> Self {
        Self { min_ms: 0, max_ms: 0 }
    }

    pub fn from_config(cfg: &FetchConfig) -> Self {
        Self {
            min_ms: cfg.pace_min_ms,
            max_ms: cfg.pace_max_ms.max(cfg.pace_min_ms),
        }
    }

    pub fn next_delay(&self) -> Duration {
        if self.max_ms == 0 {
            return Duration::ZERO;
        }
        let ms = if self.max_ms > self.min_ms {
            rand::rng().random_range(self.min_ms..=self.max_ms)
        } else {
            self.min_ms
        };
        Duration::from_millis(ms)
    }

    pub async fn pause(&self) {
        let d = self.next_delay();
        if !d.is_zero() {
            tokio::time::sleep(d).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pacing_stays_within_bounds() {
        let p = Pacing {
            min_ms: 100,
            max_ms: 300,
        };
        for _ in 0..50 {
            let d = p.next_delay().as_millis() as u64;
            assert!((100..=300).contains(&d), "delay {d} out of range");
        }
    }

    #[test]
    fn disabled_pacing_is_zero() {
        assert_eq!(Pacing::none().next_delay(), Duration::ZERO);
    }
}
