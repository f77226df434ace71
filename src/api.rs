// src/api.rs
//! Thin HTTP layer over a shared [`Orchestrator`].

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::error::AggregatorError;
use crate::model::{Item, Provenance};
use crate::orchestrator::Orchestrator;

pub const PROVENANCE_HEADER: &str = "x-hotboard-provenance";

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    /// Upper bound for a get-all request; `None` waits for every fetch.
    pub request_deadline: Option<Duration>,
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            orchestrator,
            request_deadline: None,
        }
    }

    pub fn with_request_deadline(mut self, secs: u64) -> Self {
        self.request_deadline = (secs > 0).then(|| Duration::from_secs(secs));
        self
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/api/hot_data", get(hot_data))
        .route("/api/categories", get(list_categories))
        .route("/api/categories/{id}", get(category_detail))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
struct ForceQuery {
    #[serde(default)]
    force: Option<String>,
}

impl ForceQuery {
    fn is_forced(&self) -> bool {
        matches!(
            self.force.as_deref().map(|s| s.trim().to_ascii_lowercase()).as_deref(),
            Some("true" | "1" | "yes")
        )
    }
}

async fn hot_data(
    State(state): State<AppState>,
    Query(q): Query<ForceQuery>,
) -> Json<BTreeMap<String, Vec<Item>>> {
    let force = q.is_forced();
    tracing::info!(target: "api", force, "hot_data requested");
    Json(
        state
            .orchestrator
            .get_all_within(force, state.request_deadline)
            .await,
    )
}

#[derive(Serialize)]
struct CategoryInfo {
    id: String,
    display_name: String,
    refresh_interval_secs: u64,
    max_items: usize,
    source: String,
}

async fn list_categories(State(state): State<AppState>) -> Json<Vec<CategoryInfo>> {
    let out = state
        .orchestrator
        .categories()
        .map(|b| CategoryInfo {
            id: b.id.clone(),
            display_name: b.display_name.clone(),
            refresh_interval_secs: b.policy.refresh_interval_secs,
            max_items: b.max_items,
            source: b.adapter.name().to_string(),
        })
        .collect();
    Json(out)
}

#[derive(Serialize)]
struct CategoryResp {
    category: String,
    display_name: String,
    provenance: Provenance,
    fetched_at: Option<i64>,
    items: Vec<Item>,
}

#[derive(Serialize)]
struct ErrorResp {
    error: String,
}

async fn category_detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(q): Query<ForceQuery>,
) -> Response {
    let orch = &state.orchestrator;
    match orch.resolve_category(&id, q.is_forced()).await {
        Ok(r) => {
            let display_name = orch
                .binding(&r.category)
                .map(|b| b.display_name.clone())
                .unwrap_or_default();
            let mut headers = HeaderMap::new();
            headers.insert(
                PROVENANCE_HEADER,
                HeaderValue::from_static(r.provenance.as_str()),
            );
            let body = CategoryResp {
                category: r.category,
                display_name,
                provenance: r.provenance,
                fetched_at: r.fetched_at,
                items: r.items,
            };
            (headers, Json(body)).into_response()
        }
        Err(e @ AggregatorError::UnknownCategory(_)) => {
            tracing::debug!(target: "api", category = %id, "unknown category requested");
            (
                StatusCode::NOT_FOUND,
                Json(ErrorResp {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResp {
                error: e.to_string(),
            }),
        )
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn force_flag_accepts_common_truthy_values() {
        for v in ["true", "1", "yes", "TRUE", " Yes "] {
            let q = ForceQuery {
                force: Some(v.to_string()),
            };
            assert!(q.is_forced(), "{v}");
        }
        for v in ["false", "0", "", "nope"] {
            let q = ForceQuery {
                force: Some(v.to_string()),
            };
            assert!(!q.is_forced(), "{v}");
        }
        assert!(!ForceQuery::default().is_forced());
    }
}
