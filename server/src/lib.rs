use anyhow::Result;
use axum::extract::{Path, Query, Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use shopsearch_advisor::{Advice, Advisor};
use shopsearch_core::corpus::load_corpus;
use shopsearch_core::search::rank_query;
use shopsearch_core::{build_index, IndexBundle, ProductMeta, ProductRecord};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod analytics;
pub mod config;

use analytics::{AnalyticsStore, AnalyticsSummary, ProductRef, RequestContext, RequestRecord};
use config::ServerConfig;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default)]
    pub k: Option<usize>,
    /// Ask the advisor to pick the best of the returned products.
    #[serde(default)]
    pub advise: bool,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub query_id: String,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<SearchHit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advice: Option<Advice>,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub pid: String,
    pub rank: usize,
    pub score: f64,
    pub title: String,
    pub brand: String,
    pub selling_price: f64,
    pub average_rating: Option<f64>,
    pub out_of_stock: bool,
    pub url: String,
    /// Detail page link that records the click for this query and rank.
    pub details_url: String,
    pub snippet: Option<String>,
}

#[derive(Deserialize)]
pub struct ClickParams {
    pub qid: Option<String>,
    pub rank: Option<usize>,
}

#[derive(Deserialize)]
pub struct ReturnParams {
    pub qid: Option<String>,
    pub pid: Option<String>,
}

#[derive(Serialize)]
pub struct StatsRow {
    pub pid: String,
    pub title: String,
    pub url: String,
    pub clicks: u64,
}

#[derive(Serialize)]
pub struct IndexStatus {
    pub built: bool,
    pub corpus_size: usize,
    pub num_docs: Option<u32>,
    pub num_terms: Option<usize>,
}

#[derive(Clone)]
pub struct AppState {
    corpus: Arc<Vec<ProductRecord>>,
    index: Arc<OnceCell<Arc<IndexBundle>>>,
    pub analytics: Arc<AnalyticsStore>,
    advisor: Option<Advisor>,
    config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(corpus: Vec<ProductRecord>, config: ServerConfig) -> Result<Self> {
        let advisor = config.advisor.clone().map(Advisor::new).transpose()?;
        Ok(Self {
            corpus: Arc::new(corpus),
            index: Arc::new(OnceCell::new()),
            analytics: Arc::new(AnalyticsStore::new()),
            advisor,
            config: Arc::new(config),
        })
    }

    /// The index, built from the corpus on first use. Concurrent first callers
    /// wait for the same build.
    pub async fn index(&self) -> Result<Arc<IndexBundle>> {
        let bundle = self
            .index
            .get_or_try_init(|| async {
                let corpus = self.corpus.clone();
                let start = std::time::Instant::now();
                let bundle = tokio::task::spawn_blocking(move || build_index(&corpus)).await?;
                tracing::info!(took_s = start.elapsed().as_secs_f64(), "index ready");
                Ok::<_, anyhow::Error>(Arc::new(bundle))
            })
            .await?;
        Ok(bundle.clone())
    }

    /// The index if some request already built it.
    pub fn built_index(&self) -> Option<Arc<IndexBundle>> {
        self.index.get().cloned()
    }
}

pub fn build_app(config: ServerConfig) -> Result<Router> {
    let corpus = load_corpus(&config.data_path)?;
    Ok(router(AppState::new(corpus, config)?))
}

pub fn router(state: AppState) -> Router {
    let cors = cors_layer(state.config.cors_allow_origin.as_deref());
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/doc/:pid", get(doc_handler))
        .route("/return_to_results", get(return_handler))
        .route("/stats", get(stats_handler))
        .route("/analytics", get(analytics_handler))
        .route("/index", get(index_handler))
        .layer(middleware::from_fn_with_state(state.clone(), record_request))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

fn cors_layer(allow_origin: Option<&str>) -> CorsLayer {
    let origins: Vec<_> = allow_origin
        .unwrap_or_default()
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();
    if origins.is_empty() {
        CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
    } else {
        CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
    }
}

async fn record_request(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();
    let method = req.method().to_string();
    let user_agent = req
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();
    let resp = next.run(req).await;
    if path != "/health" {
        let context = RequestContext::from_user_agent(&user_agent, time::OffsetDateTime::now_utc());
        state.analytics.log_request(RequestRecord { path, method, status: resp.status().as_u16(), user_agent, context });
    }
    resp
}

fn internal(e: anyhow::Error) -> (StatusCode, String) {
    tracing::error!(error = %e, "request failed");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, (StatusCode, String)> {
    let start = std::time::Instant::now();
    let bundle = state.index().await.map_err(internal)?;
    let query_id = state.analytics.save_query(&params.q);

    let mut ranked = rank_query(&params.q, &bundle, &state.config.ranking);
    let total_hits = ranked.len();
    let k = params.k.unwrap_or(state.config.default_results).clamp(1, state.config.max_results.max(1));
    ranked.truncate(k);

    // Raw query words for highlighting
    let raw_terms: Vec<String> = params.q.split_whitespace().map(|s| s.to_string()).collect();
    let mut results: Vec<SearchHit> = Vec::with_capacity(ranked.len());
    let mut shown: Vec<ProductRef> = Vec::with_capacity(ranked.len());
    let mut products: Vec<ProductMeta> = Vec::with_capacity(ranked.len());
    for hit in ranked {
        let Some(meta) = bundle.product(&hit.pid) else { continue };
        let rank = results.len() + 1;
        results.push(SearchHit {
            pid: hit.pid.clone(),
            rank,
            score: hit.score,
            title: meta.title.clone(),
            brand: meta.brand.clone(),
            selling_price: meta.selling_price,
            average_rating: meta.average_rating,
            out_of_stock: meta.out_of_stock,
            url: meta.url.clone(),
            details_url: format!("/doc/{}?qid={}&rank={}", hit.pid, query_id, rank),
            snippet: snippet(&meta.description, &raw_terms),
        });
        shown.push(ProductRef { pid: hit.pid, title: meta.title.clone(), url: meta.url.clone() });
        products.push(meta.clone());
    }
    state.analytics.log_impressions(&query_id, &shown);

    let advice = if params.advise {
        Some(match &state.advisor {
            Some(advisor) => advisor.recommend(&params.q, &products).await,
            None => Advice::Unavailable,
        })
    } else {
        None
    };

    let elapsed = start.elapsed();
    tracing::info!(query = %params.q, %query_id, total_hits, returned = results.len(), "search");
    Ok(Json(SearchResponse { query: params.q, query_id, took_s: elapsed.as_secs_f64(), total_hits, results, advice }))
}

pub async fn doc_handler(
    State(state): State<AppState>,
    Path(pid): Path<String>,
    Query(params): Query<ClickParams>,
) -> Result<Json<ProductMeta>, (StatusCode, String)> {
    let bundle = state.index().await.map_err(internal)?;
    let meta = bundle
        .product(&pid)
        .cloned()
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("product {pid} not found")))?;

    let from_query = params.qid.as_deref().map(|qid| {
        let rank = params.rank.or_else(|| state.analytics.was_shown(qid, &pid)).unwrap_or(0);
        (qid, rank)
    });
    state.analytics.log_click(&pid, from_query);
    tracing::debug!(%pid, qid = ?params.qid, "product viewed");
    Ok(Json(meta))
}

pub async fn return_handler(State(state): State<AppState>, Query(params): Query<ReturnParams>) -> StatusCode {
    if let (Some(qid), Some(pid)) = (params.qid.as_deref(), params.pid.as_deref()) {
        state.analytics.log_return(qid, pid);
    }
    StatusCode::NO_CONTENT
}

pub async fn stats_handler(State(state): State<AppState>) -> Json<Vec<StatsRow>> {
    let bundle = state.built_index();
    let rows = state
        .analytics
        .click_counts()
        .into_iter()
        .map(|c| {
            let (title, url) = match bundle.as_ref().and_then(|b| b.product(&c.pid)) {
                Some(meta) => (meta.title.clone(), meta.url.clone()),
                None => state.analytics.product(&c.pid).map(|p| (p.title, p.url)).unwrap_or_default(),
            };
            StatsRow { pid: c.pid, title, url, clicks: c.clicks }
        })
        .collect();
    Json(rows)
}

pub async fn analytics_handler(State(state): State<AppState>) -> Json<AnalyticsSummary> {
    Json(state.analytics.summary())
}

pub async fn index_handler(State(state): State<AppState>) -> Json<IndexStatus> {
    let bundle = state.built_index();
    Json(IndexStatus {
        built: bundle.is_some(),
        corpus_size: state.corpus.len(),
        num_docs: bundle.as_ref().map(|b| b.num_docs),
        num_terms: bundle.as_ref().map(|b| b.num_terms()),
    })
}

/// Up to 300 characters of `text` around the first query word it contains,
/// with every query word wrapped in `<em>`.
fn snippet(text: &str, raw_terms: &[String]) -> Option<String> {
    if text.trim().is_empty() { return None; }
    let pattern = term_pattern(raw_terms);
    let first_char = pattern
        .as_ref()
        .and_then(|pat| pat.find(text))
        .map(|m| text[..m.start()].chars().count());
    let start = first_char.map_or(0, |idx| idx.saturating_sub(100));
    let window: String = text.chars().skip(start).take(300).collect();
    Some(highlight_terms(&window, raw_terms))
}

fn highlight_terms(snippet: &str, terms: &[String]) -> String {
    match term_pattern(terms) {
        Some(pat) => pat.replace_all(snippet, |caps: &regex::Captures| format!("<em>{}</em>", &caps[0])).to_string(),
        None => snippet.to_string(),
    }
}

/// Case-insensitive alternation of the query words; `None` when there are none.
fn term_pattern(terms: &[String]) -> Option<regex::Regex> {
    let mut words: Vec<&str> = terms.iter().map(|t| t.trim()).filter(|t| !t.is_empty()).collect();
    if words.is_empty() { return None; }
    // longest first so "t-shirt" wins over "t"
    words.sort_by_key(|w| std::cmp::Reverse(w.len()));
    let alternation = words.iter().map(|w| regex::escape(w)).collect::<Vec<_>>().join("|");
    regex::RegexBuilder::new(&alternation).case_insensitive(true).build().ok()
}
