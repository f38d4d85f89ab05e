use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::time::Instant;
use time::OffsetDateTime;

/// Upper bounds (seconds, exclusive) of the dwell-time histogram buckets; the
/// last bucket is open-ended.
const DWELL_EDGES: &[f64] = &[5.0, 15.0, 30.0, 60.0, 120.0, 300.0];
const RECENT_REQUESTS: usize = 20;

#[derive(Debug, Clone)]
struct QueryRecord {
    at: OffsetDateTime,
    terms: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductRef {
    pub pid: String,
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone)]
struct RankedEvent {
    query_id: String,
    pid: String,
    rank: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestRecord {
    pub path: String,
    pub method: String,
    pub status: u16,
    pub user_agent: String,
    pub context: RequestContext,
}

/// Who sent a request and when: browser, OS, device class and UTC hour.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RequestContext {
    pub browser: String,
    pub os: String,
    /// `mobile` or `desktop`.
    pub device: String,
    /// `"HH:00"` in UTC.
    pub time_bucket: String,
}

impl RequestContext {
    pub fn from_user_agent(user_agent: &str, at: OffsetDateTime) -> Self {
        let parsed = woothee::parser::Parser::new().parse(user_agent);
        let known = |value: &str| {
            if value.is_empty() || value == "UNKNOWN" { "unknown".to_string() } else { value.to_string() }
        };
        let (browser, os, device) = match parsed {
            Some(ua) => {
                let device = match ua.category {
                    "smartphone" | "mobilephone" => "mobile",
                    _ => "desktop",
                };
                (known(ua.name), known(ua.os), device)
            }
            None => ("unknown".to_string(), "unknown".to_string(), "desktop"),
        };
        Self { browser, os, device: device.to_string(), time_bucket: format!("{:02}:00", at.hour()) }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ContextCount {
    #[serde(flatten)]
    pub context: RequestContext,
    pub requests: u64,
}

#[derive(Default)]
struct Inner {
    queries: HashMap<String, QueryRecord>,
    products: HashMap<String, ProductRef>,
    impressions: Vec<RankedEvent>,
    clicks: Vec<RankedEvent>,
    dwell_secs: Vec<f64>,
    requests: Vec<(OffsetDateTime, RequestRecord)>,
    click_counts: HashMap<String, u64>,
    open_clicks: HashMap<(String, String), Instant>,
}

/// In-memory record of what users searched, saw, clicked and how long they stayed.
#[derive(Default)]
pub struct AnalyticsStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProductClicks {
    pub pid: String,
    pub clicks: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RankCtr {
    pub rank: usize,
    pub impressions: u64,
    pub clicks: u64,
    pub ctr: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DwellBucket {
    pub from_secs: f64,
    /// `None` for the open-ended last bucket.
    pub to_secs: Option<f64>,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsSummary {
    pub total_requests: usize,
    pub total_queries: usize,
    pub total_impressions: usize,
    pub total_clicks: usize,
    pub last_query_at: Option<String>,
    pub clicks_per_product: Vec<ProductClicks>,
    /// number of query terms -> number of queries
    pub query_term_counts: BTreeMap<usize, u64>,
    pub ctr_by_rank: Vec<RankCtr>,
    pub mean_dwell_secs: Option<f64>,
    pub dwell_histogram: Vec<DwellBucket>,
    /// Distinct request contexts, busiest first.
    pub requests_by_context: Vec<ContextCount>,
    pub requests_by_device: BTreeMap<String, u64>,
    pub requests_by_browser: BTreeMap<String, u64>,
    pub requests_by_os: BTreeMap<String, u64>,
    pub requests_by_hour: BTreeMap<String, u64>,
    /// Newest last.
    pub recent_requests: Vec<RequestRecord>,
}

impl AnalyticsStore {
    pub fn new() -> Self { Self::default() }

    /// Store a submitted query and return its fresh id.
    pub fn save_query(&self, query: &str) -> String {
        let query_id = uuid::Uuid::new_v4().to_string();
        let terms = query.split_whitespace().map(str::to_string).collect();
        self.inner
            .lock()
            .queries
            .insert(query_id.clone(), QueryRecord { at: OffsetDateTime::now_utc(), terms });
        query_id
    }

    pub fn query_terms(&self, query_id: &str) -> Option<Vec<String>> {
        self.inner.lock().queries.get(query_id).map(|q| q.terms.clone())
    }

    pub fn log_request(&self, record: RequestRecord) {
        self.inner.lock().requests.push((OffsetDateTime::now_utc(), record));
    }

    /// Record that `shown` was displayed for `query_id`; ranks start at 1.
    pub fn log_impressions(&self, query_id: &str, shown: &[ProductRef]) {
        let mut inner = self.inner.lock();
        for (i, product) in shown.iter().enumerate() {
            inner.products.entry(product.pid.clone()).or_insert_with(|| product.clone());
            inner.impressions.push(RankedEvent {
                query_id: query_id.to_string(),
                pid: product.pid.clone(),
                rank: i + 1,
            });
        }
    }

    pub fn log_click(&self, pid: &str, from_query: Option<(&str, usize)>) {
        self.log_click_at(pid, from_query, Instant::now());
    }

    /// Count a product view; when it came from a result list also record the
    /// query and rank, and start the dwell clock.
    pub fn log_click_at(&self, pid: &str, from_query: Option<(&str, usize)>, at: Instant) {
        let mut inner = self.inner.lock();
        *inner.click_counts.entry(pid.to_string()).or_insert(0) += 1;
        if let Some((query_id, rank)) = from_query {
            inner.clicks.push(RankedEvent {
                query_id: query_id.to_string(),
                pid: pid.to_string(),
                rank,
            });
            inner.open_clicks.insert((query_id.to_string(), pid.to_string()), at);
        }
    }

    pub fn log_return(&self, query_id: &str, pid: &str) -> Option<f64> {
        self.log_return_at(query_id, pid, Instant::now())
    }

    /// Close the dwell clock opened by the matching click. Returns the dwell time,
    /// or `None` when there was no open click for this query and product.
    pub fn log_return_at(&self, query_id: &str, pid: &str, at: Instant) -> Option<f64> {
        let mut inner = self.inner.lock();
        let opened = inner.open_clicks.remove(&(query_id.to_string(), pid.to_string()))?;
        let seconds = at.saturating_duration_since(opened).as_secs_f64();
        inner.dwell_secs.push(seconds);
        tracing::debug!(query_id, pid, seconds, "dwell recorded");
        Some(seconds)
    }

    /// Products by descending click count, ties by id.
    pub fn click_counts(&self) -> Vec<ProductClicks> {
        let inner = self.inner.lock();
        let mut counts: Vec<ProductClicks> = inner
            .click_counts
            .iter()
            .map(|(pid, clicks)| ProductClicks { pid: pid.clone(), clicks: *clicks })
            .collect();
        counts.sort_by(|a, b| b.clicks.cmp(&a.clicks).then_with(|| a.pid.cmp(&b.pid)));
        counts
    }

    pub fn product(&self, pid: &str) -> Option<ProductRef> {
        self.inner.lock().products.get(pid).cloned()
    }

    pub fn summary(&self) -> AnalyticsSummary {
        let clicks_per_product = self.click_counts();
        let inner = self.inner.lock();

        let mut query_term_counts = BTreeMap::new();
        for q in inner.queries.values() {
            *query_term_counts.entry(q.terms.len()).or_insert(0u64) += 1;
        }
        let last_query_at = inner
            .queries
            .values()
            .map(|q| q.at)
            .max()
            .and_then(|at| at.format(&time::format_description::well_known::Rfc3339).ok());

        let mut per_rank: BTreeMap<usize, (u64, u64)> = BTreeMap::new();
        for imp in &inner.impressions {
            per_rank.entry(imp.rank).or_default().0 += 1;
        }
        for click in &inner.clicks {
            per_rank.entry(click.rank).or_default().1 += 1;
        }
        let ctr_by_rank = per_rank
            .into_iter()
            .map(|(rank, (impressions, clicks))| RankCtr {
                rank,
                impressions,
                clicks,
                ctr: if impressions == 0 { 0.0 } else { clicks as f64 / impressions as f64 },
            })
            .collect();

        let mut per_context: HashMap<&RequestContext, u64> = HashMap::new();
        let mut requests_by_device = BTreeMap::new();
        let mut requests_by_browser = BTreeMap::new();
        let mut requests_by_os = BTreeMap::new();
        let mut requests_by_hour = BTreeMap::new();
        for (_, record) in &inner.requests {
            let ctx = &record.context;
            *per_context.entry(ctx).or_insert(0) += 1;
            *requests_by_device.entry(ctx.device.clone()).or_insert(0u64) += 1;
            *requests_by_browser.entry(ctx.browser.clone()).or_insert(0u64) += 1;
            *requests_by_os.entry(ctx.os.clone()).or_insert(0u64) += 1;
            *requests_by_hour.entry(ctx.time_bucket.clone()).or_insert(0u64) += 1;
        }
        let mut requests_by_context: Vec<ContextCount> = per_context
            .into_iter()
            .map(|(context, requests)| ContextCount { context: context.clone(), requests })
            .collect();
        requests_by_context.sort_by(|a, b| b.requests.cmp(&a.requests).then_with(|| a.context.cmp(&b.context)));

        let mean_dwell_secs = (!inner.dwell_secs.is_empty())
            .then(|| inner.dwell_secs.iter().sum::<f64>() / inner.dwell_secs.len() as f64);

        AnalyticsSummary {
            total_requests: inner.requests.len(),
            total_queries: inner.queries.len(),
            total_impressions: inner.impressions.len(),
            total_clicks: inner.clicks.len(),
            last_query_at,
            clicks_per_product,
            query_term_counts,
            ctr_by_rank,
            mean_dwell_secs,
            dwell_histogram: dwell_histogram(inner.dwell_secs.iter().copied()),
            requests_by_context,
            requests_by_device,
            requests_by_browser,
            requests_by_os,
            requests_by_hour,
            recent_requests: inner
                .requests
                .iter()
                .skip(inner.requests.len().saturating_sub(RECENT_REQUESTS))
                .map(|(_, r)| r.clone())
                .collect(),
        }
    }

    /// Rank at which `pid` was shown for `query_id`, if it was.
    pub fn was_shown(&self, query_id: &str, pid: &str) -> Option<usize> {
        let inner = self.inner.lock();
        inner
            .impressions
            .iter()
            .find(|imp| imp.query_id == query_id && imp.pid == pid)
            .map(|imp| imp.rank)
    }
}

fn dwell_histogram(seconds: impl Iterator<Item = f64>) -> Vec<DwellBucket> {
    let mut buckets: Vec<DwellBucket> = DWELL_EDGES
        .iter()
        .enumerate()
        .map(|(i, &to)| DwellBucket { from_secs: if i == 0 { 0.0 } else { DWELL_EDGES[i - 1] }, to_secs: Some(to), count: 0 })
        .collect();
    buckets.push(DwellBucket { from_secs: DWELL_EDGES[DWELL_EDGES.len() - 1], to_secs: None, count: 0 });
    for s in seconds {
        let idx = DWELL_EDGES.iter().position(|&edge| s < edge).unwrap_or(DWELL_EDGES.len());
        buckets[idx].count += 1;
    }
    buckets
}
