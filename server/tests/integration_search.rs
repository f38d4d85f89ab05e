use axum::body::{Body, Bytes};
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use shopsearch_core::corpus::load_corpus;
use shopsearch_server::config::ServerConfig;
use shopsearch_server::{build_app, router, AppState};
use std::sync::Arc;
use tempfile::{tempdir, TempDir};
use tower::ServiceExt;

fn write_catalog() -> (TempDir, std::path::PathBuf) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("products.json");
    let catalog = json!([
        {
            "pid": "P1", "title": "Blue Men T-Shirt", "description": "Soft blue cotton tee for men",
            "brand": "Acme", "out_of_stock": false, "average_rating": "4.5", "selling_price": "500",
            "discount": "20% off", "url": "https://shop.example/p1"
        },
        {
            "pid": "P2", "title": "Red Women T-Shirt", "description": "Red cotton tee",
            "out_of_stock": false, "average_rating": "3.0", "selling_price": "300"
        },
        {
            "pid": "P3", "title": "Blue Men Shorts", "description": "Blue shorts",
            "out_of_stock": true, "average_rating": "5.0", "selling_price": "200"
        },
        {
            "pid": "P4", "title": "Blue Cotton Shirt", "description": "Formal blue shirt",
            "out_of_stock": "False", "average_rating": "4.1", "selling_price": "1,299"
        },
        {
            "pid": "P5", "title": "Blue Denim Shirt", "description": "Casual denim shirt in blue",
            "out_of_stock": false, "average_rating": 3.8, "selling_price": 899
        }
    ]);
    std::fs::write(&path, serde_json::to_vec(&catalog).unwrap()).unwrap();
    (dir, path)
}

async fn call(app: Router, uri: &str) -> (StatusCode, Bytes) {
    let req = Request::get(uri).body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    (status, body)
}

async fn call_json(app: Router, uri: &str) -> Value {
    let (status, body) = call(app, uri).await;
    assert_eq!(status, StatusCode::OK, "{uri}");
    serde_json::from_slice(&body).unwrap()
}

fn ids(json: &Value) -> Vec<String> {
    json["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["pid"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn search_returns_ranked_results() {
    let (_dir, path) = write_catalog();
    let app = build_app(ServerConfig::new(path)).unwrap();

    let json = call_json(app.clone(), "/search?q=blue%20men%20t%20shirt").await;
    assert_eq!(ids(&json), vec!["P1"]);
    assert_eq!(json["total_hits"], 1);
    let hit = &json["results"][0];
    assert_eq!(hit["rank"], 1);
    assert!(hit["score"].as_f64().unwrap() > 0.0);
    assert_eq!(hit["url"], "https://shop.example/p1");
    let qid = json["query_id"].as_str().unwrap();
    assert_eq!(hit["details_url"], format!("/doc/P1?qid={qid}&rank=1"));
    assert!(hit["snippet"].as_str().unwrap().contains("<em>blue</em>"));
    assert!(json.get("advice").is_none());

    let json = call_json(app, "/search?q=blue%20shirt").await;
    assert_eq!(json["total_hits"], 3);
    let scores: Vec<f64> = json["results"].as_array().unwrap().iter().map(|r| r["score"].as_f64().unwrap()).collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));
}

#[tokio::test]
async fn stopword_query_and_k_truncation() {
    let (_dir, path) = write_catalog();
    let app = build_app(ServerConfig::new(path)).unwrap();

    let json = call_json(app.clone(), "/search?q=the%20a%20of").await;
    assert!(ids(&json).is_empty());
    assert_eq!(json["total_hits"], 0);

    let json = call_json(app, "/search?q=blue&k=2").await;
    assert_eq!(ids(&json).len(), 2);
    assert_eq!(json["total_hits"], 4);
}

#[tokio::test]
async fn advise_without_advisor_is_unavailable() {
    let (_dir, path) = write_catalog();
    let app = build_app(ServerConfig::new(path)).unwrap();

    let json = call_json(app, "/search?q=blue%20shirt&advise=true").await;
    assert_eq!(json["advice"]["kind"], "unavailable");
    assert_eq!(json["advice"]["text"], shopsearch_advisor::UNAVAILABLE);
    assert_eq!(ids(&json).len(), 3);
}

#[tokio::test]
async fn click_return_and_analytics_flow() {
    let (_dir, path) = write_catalog();
    let corpus = load_corpus(&path).unwrap();
    let state = AppState::new(corpus, ServerConfig::new(path)).unwrap();
    let app = router(state.clone());

    let json = call_json(app.clone(), "/search?q=blue%20shirt").await;
    let qid = json["query_id"].as_str().unwrap().to_string();
    let second = json["results"][1]["pid"].as_str().unwrap().to_string();

    let doc = call_json(app.clone(), &format!("/doc/{second}?qid={qid}&rank=2")).await;
    assert_eq!(doc["pid"], second.as_str());
    call_json(app.clone(), &format!("/doc/{second}")).await;

    let (status, body) = call(app.clone(), &format!("/return_to_results?qid={qid}&pid={second}")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_empty());
    // unknown pair is still accepted
    let (status, _) = call(app.clone(), "/return_to_results?qid=nope&pid=P1").await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let stats = call_json(app.clone(), "/stats").await;
    assert_eq!(stats[0]["pid"], second.as_str());
    assert_eq!(stats[0]["clicks"], 2);

    let summary = call_json(app, "/analytics").await;
    assert_eq!(summary["total_queries"], 1);
    assert_eq!(summary["total_impressions"], 3);
    assert_eq!(summary["total_clicks"], 1);
    let rank2 = summary["ctr_by_rank"].as_array().unwrap().iter().find(|r| r["rank"] == 2).unwrap();
    assert_eq!(rank2["clicks"], 1);
    assert!(summary["mean_dwell_secs"].as_f64().is_some());
    assert!(summary["total_requests"].as_u64().unwrap() >= 6);

    assert_eq!(state.analytics.query_terms(&qid), Some(vec!["blue".to_string(), "shirt".to_string()]));
}

#[tokio::test]
async fn unknown_product_is_404() {
    let (_dir, path) = write_catalog();
    let app = build_app(ServerConfig::new(path)).unwrap();
    let (status, _) = call(app, "/doc/P404").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn index_is_built_once_on_first_use() {
    let (_dir, path) = write_catalog();
    let corpus = load_corpus(&path).unwrap();
    let state = AppState::new(corpus, ServerConfig::new(path)).unwrap();
    let app = router(state.clone());

    let status = call_json(app.clone(), "/index").await;
    assert_eq!(status["built"], false);
    assert_eq!(status["corpus_size"], 5);
    assert!(state.built_index().is_none());

    let (a, b) = tokio::join!(state.index(), state.index());
    let (a, b) = (a.unwrap(), b.unwrap());
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(a.num_docs, 5);

    let status = call_json(app, "/index").await;
    assert_eq!(status["built"], true);
    assert_eq!(status["num_docs"], 5);
}

#[tokio::test]
async fn health_is_ok() {
    let (_dir, path) = write_catalog();
    let app = build_app(ServerConfig::new(path)).unwrap();
    let (status, body) = call(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"ok");
}

async fn call_with_agent(app: Router, uri: &str, user_agent: &str) -> StatusCode {
    let req = Request::get(uri).header("user-agent", user_agent).body(Body::empty()).unwrap();
    app.oneshot(req).await.unwrap().status()
}

#[tokio::test]
async fn analytics_breaks_requests_down_by_device() {
    let (_dir, path) = write_catalog();
    let app = build_app(ServerConfig::new(path)).unwrap();
    let iphone = "Mozilla/5.0 (iPhone; CPU iPhone OS 16_0 like Mac OS X) AppleWebKit/605.1.15 \
                  (KHTML, like Gecko) Version/16.0 Mobile/15E148 Safari/604.1";
    let windows = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                   (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

    assert_eq!(call_with_agent(app.clone(), "/search?q=blue", iphone).await, StatusCode::OK);
    assert_eq!(call_with_agent(app.clone(), "/index", windows).await, StatusCode::OK);
    assert_eq!(call_with_agent(app.clone(), "/health", iphone).await, StatusCode::OK);

    let summary = call_json(app, "/analytics").await;
    assert_eq!(summary["total_requests"], 2);
    assert_eq!(summary["requests_by_device"]["mobile"], 1);
    assert_eq!(summary["requests_by_device"]["desktop"], 1);
    let contexts = summary["requests_by_context"].as_array().unwrap();
    assert_eq!(contexts.len(), 2);
    assert!(contexts.iter().all(|c| c["browser"] != "unknown" && c["requests"] == 1));
    assert_eq!(summary["requests_by_browser"].as_object().unwrap().len(), 2);
}
