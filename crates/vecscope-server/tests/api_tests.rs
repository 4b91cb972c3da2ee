use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use vecscope_core::config::ServerConfig;
use vecscope_core::data_processor::{Corpus, DataProcessor};
use vecscope_core::traits::Embedder;
use vecscope_embed::FakeEmbedder;
use vecscope_index::RetrievalIndex;
use vecscope_reduce::PcaReducer;
use vecscope_server::{build_router, AppState};

/// Sleeps on any text containing "slow" so the request timeout fires.
struct SlowEmbedder(FakeEmbedder);

impl Embedder for SlowEmbedder {
    fn model_id(&self) -> &str { "slow" }
    fn dim(&self) -> usize { self.0.dim() }
    fn max_len(&self) -> usize { usize::MAX }
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        if texts.iter().any(|t| t.contains("slow")) {
            std::thread::sleep(Duration::from_millis(500));
        }
        self.0.embed_batch(texts)
    }
}

fn index_with(embedder: Arc<dyn Embedder>) -> Arc<RetrievalIndex> {
    let records = DataProcessor::default().process(&Corpus::sample());
    Arc::new(RetrievalIndex::build(records, embedder, Box::new(PcaReducer::new(3)), 16).expect("build index"))
}

fn app() -> (Router, Arc<RetrievalIndex>) {
    let index = index_with(Arc::new(FakeEmbedder::new(512)));
    let state = AppState::new(index.clone(), &ServerConfig::default());
    (build_router(state), index)
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = response.into_body().collect().await.expect("body").to_bytes();
    let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).expect("json body") };
    (status, body)
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).expect("request")
}

#[tokio::test]
async fn data_lists_every_point_without_embeddings() {
    let (app, index) = app();
    let (status, body) = send(app, get("/api/data")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["method"], "pca");
    assert_eq!(body["dims"], 3);
    let points = body["points"].as_array().expect("points");
    assert_eq!(points.len(), index.len());
    for (i, p) in points.iter().enumerate() {
        assert_eq!(p["id"], i);
        assert!(p["document"].is_string());
        assert!(p["text"].is_string());
        assert_eq!(p["position"].as_array().map(Vec::len), Some(3));
        assert!(p.get("embedding").is_none());
    }
}

#[tokio::test]
async fn query_returns_text_and_position() {
    let (app, _) = app();
    let (status, body) = send(app, post_json("/api/query", &json!({"query": "pasta sauce"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["text"], "pasta sauce");
    assert_eq!(body["position"].as_array().map(Vec::len), Some(3));
    assert!(body.get("embedding").is_none());
}

#[tokio::test]
async fn empty_query_is_a_validation_error() {
    for (uri, payload) in [
        ("/api/query", json!({"query": ""})),
        ("/api/query", json!({"query": "   "})),
        ("/api/query", json!({})),
        ("/api/neighbors", json!({"query": "", "n": 3})),
    ] {
        let (app, _) = app();
        let (status, body) = send(app, post_json(uri, &payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri} {payload}");
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }
}

#[tokio::test]
async fn non_string_query_is_a_validation_error() {
    for uri in ["/api/query", "/api/neighbors"] {
        for payload in [json!({"query": 42}), json!({"query": null}), json!({"query": ["pasta"]})] {
            let (app, _) = app();
            let (status, body) = send(app, post_json(uri, &payload)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri} {payload}");
            assert_eq!(body["error"]["code"], "VALIDATION_ERROR", "{uri} {payload}");
        }
    }
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let (app, _) = app();
    let request = Request::builder()
        .method("POST")
        .uri("/api/query")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .expect("request");
    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn neighbors_default_to_five() {
    let (app, _) = app();
    let (status, body) = send(app, post_json("/api/neighbors", &json!({"query": "roman empire"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["query"], "roman empire");
    let hits = body["neighbors"].as_array().expect("neighbors");
    assert_eq!(hits.len(), 5);
    let distances: Vec<f64> = hits.iter().map(|h| h["distance"].as_f64().expect("distance")).collect();
    assert!(distances.windows(2).all(|w| w[0] <= w[1]));
    for h in hits {
        let d = h["distance"].as_f64().expect("distance");
        let s = h["similarity"].as_f64().expect("similarity");
        assert!((s - 1.0 / (1.0 + d)).abs() < 1e-5);
        assert_eq!(h["position"].as_array().map(Vec::len), Some(3));
    }
}

#[tokio::test]
async fn concurrent_neighbor_requests_agree() {
    let (app, _) = app();
    let request = || post_json("/api/neighbors", &json!({"query": "volcanic eruptions", "n": 4}));
    let (a, b, c, d) = tokio::join!(
        send(app.clone(), request()),
        send(app.clone(), request()),
        send(app.clone(), request()),
        send(app, request()),
    );
    for (status, body) in [&a, &b, &c, &d] {
        assert_eq!(*status, StatusCode::OK);
        assert_eq!(body["neighbors"].as_array().map(Vec::len), Some(4));
    }
    assert_eq!(a.1, b.1);
    assert_eq!(a.1, c.1);
    assert_eq!(a.1, d.1);
}

#[tokio::test]
async fn non_positive_n_is_rejected() {
    for n in [json!(0), json!(-3), json!(1.5)] {
        let (app, _) = app();
        let (status, body) = send(app, post_json("/api/neighbors", &json!({"query": "qubits", "n": n}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "n={n}");
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }
}

#[tokio::test]
async fn oversized_n_returns_whole_corpus() {
    let (app, index) = app();
    let (status, body) = send(app, post_json("/api/neighbors", &json!({"query": "qubits", "n": 1_000_000}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["neighbors"].as_array().map(Vec::len), Some(index.len()));
}

#[tokio::test]
async fn slow_embedding_times_out_with_503() {
    let index = index_with(Arc::new(SlowEmbedder(FakeEmbedder::new(128))));
    let config = ServerConfig { query_timeout_ms: 50, ..ServerConfig::default() };
    let app = build_router(AppState::new(index, &config));

    let (status, body) = send(app.clone(), post_json("/api/query", &json!({"query": "a slow query"}))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "EMBEDDING_UNAVAILABLE");

    let (status, _) = send(app, post_json("/api/neighbors", &json!({"query": "a quick query", "n": 2}))).await;
    assert_eq!(status, StatusCode::OK, "a timed-out request leaves the service usable");
}

#[tokio::test]
async fn health_reports_index_summary() {
    let (app, index) = app();
    let (status, body) = send(app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["chunks"], index.len());
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let (app, _) = app();
    let (status, body) = send(app, get("/api/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}
