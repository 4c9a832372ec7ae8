use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use devshelf_core::EngineConfig;
use http_body_util::BodyExt;
use serde_json::Value;
use std::fs;
use tempfile::tempdir;
use tower::ServiceExt;

fn write_tiny_corpus(dir: &std::path::Path) -> String {
    let path = dir.join("books.json");
    fs::write(
        &path,
        r#"[
            {"bookId": 1, "title": "Rust in Action", "author": "McNamara", "progLang": "Rust", "category": "Programming", "tag": ["systems"]},
            {"bookId": 2, "title": "Programming Rust", "author": "Blandy", "progLang": "Rust", "category": "Programming", "tag": ["systems", null]},
            {"bookId": 3, "title": "Python", "author": null, "progLang": "Python", "category": "Programming", "tag": null}
        ]"#,
    )
    .unwrap();
    path.to_string_lossy().to_string()
}

fn app(dir: &std::path::Path) -> Router {
    let corpus = write_tiny_corpus(dir);
    server::build_app(&corpus, Some(dir.join("clicks.jsonl")), EngineConfig::default()).unwrap()
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    let json = if body.is_empty() { Value::Null } else { serde_json::from_slice(&body).unwrap_or(Value::Null) };
    (status, json)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

#[tokio::test]
async fn search_returns_ranked_results() {
    let dir = tempdir().unwrap();
    let (status, json) = get(app(dir.path()), "/search?q=rust&k=2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["suggested"], false);
    let arr = json["results"].as_array().unwrap();
    assert_eq!(arr.len(), 2);
    let mut ids: Vec<u64> = arr.iter().map(|h| h["id"].as_u64().unwrap()).collect();
    ids.sort();
    assert_eq!(ids, vec![1, 2]);
}

#[tokio::test]
async fn search_reports_suggestion() {
    let dir = tempdir().unwrap();
    let (_, json) = get(app(dir.path()), "/search?q=pyton").await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["suggested"], true);
    assert_eq!(json["used_query"], "python");
    assert_eq!(json["results"][0]["id"], 3);

    let (_, json) = get(app(dir.path()), "/search?q=zzzqqq").await;
    assert_eq!(json["status"], "no_match");
    assert_eq!(json["total_hits"], 0);
}

#[tokio::test]
async fn related_and_book_lookup() {
    let dir = tempdir().unwrap();
    let (status, json) = get(app(dir.path()), "/related?title=Rust%20in%20Action").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["results"][0]["title"], "Programming Rust");

    let (status, json) = get(app(dir.path()), "/book/3").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["title"], "Python");

    let (status, _) = get(app(dir.path()), "/book/99").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn clicks_are_persisted() {
    let dir = tempdir().unwrap();
    let req = Request::post("/click")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"query": "rust", "doc_id": 2}"#))
        .unwrap();
    let (status, _) = send(app(dir.path()), req).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let log = fs::read_to_string(dir.path().join("clicks.jsonl")).unwrap();
    assert_eq!(log.lines().count(), 1);

    let req = Request::post("/click")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"query": "rust", "doc_id": 42}"#))
        .unwrap();
    let (status, _) = send(app(dir.path()), req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
