use anyhow::Result;
use axum::{extract::{Path, Query, State}, http::StatusCode, routing::{get, post}, Json, Router};
use devshelf_core::clicks::{ClickStore, JsonlClickStore, MemoryClickStore};
use devshelf_core::graph::Related;
use devshelf_core::persist::load_corpus;
use devshelf_core::{BookRecord, DocId, Engine, EngineConfig, SearchOutcome};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer, AllowOrigin};
use tower_http::trace::TraceLayer;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_k")]
    pub k: usize,
}
fn default_k() -> usize { 10 }

#[derive(Deserialize)]
pub struct RelatedParams {
    pub title: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
}
fn default_limit() -> usize { 5 }

#[derive(Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStatus {
    Ok,
    NoMatch,
    SuggestionEmpty,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub status: SearchStatus,
    /// Text the results belong to; differs from `query` after a suggestion.
    pub used_query: Option<String>,
    pub suggested: bool,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub score: f32,
    #[serde(flatten)]
    pub book: BookRecord,
}

#[derive(Serialize)]
pub struct RelatedResponse {
    pub title: String,
    pub results: Vec<Related>,
}

#[derive(Deserialize)]
pub struct ClickRequest {
    pub query: String,
    pub doc_id: DocId,
}

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
}

/// Load the corpus, build the engine once, and wire the routes.
pub fn build_app(corpus: &str, clicks: Option<PathBuf>, config: EngineConfig) -> Result<Router> {
    let books = load_corpus(corpus)?;
    let store: Arc<dyn ClickStore> = match clicks {
        Some(path) => Arc::new(JsonlClickStore::new(path)),
        None => Arc::new(MemoryClickStore::new()),
    };
    let engine = Engine::build(books, store, config);
    Ok(router(Arc::new(engine)))
}

pub fn router(engine: Arc<Engine>) -> Router {
    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/related", get(related_handler))
        .route("/book/:doc_id", get(book_handler))
        .route("/click", post(click_handler))
        .with_state(AppState { engine })
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn search_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Json<SearchResponse> {
    let start = std::time::Instant::now();
    let k = params.k.clamp(1, 100);
    let outcome = state.engine.search(&params.q);

    let (status, used_query, suggested) = match &outcome {
        SearchOutcome::Hits { used_query, replaced, .. } => (SearchStatus::Ok, Some(used_query.clone()), replaced.is_some()),
        SearchOutcome::NoMatch => (SearchStatus::NoMatch, None, false),
        SearchOutcome::SuggestionEmpty { suggestion } => (SearchStatus::SuggestionEmpty, Some(suggestion.clone()), true),
    };
    let ranked = outcome.results();
    let results = ranked
        .iter()
        .take(k)
        .filter_map(|r| state.engine.book(r.doc_id).map(|b| SearchHit { score: r.score, book: b.clone() }))
        .collect();

    let elapsed = start.elapsed();
    tracing::info!(query = %params.q, hits = ranked.len(), took_s = elapsed.as_secs_f64(), "search");
    Json(SearchResponse {
        query: params.q,
        status,
        used_query,
        suggested,
        took_s: elapsed.as_secs_f64(),
        total_hits: ranked.len(),
        results,
    })
}

pub async fn related_handler(State(state): State<AppState>, Query(params): Query<RelatedParams>) -> Json<RelatedResponse> {
    let limit = params.limit.clamp(1, 50);
    let results = state.engine.related(&params.title, limit);
    Json(RelatedResponse { title: params.title, results })
}

pub async fn book_handler(State(state): State<AppState>, Path(doc_id): Path<DocId>) -> Result<Json<BookRecord>, (StatusCode, String)> {
    state
        .engine
        .book(doc_id)
        .cloned()
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, format!("no book with id {doc_id}")))
}

pub async fn click_handler(State(state): State<AppState>, Json(req): Json<ClickRequest>) -> Result<StatusCode, (StatusCode, String)> {
    if state.engine.book(req.doc_id).is_none() {
        return Err((StatusCode::NOT_FOUND, format!("no book with id {}", req.doc_id)));
    }
    state.engine.log_click(&req.query, req.doc_id);
    Ok(StatusCode::NO_CONTENT)
}
