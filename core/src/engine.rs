use crate::book::{BookRecord, Catalog};
use crate::clicks::ClickStore;
use crate::config::EngineConfig;
use crate::graph::{Related, SimilarityGraph};
use crate::index::{InvertedIndex, SearchResult};
use crate::rerank::{PopularityMap, ReRanker};
use crate::suggest::Suggester;
use crate::DocId;
use std::sync::Arc;

/// What a search produced after the suggestion fallback ran.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Hits {
        results: Vec<SearchResult>,
        /// Text the results were ranked against.
        used_query: String,
        /// Original query when `used_query` is a suggestion.
        replaced: Option<String>,
    },
    /// Nothing matched and nothing close enough was known.
    NoMatch,
    /// The suggestion was tried and also matched nothing.
    SuggestionEmpty { suggestion: String },
}

impl SearchOutcome {
    pub fn results(&self) -> &[SearchResult] {
        match self {
            SearchOutcome::Hits { results, .. } => results,
            _ => &[],
        }
    }

    pub fn is_substituted(&self) -> bool {
        matches!(self, SearchOutcome::Hits { replaced: Some(_), .. })
    }
}

/// Everything built once from the corpus. Share it behind an `Arc`; all
/// query methods take `&self`.
pub struct Engine {
    catalog: Arc<Catalog>,
    index: InvertedIndex,
    suggester: Suggester,
    graph: SimilarityGraph,
    reranker: ReRanker,
}

impl Engine {
    pub fn build(books: Vec<BookRecord>, clicks: Arc<dyn ClickStore>, config: EngineConfig) -> Self {
        let index = InvertedIndex::build(&books, config.index);
        let suggester = Suggester::build(&books, config.suggest);
        let graph = SimilarityGraph::build(&books);
        let catalog = Arc::new(Catalog::new(books));
        let reranker = ReRanker::new(Arc::clone(&catalog), clicks, config.ranking);
        tracing::info!(books = catalog.len(), "engine ready");
        Self { catalog, index, suggester, graph, reranker }
    }

    pub fn search(&self, query: &str) -> SearchOutcome {
        let results = self.index.search(query);
        if !results.is_empty() {
            return SearchOutcome::Hits {
                results: self.reranker.rerank(&results, query),
                used_query: query.to_string(),
                replaced: None,
            };
        }

        let Some(suggestion) = self.suggester.suggest_similar(query) else {
            tracing::debug!(query, "no results and no suggestion");
            return SearchOutcome::NoMatch;
        };
        let results = self.index.search(&suggestion);
        if results.is_empty() {
            tracing::debug!(query, %suggestion, "suggestion matched nothing");
            return SearchOutcome::SuggestionEmpty { suggestion };
        }
        tracing::debug!(query, %suggestion, hits = results.len(), "searched suggestion instead");
        SearchOutcome::Hits {
            results: self.reranker.rerank(&results, &suggestion),
            used_query: suggestion,
            replaced: Some(query.to_string()),
        }
    }

    /// Resolve ranked ids to records, preserving order.
    pub fn books_for(&self, results: &[SearchResult]) -> Vec<&BookRecord> {
        results.iter().filter_map(|r| self.catalog.get(r.doc_id)).collect()
    }

    pub fn related(&self, title: &str, limit: usize) -> Vec<Related> {
        let popularity = self.reranker.popularity_map();
        self.graph.recommend_scored(title, limit, &popularity)
    }

    pub fn related_titles(&self, title: &str, limit: usize) -> Vec<String> {
        let popularity = self.reranker.popularity_map();
        self.graph.recommend(title, limit, &popularity)
    }

    pub fn suggest(&self, query: &str) -> Option<String> {
        self.suggester.suggest_similar(query)
    }

    pub fn log_click(&self, query: &str, doc_id: DocId) {
        self.reranker.log_click(query, doc_id);
    }

    pub fn popularity_map(&self) -> Arc<PopularityMap> {
        self.reranker.popularity_map()
    }

    pub fn book(&self, id: DocId) -> Option<&BookRecord> {
        self.catalog.get(id)
    }

    pub fn catalog(&self) -> &Catalog { &self.catalog }

    pub fn index(&self) -> &InvertedIndex { &self.index }

    pub fn graph(&self) -> &SimilarityGraph { &self.graph }

    pub fn suggester(&self) -> &Suggester { &self.suggester }
}
