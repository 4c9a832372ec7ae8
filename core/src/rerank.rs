//! Exact-match and popularity fusion on top of index relevance.
//!
//! The fused score of a document is
//!
//! ```text
//! fused = (1 - w) * (relevance + boost) + w * popularity
//! ```
//!
//! where `boost` is `exact_match_boost` when the query equals the title,
//! `partial_match_boost` when the title contains the query and zero
//! otherwise, and `popularity = clicks / max_clicks`.

use crate::book::Catalog;
use crate::clicks::{ClickEvent, ClickStore};
use crate::config::RankingConfig;
use crate::index::{sort_results, SearchResult};
use crate::DocId;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

pub type PopularityMap = HashMap<DocId, f64>;

pub struct ReRanker {
    catalog: Arc<Catalog>,
    clicks: Arc<dyn ClickStore>,
    config: RankingConfig,
    // None means invalidated; the next reader recomputes and swaps in a snapshot.
    popularity: RwLock<Option<Arc<PopularityMap>>>,
}

impl ReRanker {
    pub fn new(catalog: Arc<Catalog>, clicks: Arc<dyn ClickStore>, config: RankingConfig) -> Self {
        Self { catalog, clicks, config, popularity: RwLock::new(None) }
    }

    /// Reorder `results` by fused score. Never adds or drops a document.
    pub fn rerank(&self, results: &[SearchResult], query: &str) -> Vec<SearchResult> {
        let popularity = self.popularity_map();
        let needle = query.trim().to_lowercase();
        let w = self.config.popularity_weight.clamp(0.0, 1.0);

        let mut fused: Vec<SearchResult> = results
            .iter()
            .map(|r| {
                let boost = self.title_boost(r.doc_id, &needle);
                let pop = popularity.get(&r.doc_id).copied().unwrap_or(0.0) as f32;
                let score = (1.0 - w) * (r.score + boost) + w * pop;
                SearchResult { doc_id: r.doc_id, score: score.max(0.0) }
            })
            .collect();
        sort_results(&mut fused);
        fused
    }

    fn title_boost(&self, doc_id: DocId, needle: &str) -> f32 {
        if needle.is_empty() {
            return 0.0;
        }
        let Some(title) = self.catalog.title(doc_id) else { return 0.0 };
        let title = title.trim().to_lowercase();
        if title == needle {
            self.config.exact_match_boost
        } else if title.contains(needle) {
            self.config.partial_match_boost
        } else {
            0.0
        }
    }

    /// Current popularity snapshot. Recomputed only after an invalidation.
    pub fn popularity_map(&self) -> Arc<PopularityMap> {
        if let Some(map) = self.popularity.read().as_ref() {
            return Arc::clone(map);
        }
        let mut slot = self.popularity.write();
        if let Some(map) = slot.as_ref() {
            return Arc::clone(map);
        }
        match self.clicks.counts() {
            Ok(counts) => {
                let map = Arc::new(popularity_from_counts(counts));
                *slot = Some(Arc::clone(&map));
                map
            }
            Err(err) => {
                // Left uncached so the next reader retries the store.
                tracing::warn!(%err, "click store unreadable, using empty popularity");
                Arc::new(PopularityMap::new())
            }
        }
    }

    /// Append a click and invalidate the cached popularity. Store failures
    /// are logged, never returned.
    pub fn log_click(&self, query: &str, doc_id: DocId) {
        if let Err(err) = self.clicks.record(ClickEvent::now(query, doc_id)) {
            tracing::warn!(%err, doc_id, "failed to record click");
            return;
        }
        *self.popularity.write() = None;
    }
}

fn popularity_from_counts(counts: HashMap<DocId, u64>) -> PopularityMap {
    let max = counts.values().copied().max().unwrap_or(0);
    if max == 0 {
        return PopularityMap::new();
    }
    tracing::debug!(docs = counts.len(), max_clicks = max, "recomputed popularity");
    counts.into_iter().map(|(id, c)| (id, c as f64 / max as f64)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::BookRecord;
    use crate::clicks::MemoryClickStore;
    use anyhow::Result;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn catalog() -> Arc<Catalog> {
        Arc::new(Catalog::new(vec![
            BookRecord::new(1, "Rust"),
            BookRecord::new(2, "Rust in Action"),
            BookRecord::new(3, "Go Programming"),
        ]))
    }

    fn results() -> Vec<SearchResult> {
        vec![
            SearchResult { doc_id: 3, score: 0.9 },
            SearchResult { doc_id: 2, score: 0.5 },
            SearchResult { doc_id: 1, score: 0.4 },
        ]
    }

    #[test]
    fn exact_beats_partial_beats_none() {
        let rr = ReRanker::new(catalog(), Arc::new(MemoryClickStore::new()), RankingConfig::default());
        let ranked = rr.rerank(&results(), "RUST");
        let ids: Vec<DocId> = ranked.iter().map(|r| r.doc_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn output_is_permutation_of_input() {
        let rr = ReRanker::new(catalog(), Arc::new(MemoryClickStore::new()), RankingConfig::default());
        let input = results();
        let mut out: Vec<DocId> = rr.rerank(&input, "anything").iter().map(|r| r.doc_id).collect();
        let mut expected: Vec<DocId> = input.iter().map(|r| r.doc_id).collect();
        out.sort();
        expected.sort();
        assert_eq!(out, expected);
        assert!(rr.rerank(&[], "rust").is_empty());
    }

    #[test]
    fn popularity_lifts_clicked_doc() {
        let rr = ReRanker::new(catalog(), Arc::new(MemoryClickStore::new()), RankingConfig::default());
        let tied = vec![SearchResult { doc_id: 1, score: 0.5 }, SearchResult { doc_id: 3, score: 0.5 }];
        assert_eq!(rr.rerank(&tied, "")[0].doc_id, 1);
        rr.log_click("go", 3);
        assert_eq!(rr.rerank(&tied, "")[0].doc_id, 3);
        assert_eq!(rr.popularity_map().get(&3), Some(&1.0));
    }

    struct CountingStore {
        inner: MemoryClickStore,
        scans: AtomicUsize,
    }

    impl ClickStore for CountingStore {
        fn record(&self, event: ClickEvent) -> Result<()> { self.inner.record(event) }
        fn counts(&self) -> Result<HashMap<DocId, u64>> {
            self.scans.fetch_add(1, Ordering::SeqCst);
            self.inner.counts()
        }
    }

    #[test]
    fn popularity_recomputed_only_after_click() {
        let store = Arc::new(CountingStore { inner: MemoryClickStore::new(), scans: AtomicUsize::new(0) });
        let rr = ReRanker::new(catalog(), store.clone(), RankingConfig::default());
        rr.popularity_map();
        rr.popularity_map();
        rr.rerank(&results(), "rust");
        assert_eq!(store.scans.load(Ordering::SeqCst), 1);
        rr.log_click("rust", 1);
        rr.popularity_map();
        rr.popularity_map();
        assert_eq!(store.scans.load(Ordering::SeqCst), 2);
    }

    struct FlakyStore {
        inner: MemoryClickStore,
        failures_left: AtomicUsize,
    }

    impl ClickStore for FlakyStore {
        fn record(&self, event: ClickEvent) -> Result<()> { self.inner.record(event) }
        fn counts(&self) -> Result<HashMap<DocId, u64>> {
            if self.failures_left.load(Ordering::SeqCst) > 0 {
                self.failures_left.fetch_sub(1, Ordering::SeqCst);
                anyhow::bail!("click log unreadable");
            }
            self.inner.counts()
        }
    }

    #[test]
    fn failed_scan_is_not_cached() {
        let inner = MemoryClickStore::new();
        inner.record(ClickEvent::now("go", 3)).unwrap();
        let store = Arc::new(FlakyStore { inner, failures_left: AtomicUsize::new(1) });
        let rr = ReRanker::new(catalog(), store, RankingConfig::default());
        assert!(rr.popularity_map().is_empty());
        assert_eq!(rr.popularity_map().get(&3), Some(&1.0));
    }
}
