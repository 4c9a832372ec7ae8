//! Content-similarity graph between books, keyed by normalized title.
//!
//! Edge weights add up author (1.0), programming language (0.9) and tag
//! Jaccard (up to 0.5) matches, plus a category bonus (0.2) that only applies
//! while the running score is below 0.9. Totals under 0.3 are not stored.

use crate::book::{normalize, same_text, BookRecord};
use crate::rerank::PopularityMap;
use crate::DocId;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

pub const AUTHOR_WEIGHT: f64 = 1.0;
pub const LANGUAGE_WEIGHT: f64 = 0.9;
pub const TAG_WEIGHT: f64 = 0.5;
pub const CATEGORY_WEIGHT: f64 = 0.2;
pub const CATEGORY_CUTOFF: f64 = 0.9;
pub const MIN_EDGE_WEIGHT: f64 = 0.3;
/// Share of the blended recommendation score taken by edge weight.
pub const SIMILARITY_SHARE: f64 = 0.7;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Related {
    pub key: String,
    pub title: String,
    pub doc_id: DocId,
    pub weight: f64,
    pub score: f64,
}

#[derive(Debug, Clone)]
struct Node {
    doc_id: DocId,
    title: String,
}

#[derive(Debug, Default)]
pub struct SimilarityGraph {
    adjacency: HashMap<String, HashMap<String, f64>>,
    // last-processed record wins on title collisions
    nodes: HashMap<String, Node>,
}

impl SimilarityGraph {
    pub fn build(books: &[BookRecord]) -> Self {
        let mut graph = Self::default();
        let keys: Vec<Option<String>> = books
            .iter()
            .map(|b| b.title.as_deref().map(normalize).filter(|k| !k.is_empty()))
            .collect();
        let tag_sets: Vec<BTreeSet<String>> = books.iter().map(BookRecord::normalized_tags).collect();

        for (book, key) in books.iter().zip(&keys) {
            let Some(key) = key else { continue };
            graph.adjacency.entry(key.clone()).or_default();
            graph.nodes.insert(key.clone(), Node { doc_id: book.id, title: book.title_or_empty().to_string() });
        }

        let mut num_edges = 0usize;
        for i in 0..books.len() {
            let Some(k1) = &keys[i] else { continue };
            for j in (i + 1)..books.len() {
                let Some(k2) = &keys[j] else { continue };
                if k1 == k2 { continue; }
                let score = score_with_tags(&books[i], &books[j], &tag_sets[i], &tag_sets[j]);
                if score <= 0.0 { continue; }
                graph.add_edge(k1, k2, score);
                num_edges += 1;
            }
        }
        tracing::info!(nodes = graph.nodes.len(), num_edges, "built similarity graph");
        graph
    }

    fn add_edge(&mut self, a: &str, b: &str, weight: f64) {
        for (from, to) in [(a, b), (b, a)] {
            let slot = self
                .adjacency
                .entry(from.to_string())
                .or_default()
                .entry(to.to_string())
                .or_insert(weight);
            if weight > *slot { *slot = weight; }
        }
    }

    /// Neighbors of `title` ranked by `0.7 * weight + 0.3 * popularity`, at most `limit`.
    pub fn recommend_scored(&self, title: &str, limit: usize, popularity: &PopularityMap) -> Vec<Related> {
        let key = normalize(title);
        let Some(neighbors) = self.adjacency.get(&key) else { return Vec::new() };
        let mut related: Vec<Related> = neighbors
            .iter()
            .filter(|(k, _)| **k != key)
            .filter_map(|(k, &weight)| {
                let node = self.nodes.get(k)?;
                let pop = popularity.get(&node.doc_id).copied().unwrap_or(0.0);
                let score = SIMILARITY_SHARE * weight + (1.0 - SIMILARITY_SHARE) * pop;
                Some(Related { key: k.clone(), title: node.title.clone(), doc_id: node.doc_id, weight, score })
            })
            .collect();
        related.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.key.cmp(&b.key)));
        related.truncate(limit);
        related
    }

    pub fn recommend(&self, title: &str, limit: usize, popularity: &PopularityMap) -> Vec<String> {
        self.recommend_scored(title, limit, popularity).into_iter().map(|r| r.title).collect()
    }

    /// Stored weight between two titles, zero when there is no edge.
    pub fn edge_weight(&self, a: &str, b: &str) -> f64 {
        self.adjacency
            .get(&normalize(a))
            .and_then(|n| n.get(&normalize(b)))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn doc_id_for(&self, title: &str) -> Option<DocId> {
        self.nodes.get(&normalize(title)).map(|n| n.doc_id)
    }

    pub fn contains(&self, title: &str) -> bool {
        self.adjacency.contains_key(&normalize(title))
    }

    pub fn num_nodes(&self) -> usize { self.adjacency.len() }

    pub fn num_edges(&self) -> usize {
        self.adjacency.values().map(HashMap::len).sum::<usize>() / 2
    }
}

/// Pairwise similarity, zero below the edge threshold.
pub fn similarity(a: &BookRecord, b: &BookRecord) -> f64 {
    score_with_tags(a, b, &a.normalized_tags(), &b.normalized_tags())
}

fn score_with_tags(a: &BookRecord, b: &BookRecord, tags_a: &BTreeSet<String>, tags_b: &BTreeSet<String>) -> f64 {
    let mut score = 0.0;
    if same_text(a.author.as_deref(), b.author.as_deref()) {
        score += AUTHOR_WEIGHT;
    }
    if same_text(a.language.as_deref(), b.language.as_deref()) {
        score += LANGUAGE_WEIGHT;
    }
    score += jaccard(tags_a, tags_b) * TAG_WEIGHT;
    if same_text(a.category.as_deref(), b.category.as_deref()) && score < CATEGORY_CUTOFF {
        score += CATEGORY_WEIGHT;
    }
    if score >= MIN_EDGE_WEIGHT { score } else { 0.0 }
}

pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn knuth_example_scores_1_25() {
        let a = BookRecord::new(1, "TAOCP").with_author("Knuth").with_language("C")
            .with_category("CS").with_tags(&["algorithms"]);
        let b = BookRecord::new(2, "Concrete").with_author("Knuth").with_language("Pascal")
            .with_category("CS").with_tags(&["algorithms", "math"]);
        assert_eq!(similarity(&a, &b), 1.25);
        assert_eq!(similarity(&b, &a), 1.25);
    }

    #[test]
    fn category_bonus_only_under_cutoff() {
        let a = BookRecord::new(1, "A").with_category("Web").with_tags(&["html"]);
        let b = BookRecord::new(2, "B").with_category("web").with_tags(&["html", "css"]);
        assert!((similarity(&a, &b) - 0.45).abs() < 1e-12);

        let c = BookRecord::new(3, "C").with_language("Go").with_category("Web");
        let d = BookRecord::new(4, "D").with_language("go").with_category("Web");
        assert_eq!(similarity(&c, &d), 0.9);
    }

    #[test]
    fn shared_author_and_language_suppress_category() {
        let a = BookRecord::new(1, "A").with_author("Knuth").with_language("C").with_category("CS");
        let b = BookRecord::new(2, "B").with_author("knuth").with_language("c").with_category("cs");
        assert!((similarity(&a, &b) - 1.9).abs() < 1e-12);
        assert!((similarity(&b, &a) - 1.9).abs() < 1e-12);
        let g = SimilarityGraph::build(&[a, b]);
        assert_eq!(g.num_edges(), 1);
        assert!((g.edge_weight("A", "B") - 1.9).abs() < 1e-12);
    }

    #[test]
    fn weak_links_are_dropped() {
        let a = BookRecord::new(1, "A").with_category("Web");
        let b = BookRecord::new(2, "B").with_category("Web");
        assert_eq!(similarity(&a, &b), 0.0);
        let g = SimilarityGraph::build(&[a, b]);
        assert_eq!(g.num_edges(), 0);
        assert!(g.recommend("A", 5, &PopularityMap::new()).is_empty());
    }

    #[test]
    fn synonym_tags_overlap_fully() {
        let a = BookRecord::new(1, "A").with_tags(&["JS"]);
        let b = BookRecord::new(2, "B").with_tags(&["Javascript"]);
        assert_eq!(jaccard(&a.normalized_tags(), &b.normalized_tags()), 1.0);
        assert_eq!(similarity(&a, &b), 0.5);
    }

    #[test]
    fn missing_fields_contribute_nothing() {
        let a = BookRecord::new(1, "A");
        let b = BookRecord::new(2, "B");
        assert_eq!(similarity(&a, &b), 0.0);
    }

    #[test]
    fn title_collisions_merge_without_self_edge() {
        let books = vec![
            BookRecord::new(1, "Clean Code").with_author("Martin"),
            BookRecord::new(2, " clean code ").with_author("Martin"),
            BookRecord::new(3, "Clean Architecture").with_author("Martin"),
        ];
        let g = SimilarityGraph::build(&books);
        assert_eq!(g.num_nodes(), 2);
        assert_eq!(g.doc_id_for("CLEAN CODE"), Some(2));
        assert_eq!(g.edge_weight("clean code", "clean code"), 0.0);
        assert_eq!(g.recommend("Clean Code", 5, &PopularityMap::new()), vec!["Clean Architecture".to_string()]);
    }
}
