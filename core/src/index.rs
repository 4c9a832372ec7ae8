use crate::book::BookRecord;
use crate::config::IndexOptions;
use crate::tokenizer::tokenize;
use crate::{DocId, TermId};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SearchResult {
    pub doc_id: DocId,
    pub score: f32,
}

#[derive(Debug, Clone)]
pub struct Posting {
    pub doc_id: DocId,
    pub tf: u32,
    pub weight: f32, // normalized tf-idf weight
}

/// Immutable TF-IDF index over the corpus. Term ids are assigned in
/// first-seen order so two builds from the same corpus are identical.
#[derive(Debug, Default)]
pub struct InvertedIndex {
    dictionary: HashMap<String, TermId>,
    df: Vec<u32>,
    postings: Vec<Vec<Posting>>, // indexed by term id, sorted by doc_id
    doc_lengths: HashMap<DocId, u32>,
    num_docs: u32,
    options: IndexOptions,
}

impl InvertedIndex {
    pub fn build(books: &[BookRecord], options: IndexOptions) -> Self {
        let mut dictionary: HashMap<String, TermId> = HashMap::new();
        let mut df: Vec<u32> = Vec::new();
        let mut doc_lengths: HashMap<DocId, u32> = HashMap::new();
        let mut per_doc: Vec<(DocId, BTreeMap<TermId, u32>)> = Vec::with_capacity(books.len());

        for book in books {
            let mut tf_counts: BTreeMap<TermId, u32> = BTreeMap::new();
            let mut length = 0u32;
            for field in book.searchable_fields() {
                for term in tokenize(field, options.stem) {
                    let next = dictionary.len() as TermId;
                    let tid = *dictionary.entry(term).or_insert(next);
                    if df.len() <= tid as usize { df.resize(tid as usize + 1, 0); }
                    *tf_counts.entry(tid).or_insert(0) += 1;
                    length += 1;
                }
            }
            for tid in tf_counts.keys() {
                df[*tid as usize] += 1;
            }
            doc_lengths.insert(book.id, length);
            per_doc.push((book.id, tf_counts));
        }

        let num_docs = books.len() as u32;
        let n = num_docs.max(1);
        let idf: Vec<f32> = df.iter().map(|&d| idf_weight(n, d, options.smoothed_idf)).collect();

        let mut postings: Vec<Vec<Posting>> = vec![Vec::new(); df.len()];
        for (doc_id, tf_counts) in &per_doc {
            // Norm is accumulated in term-id order for bit-identical rebuilds.
            let mut norm = 0.0f32;
            for (tid, tf_raw) in tf_counts {
                let w = log_tf(*tf_raw) * idf[*tid as usize];
                norm += w * w;
            }
            norm = norm.sqrt();
            if norm == 0.0 { norm = 1.0; }
            for (tid, tf_raw) in tf_counts {
                let weight = log_tf(*tf_raw) * idf[*tid as usize] / norm;
                postings[*tid as usize].push(Posting { doc_id: *doc_id, tf: *tf_raw, weight });
            }
        }
        for plist in postings.iter_mut() {
            plist.sort_by_key(|p| p.doc_id);
        }

        tracing::info!(num_docs, num_terms = dictionary.len(), "built inverted index");
        Self { dictionary, df, postings, doc_lengths, num_docs, options }
    }

    /// Score every document sharing at least one term with `query`.
    pub fn search(&self, query: &str) -> Vec<SearchResult> {
        // BTreeMap keeps accumulation order fixed across runs.
        let mut tf_q_raw: BTreeMap<TermId, u32> = BTreeMap::new();
        for term in tokenize(query, self.options.stem) {
            if let Some(&tid) = self.dictionary.get(&term) {
                *tf_q_raw.entry(tid).or_insert(0) += 1;
            }
        }
        if tf_q_raw.is_empty() {
            tracing::debug!(query, "no known terms in query");
            return Vec::new();
        }

        let n = self.num_docs.max(1);
        let mut q_weights: Vec<(TermId, f32)> = tf_q_raw
            .iter()
            .map(|(&tid, &tf_raw)| {
                let df_t = self.df[tid as usize];
                (tid, log_tf(tf_raw) * idf_weight(n, df_t, self.options.smoothed_idf))
            })
            .collect();
        let mut norm = q_weights.iter().map(|(_, w)| w * w).sum::<f32>().sqrt();
        if norm == 0.0 { norm = 1.0; }
        for (_, w) in q_weights.iter_mut() { *w /= norm; }

        let mut scores: HashMap<DocId, f32> = HashMap::new();
        for (tid, q_w) in &q_weights {
            for p in &self.postings[*tid as usize] {
                *scores.entry(p.doc_id).or_insert(0.0) += p.weight * q_w;
            }
        }

        let mut scored: Vec<SearchResult> = scores
            .into_iter()
            .map(|(doc_id, score)| SearchResult { doc_id, score: score.max(0.0) })
            .collect();
        sort_results(&mut scored);
        tracing::debug!(query, hits = scored.len(), "index search");
        scored
    }

    pub fn search_top(&self, query: &str, k: usize) -> Vec<SearchResult> {
        let mut results = self.search(query);
        results.truncate(k);
        results
    }

    /// Indexed terms in lexicographic order.
    pub fn terms(&self) -> Vec<&str> {
        let mut terms: Vec<&str> = self.dictionary.keys().map(String::as_str).collect();
        terms.sort_unstable();
        terms
    }

    pub fn contains_term(&self, term: &str) -> bool {
        self.dictionary.contains_key(term)
    }

    pub fn doc_freq(&self, term: &str) -> u32 {
        self.dictionary.get(term).map(|&tid| self.df[tid as usize]).unwrap_or(0)
    }

    /// Raw frequency of `term` in `doc_id`, zero when absent.
    pub fn term_freq(&self, term: &str, doc_id: DocId) -> u32 {
        let Some(&tid) = self.dictionary.get(term) else { return 0 };
        let plist = &self.postings[tid as usize];
        plist
            .binary_search_by_key(&doc_id, |p| p.doc_id)
            .map(|i| plist[i].tf)
            .unwrap_or(0)
    }

    pub fn doc_length(&self, doc_id: DocId) -> u32 {
        self.doc_lengths.get(&doc_id).copied().unwrap_or(0)
    }

    pub fn num_docs(&self) -> u32 { self.num_docs }

    pub fn num_terms(&self) -> usize { self.dictionary.len() }
}

/// Descending score, ascending doc id on ties.
pub fn sort_results(results: &mut [SearchResult]) {
    results.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.doc_id.cmp(&b.doc_id)));
}

#[inline]
fn log_tf(tf_raw: u32) -> f32 {
    if tf_raw > 0 { 1.0 + (tf_raw as f32).ln() } else { 0.0 }
}

#[inline]
fn idf_weight(n: u32, df_t: u32, smoothed: bool) -> f32 {
    let ratio = n as f32 / df_t.max(1) as f32;
    if smoothed { (1.0 + ratio).ln() } else { ratio.ln() }
}
