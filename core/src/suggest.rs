use crate::book::{normalize, BookRecord};
use crate::config::SuggestConfig;
use crate::tokenizer::{is_stopword, tokenize};
use std::collections::BTreeSet;

/// "Did you mean" over normalized titles and single terms from the corpus.
#[derive(Debug, Default)]
pub struct Suggester {
    vocabulary: BTreeSet<String>,
    terms: BTreeSet<String>,
    config: SuggestConfig,
}

impl Suggester {
    pub fn build(books: &[BookRecord], config: SuggestConfig) -> Self {
        let mut vocabulary = BTreeSet::new();
        let mut terms = BTreeSet::new();
        for book in books {
            if let Some(title) = book.title.as_deref() {
                let t = normalize(title);
                if !t.is_empty() { vocabulary.insert(t); }
            }
            for field in book.searchable_fields() {
                terms.extend(tokenize(field, false));
            }
        }
        vocabulary.extend(terms.iter().cloned());
        tracing::info!(entries = vocabulary.len(), terms = terms.len(), "built suggester vocabulary");
        Self { vocabulary, terms, config }
    }

    /// Closest known title or term within the edit budget, else a per-word
    /// correction of the query, else `None`.
    pub fn suggest_similar(&self, query: &str) -> Option<String> {
        let raw = query.trim().to_lowercase();
        let key = normalize(query);
        if key.is_empty() {
            return None;
        }
        let budget = self.budget(&key);
        if let Some(best) = closest(&key, self.vocabulary.iter(), budget, &raw) {
            tracing::debug!(query, suggestion = best, "whole-query suggestion");
            return Some(best.to_string());
        }
        self.correct_words(&raw)
    }

    fn correct_words(&self, raw: &str) -> Option<String> {
        let mut changed = false;
        let mut out: Vec<String> = Vec::new();
        for word in raw.split_whitespace() {
            let len = word.chars().count();
            if len < self.config.min_word_len || is_stopword(word) || self.terms.contains(word) {
                out.push(word.to_string());
                continue;
            }
            match closest(word, self.terms.iter(), self.budget(word), word) {
                Some(fixed) => {
                    changed = true;
                    out.push(fixed.to_string());
                }
                None => out.push(word.to_string()),
            }
        }
        if changed { Some(out.join(" ")) } else { None }
    }

    fn budget(&self, s: &str) -> usize {
        (s.chars().count() / self.config.distance_divisor.max(1)).max(1)
    }

    pub fn vocabulary_len(&self) -> usize { self.vocabulary.len() }
}

/// Best entry by (distance, length difference, lexicographic), skipping `exclude`.
fn closest<'a, I>(target: &str, entries: I, budget: usize, exclude: &str) -> Option<&'a str>
where
    I: Iterator<Item = &'a String>,
{
    let target_len = target.chars().count();
    let mut best: Option<(usize, usize, &'a str)> = None;
    for entry in entries {
        if entry == exclude { continue; }
        let Some(dist) = levenshtein_within(target, entry, budget) else { continue };
        let len_diff = entry.chars().count().abs_diff(target_len);
        let cand = (dist, len_diff, entry.as_str());
        if best.map_or(true, |b| cand < b) {
            best = Some(cand);
        }
    }
    best.map(|(_, _, e)| e)
}

/// Edit distance between `a` and `b` if it is at most `max`.
pub fn levenshtein_within(a: &str, b: &str, max: usize) -> Option<usize> {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.len().abs_diff(b.len()) > max {
        return None;
    }
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];
    for i in 1..=a.len() {
        curr[0] = i;
        let mut row_min = curr[0];
        for j in 1..=b.len() {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
            row_min = row_min.min(curr[j]);
        }
        if row_min > max {
            return None;
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    let dist = prev[b.len()];
    if dist <= max { Some(dist) } else { None }
}
