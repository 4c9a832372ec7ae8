use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Tunables for the whole engine. Every field has a default so a partial
/// JSON file is accepted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub index: IndexOptions,
    pub ranking: RankingConfig,
    pub suggest: SuggestConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IndexOptions {
    /// Use smoothed IDF = ln(1 + N/df) instead of ln(N/df)
    pub smoothed_idf: bool,
    /// Apply English stemming to indexed and query terms
    pub stem: bool,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self { smoothed_idf: true, stem: false }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    pub exact_match_boost: f32,
    pub partial_match_boost: f32,
    /// Share of the fused score taken by popularity, in [0, 1].
    pub popularity_weight: f32,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self { exact_match_boost: 1.0, partial_match_boost: 0.5, popularity_weight: 0.3 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SuggestConfig {
    /// Allowed edits are `max(1, query_chars / distance_divisor)`.
    pub distance_divisor: usize,
    /// Words shorter than this are left alone during per-word correction.
    pub min_word_len: usize,
}

impl Default for SuggestConfig {
    fn default() -> Self {
        Self { distance_divisor: 3, min_word_len: 3 }
    }
}

impl EngineConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let f = File::open(path).with_context(|| format!("opening config {}", path.display()))?;
        let config = serde_json::from_reader(BufReader::new(f))
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    /// Load from `path` when given, defaults otherwise.
    pub fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }
}
