pub mod book;
pub mod clicks;
pub mod config;
pub mod engine;
pub mod graph;
pub mod index;
pub mod persist;
pub mod rerank;
pub mod suggest;
pub mod tokenizer;

pub use book::{normalize, BookRecord, Catalog};
pub use config::EngineConfig;
pub use engine::{Engine, SearchOutcome};
pub use index::{InvertedIndex, SearchResult};

pub type TermId = u32;
pub type DocId = u32;
