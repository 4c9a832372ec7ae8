use anyhow::Result;
use clap::{Parser, Subcommand};
use devshelf_core::clicks::{ClickStore, JsonlClickStore, MemoryClickStore};
use devshelf_core::persist::load_corpus;
use devshelf_core::{BookRecord, DocId, Engine, EngineConfig, SearchOutcome};
use tracing_subscriber::{EnvFilter, fmt};

use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "shelf")]
#[command(about = "Search, suggest and recommend over a book corpus", long_about = None)]
struct Cli {
    /// Corpus file or directory (.json / .jsonl)
    #[arg(long, global = true, default_value = "./books.json")]
    corpus: String,
    /// Click log (JSON lines) used for popularity
    #[arg(long, global = true)]
    clicks: Option<PathBuf>,
    /// Engine config (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Print machine-readable JSON instead of text
    #[arg(long, global = true, default_value_t = false)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ranked search with typo fallback
    Search {
        query: String,
        /// Number of results to show
        #[arg(long, default_value_t = 10)]
        k: usize,
    },
    /// Titles related to the given one
    Related {
        title: String,
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },
    /// Closest known title or term
    Suggest { query: String },
    /// Record that a result was chosen for a query
    Click { query: String, doc_id: DocId },
    /// Corpus, index and graph sizes
    Stats,
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).with_writer(std::io::stderr).init();
    let cli = Cli::parse();

    let config = EngineConfig::load_or_default(cli.config.as_ref())?;
    let store: Arc<dyn ClickStore> = match &cli.clicks {
        Some(path) => Arc::new(JsonlClickStore::new(path)),
        None => Arc::new(MemoryClickStore::new()),
    };
    let engine = Engine::build(load_corpus(&cli.corpus)?, store, config);

    match cli.command {
        Commands::Search { query, k } => run_search(&engine, &query, k, cli.json),
        Commands::Related { title, limit } => {
            let related = engine.related(&title, limit);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&related)?);
            } else if related.is_empty() {
                println!("No related titles for \"{title}\".");
            } else {
                for (rank, r) in related.iter().enumerate() {
                    println!("{:>2}. {} (id {}, similarity {:.2}, score {:.3})", rank + 1, r.title, r.doc_id, r.weight, r.score);
                }
            }
            Ok(())
        }
        Commands::Suggest { query } => {
            match engine.suggest(&query) {
                Some(s) => println!("{s}"),
                None => println!("No suggestion for \"{query}\"."),
            }
            Ok(())
        }
        Commands::Click { query, doc_id } => {
            if engine.book(doc_id).is_none() {
                anyhow::bail!("no book with id {doc_id}");
            }
            if cli.clicks.is_none() {
                tracing::warn!("no --clicks file given, click will not be kept");
            }
            engine.log_click(&query, doc_id);
            println!("Logged click for book {doc_id}.");
            Ok(())
        }
        Commands::Stats => {
            let stats = serde_json::json!({
                "books": engine.catalog().len(),
                "terms": engine.index().num_terms(),
                "vocabulary": engine.suggester().vocabulary_len(),
                "graph_nodes": engine.graph().num_nodes(),
                "graph_edges": engine.graph().num_edges(),
                "clicked_books": engine.popularity_map().len(),
            });
            println!("{}", serde_json::to_string_pretty(&stats)?);
            Ok(())
        }
    }
}

fn run_search(engine: &Engine, query: &str, k: usize, json: bool) -> Result<()> {
    let outcome = engine.search(query);
    let hits: Vec<(f32, &BookRecord)> = outcome
        .results()
        .iter()
        .take(k)
        .filter_map(|r| engine.book(r.doc_id).map(|b| (r.score, b)))
        .collect();

    if json {
        let results: Vec<_> = hits
            .iter()
            .map(|(score, b)| serde_json::json!({ "score": score, "book": b }))
            .collect();
        let (used, replaced) = match &outcome {
            SearchOutcome::Hits { used_query, replaced, .. } => (Some(used_query.as_str()), replaced.as_deref()),
            SearchOutcome::SuggestionEmpty { suggestion } => (Some(suggestion.as_str()), Some(query)),
            SearchOutcome::NoMatch => (None, None),
        };
        let out = serde_json::json!({ "query": query, "used_query": used, "replaced": replaced, "results": results });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    match &outcome {
        SearchOutcome::NoMatch => println!("No results for \"{query}\" and no similar titles found."),
        SearchOutcome::SuggestionEmpty { suggestion } => {
            println!("No results for \"{query}\". Did you mean \"{suggestion}\"? It returned no results either.")
        }
        SearchOutcome::Hits { used_query, replaced, results } => {
            if replaced.is_some() {
                println!("No results for \"{query}\". Showing results for \"{used_query}\" instead.");
            }
            println!("{} result(s), showing {}:", results.len(), hits.len());
            for (rank, (score, b)) in hits.iter().enumerate() {
                println!(
                    "{:>2}. [{}] {} by {} ({}, {}) score {:.3}",
                    rank + 1,
                    b.id,
                    b.title_or_empty(),
                    b.author.as_deref().unwrap_or("unknown"),
                    b.language.as_deref().unwrap_or("-"),
                    b.category.as_deref().unwrap_or("-"),
                    score
                );
            }
        }
    }
    Ok(())
}
