use anyhow::Result;
use axum::Router;
use clap::Parser;
use devshelf_core::EngineConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};
use server::build_app;
use tokio::net::TcpListener;

#[derive(Parser)]
struct Args {
    /// Corpus file or directory (.json / .jsonl)
    #[arg(long, default_value = "./books.json")]
    corpus: String,
    /// Click log (JSON lines); clicks stay in memory when omitted
    #[arg(long)]
    clicks: Option<PathBuf>,
    /// Engine config (JSON)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let config = EngineConfig::load_or_default(args.config.as_ref())?;
    let app: Router = build_app(&args.corpus, args.clicks, config)?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
