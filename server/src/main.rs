use anyhow::{Context, Result};
use clap::Parser;
use shopsearch_core::corpus::load_corpus;
use shopsearch_server::config::{self, ServerConfig};
use shopsearch_server::{router, AppState};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Product catalog: a JSON/JSONL file or a directory of them
    #[arg(long, env = "DATA_FILE_PATH", default_value = "./data/products.json")]
    data: PathBuf,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8088)]
    port: u16,
    /// Results per search when the request does not pass `k`
    #[arg(long, default_value_t = 20)]
    results: usize,
    /// Build the index before accepting requests instead of on the first search
    #[arg(long, default_value_t = false)]
    eager: bool,
    /// Never call the LLM advisor, even when credentials are set
    #[arg(long, default_value_t = false)]
    no_advisor: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_file = config::load_env_file(None);
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    if let Some(file) = env_file {
        tracing::info!(file = %file.display(), "loaded environment file");
    }
    let args = Args::parse();

    let mut config = ServerConfig::from_env(args.data.clone());
    config.default_results = args.results.max(1);
    if args.no_advisor {
        config.advisor = None;
    }
    let corpus = load_corpus(&args.data).with_context(|| format!("loading catalog from {}", args.data.display()))?;
    let state = AppState::new(corpus, config)?;
    if args.eager {
        state.index().await?;
    }

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}
