use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use shopsearch_core::corpus::load_corpus;
use shopsearch_core::rank::score_product;
use shopsearch_core::search::rank_terms;
use shopsearch_core::tokenizer::normalize;
use shopsearch_core::{build_index, IndexBundle, RankingParams, ScoreBreakdown};
use tracing_subscriber::{fmt, EnvFilter};

use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build the product index and query it from the command line", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index and print a JSON report
    Build {
        /// Input path (file or directory of JSON/JSONL)
        #[arg(long)]
        input: PathBuf,
        /// Also list the N terms with the highest document frequency
        #[arg(long, default_value_t = 0)]
        top_terms: usize,
    },
    /// Build the index and print the ranked results for one query as JSON
    Query {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        q: String,
        #[arg(long, default_value_t = shopsearch_core::DEFAULT_LIMIT)]
        k: usize,
        /// Include each result's score factors
        #[arg(long, default_value_t = false)]
        explain: bool,
    },
}

#[derive(Debug, Serialize)]
struct BuildReport {
    num_docs: u32,
    num_terms: usize,
    took_s: f64,
    created_at: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    top_terms: Vec<TermStat>,
}

#[derive(Debug, Serialize, PartialEq)]
struct TermStat {
    term: String,
    df: u32,
    idf: f64,
}

#[derive(Debug, Serialize)]
struct QueryReport {
    query: String,
    terms: Vec<String>,
    total_hits: usize,
    results: Vec<QueryHit>,
}

#[derive(Debug, Serialize)]
struct QueryHit {
    rank: usize,
    pid: String,
    title: String,
    score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    explain: Option<ScoreBreakdown>,
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    let out = match cli.command {
        Commands::Build { input, top_terms } => {
            let start = Instant::now();
            let bundle = build_index(&load_corpus(&input)?);
            serde_json::to_string_pretty(&build_report(&bundle, top_terms, start.elapsed().as_secs_f64()))?
        }
        Commands::Query { input, q, k, explain } => {
            let bundle = build_index(&load_corpus(&input)?);
            serde_json::to_string_pretty(&query_report(&bundle, &q, k, explain, &RankingParams::default()))?
        }
    };
    println!("{out}");
    Ok(())
}

fn build_report(bundle: &IndexBundle, top_terms: usize, took_s: f64) -> BuildReport {
    let created_at = time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default();
    tracing::info!(num_docs = bundle.num_docs, num_terms = bundle.num_terms(), took_s, "index build complete");
    BuildReport {
        num_docs: bundle.num_docs,
        num_terms: bundle.num_terms(),
        took_s,
        created_at,
        top_terms: top_terms_by_df(bundle, top_terms),
    }
}

/// Most widespread terms first, ties alphabetical.
fn top_terms_by_df(bundle: &IndexBundle, n: usize) -> Vec<TermStat> {
    let mut stats: Vec<TermStat> = bundle
        .df
        .iter()
        .map(|(term, df)| TermStat { term: term.clone(), df: *df, idf: bundle.idf_weight(term) })
        .collect();
    stats.sort_by(|a, b| b.df.cmp(&a.df).then_with(|| a.term.cmp(&b.term)));
    stats.truncate(n);
    stats
}

fn query_report(bundle: &IndexBundle, query: &str, k: usize, explain: bool, params: &RankingParams) -> QueryReport {
    let terms = normalize(query);
    let ranked = rank_terms(&terms, bundle, params);
    let total_hits = ranked.len();
    let results = ranked
        .into_iter()
        .take(k)
        .enumerate()
        .filter_map(|(i, hit)| {
            let product = bundle.product(&hit.pid)?;
            Some(QueryHit {
                rank: i + 1,
                title: product.title.clone(),
                score: hit.score,
                explain: explain.then(|| score_product(&terms, bundle, product, params)),
                pid: hit.pid,
            })
        })
        .collect();
    QueryReport { query: query.to_string(), terms, total_hits, results }
}
