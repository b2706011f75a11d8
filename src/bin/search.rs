//! Search binary entry point.
//!
//! Queries a previously built snapshot with semantic similarity, with
//! optional year and score filters and table, JSON, or CSV output.
//!
//! # Examples
//!
//! ```bash
//! search --index-dir index --query "latest RCTs on knee osteoarthritis physiotherapy"
//! search --index-dir index --query "telemedicine" --format json --year-start 2020
//! search --index-dir index --query "covid vaccines" --format csv > results.csv
//! ```

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use medscope_search::{
    embedding::{fastembed::FastEmbedProvider, EmbeddingProvider},
    export,
    search::{SearchEngine, SearchRequest},
    store::SearchIndex,
    SearchResult,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Output format for search results
#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    /// Human-friendly table
    Table,
    /// Machine-readable JSON
    Json,
    /// CSV export of the result list
    Csv,
}

/// Search CLI for querying a snapshot with semantic similarity
#[derive(Parser, Debug)]
#[command(
    name = "search",
    version,
    about = "Search papers in a snapshot using semantic similarity",
    long_about = "Query a previously built snapshot using semantic search, with optional \
                  publication-year and similarity-score filters.

EXAMPLES:
  Single query:
    search --index-dir index --query \"knee osteoarthritis physiotherapy\"

  JSON output with year filter:
    search --index-dir index --query \"telemedicine\" --format json --year-start 2020

  CSV export:
    search --index-dir index --query \"covid vaccines\" --format csv > results.csv"
)]
struct Args {
    /// Directory holding the snapshot artifacts
    #[arg(long, value_name = "DIR", default_value = "index")]
    index_dir: PathBuf,

    /// Search query text
    #[arg(short, long, value_name = "TEXT")]
    query: String,

    /// Number of results to return
    #[arg(long, value_name = "N", default_value = "10")]
    top_k: usize,

    /// Filter papers from this year onwards (inclusive)
    #[arg(long, value_name = "YEAR")]
    year_start: Option<i32>,

    /// Filter papers up to this year (inclusive)
    #[arg(long, value_name = "YEAR")]
    year_end: Option<i32>,

    /// Minimum similarity score (inclusive)
    #[arg(long, value_name = "SCORE", default_value = "0.0")]
    min_score: f32,

    /// Fail the search after this many seconds
    #[arg(long, value_name = "SECS")]
    timeout_secs: Option<u64>,

    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    format: OutputFormat,

    /// Logging verbosity level
    #[arg(long, value_name = "LEVEL", default_value = "warn")]
    log_level: String,

    /// Embedding model cache directory
    #[arg(long, value_name = "DIR")]
    cache_dir: Option<PathBuf>,
}

impl Args {
    fn to_request(&self) -> SearchRequest {
        let mut request = SearchRequest::new(self.query.clone())
            .with_min_score(self.min_score)
            .with_limit(self.top_k);
        // an open-ended bound falls back to the widest representable year
        if self.year_start.is_some() || self.year_end.is_some() {
            request = request.with_year_range(
                self.year_start.unwrap_or(i32::MIN),
                self.year_end.unwrap_or(i32::MAX),
            );
        }
        request
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn model_cache_dir(cli: Option<PathBuf>) -> PathBuf {
    cli.unwrap_or_else(|| {
        dirs::cache_dir()
            .map(|p| p.join("fastembed"))
            .unwrap_or_else(|| PathBuf::from(".cache/fastembed"))
    })
}

fn print_table(results: &[SearchResult]) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(["Rank", "Score", "Title", "Journal", "Year", "DOI"]);
    for result in results {
        table.add_row([
            Cell::new(result.rank),
            Cell::new(format!("{:.3}", result.score)),
            Cell::new(&result.document.title),
            Cell::new(&result.document.journal),
            Cell::new(result.document.year),
            Cell::new(&result.document.doi),
        ]);
    }
    println!("{table}");
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let cache_dir = model_cache_dir(args.cache_dir.clone());
    let provider = Arc::new(
        FastEmbedProvider::new(None, Some(cache_dir))
            .context("failed to initialize embedding model")?,
    );

    let index = Arc::new(SearchIndex::new(provider.dimension()));
    index
        .load_dir(&args.index_dir, provider.dimension())
        .with_context(|| format!("failed to load snapshot from {:?}", args.index_dir))?;
    info!(
        version = medscope_search::VERSION,
        documents = index.snapshot().len(),
        "snapshot loaded"
    );

    let engine = SearchEngine::new(provider, index);
    let request = args.to_request();

    let start = Instant::now();
    let results = match args.timeout_secs {
        Some(secs) => {
            engine
                .search_with_timeout(&request, Duration::from_secs(secs))
                .await?
        }
        None => engine.search(&request).await?,
    };
    info!(elapsed = ?start.elapsed(), returned = results.len(), "search finished");

    match args.format {
        OutputFormat::Table => {
            if results.is_empty() {
                println!("No papers matched the query and filters.");
            } else {
                print_table(&results);
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
        OutputFormat::Csv => {
            export::write_results_csv(std::io::stdout().lock(), &results)?;
        }
    }

    Ok(())
}
