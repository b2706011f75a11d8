//! Ingestion binary entry point.
//!
//! Builds a searchable snapshot from a CSV of paper metadata: parses the
//! source, embeds every paper's searchable text, and persists the aligned
//! metadata/vector artifacts into an index directory.
//!
//! # Examples
//!
//! ```bash
//! ingest --input papers.csv --index-dir index
//! ingest --input papers.csv --index-dir index --chunk-size 64 --log-level debug
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use medscope_search::{
    embedding::{fastembed::FastEmbedProvider, EmbeddingProvider},
    ingest,
    store::persist,
};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Ingestion CLI for building the paper search snapshot
#[derive(Parser, Debug)]
#[command(
    name = "ingest",
    version,
    about = "Build a searchable snapshot from a CSV of paper metadata",
    long_about = "Parses paper metadata from CSV, generates embeddings for every paper, \
                  and persists the snapshot into an index directory.

EXAMPLES:
  Build a snapshot:
    ingest --input papers.csv --index-dir index

  Smaller embedding chunks and verbose logging:
    ingest --input papers.csv --index-dir index --chunk-size 16 --log-level debug"
)]
struct Args {
    /// Input CSV file with columns title, abstract, authors, journal, year, doi
    #[arg(short, long, value_name = "FILE")]
    input: PathBuf,

    /// Directory receiving the snapshot artifacts
    #[arg(long, value_name = "DIR", default_value = "index")]
    index_dir: PathBuf,

    /// Number of papers embedded per model invocation
    #[arg(long, value_name = "N", default_value = "32")]
    chunk_size: usize,

    /// Logging verbosity level
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    log_level: String,

    /// Embedding model cache directory
    #[arg(long, value_name = "DIR")]
    cache_dir: Option<PathBuf>,
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

fn progress_bar(total: usize) -> ProgressBar {
    let bar = ProgressBar::new(total as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} papers")
            .expect("valid progress bar template")
            .progress_chars("##-"),
    );
    bar
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    info!(version = medscope_search::VERSION, "starting ingestion");
    let start = Instant::now();

    if !args.input.exists() {
        anyhow::bail!("input file not found: {:?}", args.input);
    }

    let cache_dir = model_cache_dir(args.cache_dir.clone());
    let provider = FastEmbedProvider::new(None, Some(cache_dir))
        .context("failed to initialize embedding model")?
        .with_chunk_size(args.chunk_size);
    info!(
        model = provider.model_name(),
        dimension = provider.dimension(),
        "embedding model ready"
    );

    let (documents, mut report) = ingest::read_documents_csv(&args.input)
        .with_context(|| format!("failed to read {:?}", args.input))?;
    if documents.is_empty() {
        warn!("no usable papers in input");
    }

    let bar = progress_bar(documents.len());
    let snapshot = ingest::build_snapshot(
        &provider,
        documents,
        args.chunk_size,
        &mut report,
        |processed| bar.set_position(processed as u64),
    )
    .await
    .context("failed to build snapshot")?;
    bar.finish();

    persist::save_snapshot(&snapshot, &args.index_dir)
        .with_context(|| format!("failed to save snapshot to {:?}", args.index_dir))?;

    let elapsed = start.elapsed();
    println!("Ingestion complete");
    println!("  rows read:  {}", report.rows_read);
    println!("  ingested:   {}", report.ingested);
    println!("  skipped:    {}", report.skipped.len());
    println!("  elapsed:    {:.2?}", elapsed);

    for skip in &report.skipped {
        warn!(row = skip.row, reason = %skip.reason, "skipped during ingestion");
    }

    Ok(())
}
