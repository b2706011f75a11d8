//! Corpus ingestion pipeline.
//!
//! Ingestion turns a CSV of paper metadata into a fully embedded
//! [`IndexSnapshot`](crate::store::IndexSnapshot). The pipeline is
//! skip-and-continue at the row level: a malformed row or a document that
//! cannot be embedded is excluded and reported in the [`IngestReport`], while
//! source-level problems (a missing required column, unreadable input, model
//! failure) abort the run.
//!
//! The snapshot is built entirely off to the side; publishing it into a
//! [`SearchIndex`](crate::store::SearchIndex) is a single atomic swap done by
//! the caller once the build succeeds.

use std::io::Read;
use std::path::Path;

use thiserror::Error;
use tracing::{info, warn};

use crate::embedding::{EmbeddingError, EmbeddingProvider};
use crate::models::Document;
use crate::store::{IndexError, IndexSnapshot, SnapshotBuilder};

/// Columns every ingestion source must provide.
pub const REQUIRED_COLUMNS: [&str; 6] = ["title", "abstract", "authors", "journal", "year", "doi"];

/// Abstracts shorter than this are treated as content-free and skipped.
pub const MIN_ABSTRACT_LEN: usize = 50;

/// Errors that abort an ingestion run.
#[derive(Debug, Error)]
pub enum IngestionError {
    /// The source is missing a required column
    #[error("Missing required column '{0}'")]
    MissingColumn(String),

    /// The source could not be read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The source is not parseable as CSV
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The embedding model failed
    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    /// The snapshot could not be assembled
    #[error("Index error: {0}")]
    Index(#[from] IndexError),
}

/// Result type for ingestion operations.
pub type IngestionResult<T> = Result<T, IngestionError>;

/// A row or document excluded during ingestion, with the reason.
#[derive(Debug, Clone)]
pub struct Skipped {
    /// 1-based data row number in the source
    pub row: usize,

    /// Human-readable reason for the exclusion
    pub reason: String,
}

/// Summary of an ingestion run.
#[derive(Debug, Default)]
pub struct IngestReport {
    /// Data rows read from the source
    pub rows_read: usize,

    /// Documents that made it into the snapshot
    pub ingested: usize,

    /// Rows and documents excluded, with reasons
    pub skipped: Vec<Skipped>,
}

impl IngestReport {
    fn record_skip(&mut self, row: usize, reason: impl Into<String>) {
        let reason = reason.into();
        warn!(row, %reason, "row skipped");
        self.skipped.push(Skipped { row, reason });
    }
}

/// Parse documents from CSV data.
///
/// The header must contain every column in [`REQUIRED_COLUMNS`]; a
/// `keywords` column is optional. Malformed rows are skipped and recorded in
/// the report.
///
/// # Errors
/// Returns `IngestionError::MissingColumn` if a required column is absent,
/// or `IngestionError::Csv` if the input is not parseable CSV at all.
pub fn read_documents<R: Read>(input: R) -> IngestionResult<(Vec<Document>, IngestReport)> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(input);

    let headers = reader.headers()?.clone();
    let column = |name: &str| -> Option<usize> {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
    };

    let mut required = [0usize; REQUIRED_COLUMNS.len()];
    for (slot, name) in required.iter_mut().zip(REQUIRED_COLUMNS) {
        *slot = column(name).ok_or_else(|| IngestionError::MissingColumn(name.to_string()))?;
    }
    let [title_col, abstract_col, authors_col, journal_col, year_col, doi_col] = required;
    let keywords_col = column("keywords");

    let mut documents = Vec::new();
    let mut report = IngestReport::default();

    for (index, record) in reader.records().enumerate() {
        let row = index + 1;
        report.rows_read += 1;

        let record = match record {
            Ok(record) => record,
            Err(e) => {
                report.record_skip(row, format!("unparseable row: {}", e));
                continue;
            }
        };
        let field = |col: usize| record.get(col).unwrap_or("").trim();

        let title = collapse_whitespace(field(title_col));
        if title.is_empty() {
            report.record_skip(row, "empty title");
            continue;
        }

        let abstract_text = collapse_whitespace(field(abstract_col));
        if abstract_text.len() < MIN_ABSTRACT_LEN {
            report.record_skip(row, format!("abstract shorter than {} characters", MIN_ABSTRACT_LEN));
            continue;
        }

        let year: i32 = match field(year_col).parse() {
            Ok(year) => year,
            Err(_) => {
                report.record_skip(row, format!("unparseable year '{}'", field(year_col)));
                continue;
            }
        };

        let authors = split_list(field(authors_col), ';');
        let keywords = keywords_col
            .map(|col| split_list(field(col), ','))
            .unwrap_or_default();

        documents.push(Document {
            id: format!("paper_{}", index),
            title,
            abstract_text,
            authors,
            journal: field(journal_col).to_string(),
            year,
            doi: field(doi_col).to_string(),
            keywords,
        });
    }

    info!(
        rows = report.rows_read,
        parsed = documents.len(),
        skipped = report.skipped.len(),
        "source parsed"
    );
    Ok((documents, report))
}

/// Parse documents from a CSV file on disk.
pub fn read_documents_csv(path: &Path) -> IngestionResult<(Vec<Document>, IngestReport)> {
    let file = std::fs::File::open(path)?;
    read_documents(file)
}

/// Embed the documents and assemble them into a snapshot.
///
/// Documents are embedded in chunks of `chunk_size`; `on_progress` is called
/// with the cumulative count after each chunk. A document whose searchable
/// text is empty is excluded and reported; a model failure aborts the build.
pub async fn build_snapshot(
    provider: &dyn EmbeddingProvider,
    documents: Vec<Document>,
    chunk_size: usize,
    report: &mut IngestReport,
    mut on_progress: impl FnMut(usize),
) -> IngestionResult<IndexSnapshot> {
    let chunk_size = chunk_size.max(1);
    let mut builder = SnapshotBuilder::new(provider.dimension());
    let mut processed = 0;

    for chunk in documents.chunks(chunk_size) {
        // each embeddable document keeps its 1-based position so skips
        // reported later in the chunk still point at the right entry
        let mut embeddable = Vec::with_capacity(chunk.len());
        let mut texts = Vec::with_capacity(chunk.len());
        for (offset, document) in chunk.iter().enumerate() {
            let row = processed + offset + 1;
            let text = document.searchable_text();
            if text.trim().is_empty() {
                report.record_skip(row, "no embeddable text");
                continue;
            }
            embeddable.push((row, document));
            texts.push(text);
        }

        let text_refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let vectors = provider.embed_batch(&text_refs).await?;

        for ((row, document), vector) in embeddable.into_iter().zip(vectors) {
            match builder.push(document.clone(), vector) {
                Ok(()) => report.ingested += 1,
                Err(IndexError::DuplicateId(id)) => {
                    report.record_skip(row, format!("duplicate document id '{}'", id));
                }
                Err(e) => return Err(e.into()),
            }
        }

        processed += chunk.len();
        on_progress(processed);
    }

    info!(
        ingested = report.ingested,
        skipped = report.skipped.len(),
        dimension = provider.dimension(),
        "snapshot built"
    );
    Ok(builder.build())
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn split_list(text: &str, separator: char) -> Vec<String> {
    text.split(separator)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
