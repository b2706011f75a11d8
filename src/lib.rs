//! MedScope Search - a semantic search engine for medical research papers.
//!
//! This library finds papers matching a natural-language query by meaning
//! rather than keyword overlap: documents and queries are encoded into
//! fixed-dimension vectors, stored as an immutable corpus snapshot, and
//! ranked by cosine similarity under filters with deterministic ordering.
//!
//! # Architecture
//!
//! - **models**: core data structures (Document, YearRange, SearchResult)
//! - **embedding**: text embedding generation and normalization
//! - **query**: query text normalization and abbreviation expansion
//! - **store**: the document vector store with atomic snapshot publication
//! - **search**: similarity computation plus the filter and rank pipeline
//! - **ingest**: offline CSV ingestion and snapshot building
//! - **export**: result list serialization
//!
//! # Workflow
//!
//! ## Offline ingestion
//!
//! 1. Parse paper metadata from CSV
//! 2. Embed each paper's searchable text in batches
//! 3. Persist documents and vectors as an aligned snapshot
//!
//! ## Online search
//!
//! 1. Normalize the query (whitespace, case, medical abbreviations)
//! 2. Embed the normalized text
//! 3. Score every corpus vector with one matrix-vector product
//! 4. Filter, rank, and truncate to the top-k results
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use medscope_search::{
//!     embedding::fastembed::FastEmbedProvider,
//!     search::{SearchEngine, SearchRequest},
//!     store::SearchIndex,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let provider = Arc::new(FastEmbedProvider::with_defaults()?);
//!     let index = Arc::new(SearchIndex::new(provider.dimension()));
//!     index.load_dir("index".as_ref(), provider.dimension())?;
//!
//!     let engine = SearchEngine::new(provider, index);
//!     let request = SearchRequest::new("latest RCTs on knee osteoarthritis physiotherapy")
//!         .with_limit(10);
//!     for result in engine.search(&request).await? {
//!         println!("{}. {} ({:.3})", result.rank, result.document.title, result.score);
//!     }
//!     Ok(())
//! }
//! ```

pub mod embedding;
pub mod export;
pub mod ingest;
pub mod models;
pub mod query;
pub mod search;
pub mod store;

pub use embedding::EmbeddingProvider;
pub use models::{Document, SearchResult, YearRange};
pub use query::AbbreviationDict;
pub use search::{SearchEngine, SearchRequest};
pub use store::{IndexSnapshot, SearchIndex, SnapshotBuilder};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default embedding dimension (AllMiniLML6V2).
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 384;
