//! Search execution.
//!
//! The [`SearchEngine`] ties the query processor, the embedding provider,
//! and the vector store together: it validates the request, normalizes and
//! embeds the query text, computes every candidate similarity in a single
//! matrix-vector product, and hands the scored candidates to the filter and
//! rank pipeline. Search is exhaustive over the snapshot; with normalized
//! vectors one `[N, D] . [D]` product covers the whole corpus.
//!
//! The engine holds only shared read-only resources (the model and the index
//! handle), so any number of searches may run concurrently.

pub mod rank;

use std::sync::Arc;
use std::time::{Duration, Instant};

use ndarray::ArrayView1;
use thiserror::Error;
use tracing::debug;

use crate::embedding::{EmbeddingError, EmbeddingProvider};
use crate::models::{SearchResult, YearRange};
use crate::query::{self, AbbreviationDict};
use crate::store::SearchIndex;

pub use rank::{FilterSpec, SCORE_EPSILON};

/// Default number of results returned when the caller does not specify k.
pub const DEFAULT_LIMIT: usize = 10;

/// Errors that can occur during query processing.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Year range lower bound exceeds the upper bound
    #[error("Invalid year range: start {start} is after end {end}")]
    InvalidYearRange {
        /// Requested start year
        start: i32,
        /// Requested end year
        end: i32,
    },

    /// Similarity threshold is not a finite number
    #[error("Invalid similarity threshold: {0}")]
    InvalidThreshold(f32),

    /// The query text could not be embedded
    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    /// Query vector dimension disagrees with the index
    #[error("Query vector has dimension {actual} but the index holds dimension {expected}")]
    Dimension {
        /// Index dimension
        expected: usize,
        /// Query vector dimension
        actual: usize,
    },

    /// The search did not complete within the caller-supplied deadline
    #[error("Search timed out after {0:?}")]
    Timeout(Duration),

    /// The scoring task panicked or was cancelled
    #[error("Scoring task failed: {0}")]
    Scoring(#[from] tokio::task::JoinError),
}

/// Result type for query operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// Parameters of one search call.
///
/// A request is created per search and discarded afterwards; it carries no
/// persistent identity.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    /// Raw query text
    pub query: String,

    /// Optional inclusive publication year range
    pub year_range: Option<YearRange>,

    /// Minimum similarity score, inclusive (default 0.0)
    pub min_score: f32,

    /// Maximum number of results (default [`DEFAULT_LIMIT`])
    pub limit: usize,
}

impl SearchRequest {
    /// Create a request with default filters.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            year_range: None,
            min_score: 0.0,
            limit: DEFAULT_LIMIT,
        }
    }

    /// Restrict results to an inclusive publication year range.
    pub fn with_year_range(mut self, start: i32, end: i32) -> Self {
        self.year_range = Some(YearRange::new(start, end));
        self
    }

    /// Set the minimum similarity threshold.
    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = min_score;
        self
    }

    /// Set the result limit k.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Check the filter specification for contradictions.
    fn validate(&self) -> QueryResult<()> {
        if let Some(range) = self.year_range {
            if range.start > range.end {
                return Err(QueryError::InvalidYearRange {
                    start: range.start,
                    end: range.end,
                });
            }
        }
        if !self.min_score.is_finite() {
            return Err(QueryError::InvalidThreshold(self.min_score));
        }
        Ok(())
    }

    fn filter_spec(&self) -> FilterSpec {
        FilterSpec {
            year_range: self.year_range,
            min_score: self.min_score,
            limit: self.limit,
        }
    }
}

/// Semantic search engine over a published corpus snapshot.
pub struct SearchEngine {
    provider: Arc<dyn EmbeddingProvider>,
    index: Arc<SearchIndex>,
    dictionary: AbbreviationDict,
}

impl SearchEngine {
    /// Create an engine with the default medical abbreviation dictionary.
    pub fn new(provider: Arc<dyn EmbeddingProvider>, index: Arc<SearchIndex>) -> Self {
        Self::with_dictionary(provider, index, AbbreviationDict::medical())
    }

    /// Create an engine with a caller-supplied abbreviation dictionary.
    pub fn with_dictionary(
        provider: Arc<dyn EmbeddingProvider>,
        index: Arc<SearchIndex>,
        dictionary: AbbreviationDict,
    ) -> Self {
        Self {
            provider,
            index,
            dictionary,
        }
    }

    /// Execute a search and return the ranked result list.
    ///
    /// # Errors
    /// Returns `QueryError` for an invalid filter specification, an
    /// un-embeddable query, or a dimension disagreement with the index.
    /// Filter combinations that simply match nothing yield an empty list,
    /// not an error.
    pub async fn search(&self, request: &SearchRequest) -> QueryResult<Vec<SearchResult>> {
        request.validate()?;

        let normalized = query::normalize(&request.query, &self.dictionary);
        debug!(raw = %request.query, normalized = %normalized, "query normalized");

        let query_vector = self.provider.embed(&normalized).await?;

        let snapshot = self.index.snapshot();
        if snapshot.is_empty() {
            return Ok(Vec::new());
        }
        if query_vector.len() != snapshot.dimension() {
            return Err(QueryError::Dimension {
                expected: snapshot.dimension(),
                actual: query_vector.len(),
            });
        }

        // one matrix-vector product scores the whole corpus; vectors are
        // unit-normalized, so the dot product is the cosine similarity.
        // Scoring and ranking run on the blocking pool so the async caller
        // keeps an await point over the latency-bearing step and a deadline
        // wrapper can fire while a large corpus is being scored.
        let candidates = snapshot.len();
        let filters = request.filter_spec();
        let results = tokio::task::spawn_blocking(move || {
            let query_view = ArrayView1::from(query_vector.as_slice());
            let scores = snapshot.vectors().dot(&query_view);
            let scores = scores.as_slice().expect("dot product output is contiguous");
            rank::rank(&snapshot, scores, &filters)
        })
        .await?;

        debug!(candidates, returned = results.len(), "search complete");
        Ok(results)
    }

    /// Execute a search with a caller-supplied deadline.
    ///
    /// The deadline covers the encoder call and the similarity computation.
    /// On expiry the call fails with `QueryError::Timeout` rather than
    /// returning a partially ranked or late list; a result that arrives
    /// after the deadline has already passed is discarded as well.
    pub async fn search_with_timeout(
        &self,
        request: &SearchRequest,
        deadline: Duration,
    ) -> QueryResult<Vec<SearchResult>> {
        let started = Instant::now();
        match tokio::time::timeout(deadline, self.search(request)).await {
            Ok(result) => {
                if started.elapsed() > deadline {
                    return Err(QueryError::Timeout(deadline));
                }
                result
            }
            Err(_) => Err(QueryError::Timeout(deadline)),
        }
    }
}

impl std::fmt::Debug for SearchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchEngine")
            .field("model", &self.provider.model_name())
            .field("index", &self.index)
            .field("abbreviations", &self.dictionary.len())
            .finish()
    }
}
