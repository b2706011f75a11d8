//! Core data models for the MedScope search system.
//!
//! This module contains the fundamental data structures used across the
//! application: document metadata, year range filters, and search results.

use serde::{Deserialize, Serialize};

/// Core metadata for a medical research paper.
///
/// A document carries everything needed to display and filter a search hit.
/// It does not carry its embedding vector: vectors live in the index snapshot
/// matrix, paired with the document by row position. A document is immutable
/// once embedded; reprocessing the corpus replaces the whole snapshot rather
/// than patching individual records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Stable, unique identifier within the corpus
    pub id: String,

    /// Paper title
    pub title: String,

    /// Abstract text
    pub abstract_text: String,

    /// Author names
    pub authors: Vec<String>,

    /// Journal name
    pub journal: String,

    /// Year of publication (used for filtering and tie-breaking)
    pub year: i32,

    /// Digital Object Identifier, if known
    pub doi: String,

    /// Keyword list (may be empty)
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl Document {
    /// Combine title, abstract, and keywords into the text fed to the encoder.
    ///
    /// The section labels give the encoder the same structured context at
    /// ingestion time and at query time, which keeps similarity scores
    /// comparable across the corpus.
    pub fn searchable_text(&self) -> String {
        let mut parts = Vec::with_capacity(3);
        if !self.title.is_empty() {
            parts.push(format!("Title: {}", self.title));
        }
        if !self.abstract_text.is_empty() {
            parts.push(format!("Abstract: {}", self.abstract_text));
        }
        if !self.keywords.is_empty() {
            parts.push(format!("Keywords: {}", self.keywords.join(", ")));
        }
        parts.join(" ")
    }
}

/// Inclusive publication year range filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    /// Start year (inclusive)
    pub start: i32,

    /// End year (inclusive)
    pub end: i32,
}

impl YearRange {
    /// Create a new year range.
    pub fn new(start: i32, end: i32) -> Self {
        Self { start, end }
    }

    /// Check whether a year falls within this range.
    pub fn contains(&self, year: i32) -> bool {
        year >= self.start && year <= self.end
    }
}

/// A single search result: the matched document plus ranking information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// The matched document
    pub document: Document,

    /// Cosine similarity to the query, in `[-1.0, 1.0]`
    pub score: f32,

    /// 1-based dense rank within the result list
    pub rank: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_document() -> Document {
        Document {
            id: "paper_0".to_string(),
            title: "Physical Therapy in Knee Osteoarthritis".to_string(),
            abstract_text: "A randomized controlled trial of exercise therapy.".to_string(),
            authors: vec!["Smith, J.".to_string()],
            journal: "Journal of Orthopedic Physical Therapy".to_string(),
            year: 2024,
            doi: "10.1000/jopt.2024.001".to_string(),
            keywords: vec!["knee osteoarthritis".to_string(), "physiotherapy".to_string()],
        }
    }

    #[test]
    fn searchable_text_combines_labeled_sections() {
        let text = sample_document().searchable_text();
        assert!(text.starts_with("Title: Physical Therapy"));
        assert!(text.contains("Abstract: A randomized controlled trial"));
        assert!(text.ends_with("Keywords: knee osteoarthritis, physiotherapy"));
    }

    #[test]
    fn searchable_text_skips_empty_sections() {
        let mut doc = sample_document();
        doc.keywords.clear();
        let text = doc.searchable_text();
        assert!(!text.contains("Keywords:"));
    }

    #[test]
    fn year_range_is_inclusive_on_both_ends() {
        let range = YearRange::new(2020, 2023);
        assert!(range.contains(2020));
        assert!(range.contains(2022));
        assert!(range.contains(2023));
        assert!(!range.contains(2019));
        assert!(!range.contains(2024));
    }
}
