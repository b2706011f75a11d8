//! Result export.
//!
//! Serializes a ranked result list to CSV for downstream tooling. This is a
//! thin wrapper over the search engine's output contract; it performs no
//! filtering or reordering of its own.

use std::io::Write;

use crate::models::SearchResult;

/// Column order of the exported CSV.
pub const EXPORT_COLUMNS: [&str; 7] = [
    "title",
    "authors",
    "journal",
    "year",
    "doi",
    "similarity_score",
    "rank",
];

/// Write a result list as CSV, preserving the given ranking order.
pub fn write_results_csv<W: Write>(writer: W, results: &[SearchResult]) -> csv::Result<()> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(EXPORT_COLUMNS)?;
    for result in results {
        out.write_record([
            result.document.title.as_str(),
            &result.document.authors.join("; "),
            result.document.journal.as_str(),
            &result.document.year.to_string(),
            result.document.doi.as_str(),
            &format!("{:.6}", result.score),
            &result.rank.to_string(),
        ])?;
    }
    out.flush()?;
    Ok(())
}
