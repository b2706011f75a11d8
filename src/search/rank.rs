//! Filter and rank pipeline.
//!
//! Candidates arrive as `(row, score)` pairs over a snapshot. The pipeline
//! applies the filter predicates as an ordered chain (each predicate only
//! ever shrinks the candidate set), sorts by exact score under a total order,
//! resolves runs of near-tied scores with the year and identifier keys,
//! truncates to the requested limit, and assigns dense 1-based ranks. The
//! pipeline is stateless per call.

use std::cmp::Ordering;

use crate::models::{Document, SearchResult, YearRange};
use crate::store::IndexSnapshot;

/// Scores closer than this are treated as tied for ranking purposes.
pub const SCORE_EPSILON: f32 = 1e-9;

/// Filter specification applied before ranking.
#[derive(Debug, Clone, Copy)]
pub struct FilterSpec {
    /// Inclusive publication year range, if any
    pub year_range: Option<YearRange>,

    /// Minimum similarity score; candidates scoring below are dropped.
    /// The bound is inclusive: a score exactly at the threshold survives.
    pub min_score: f32,

    /// Maximum number of results to return
    pub limit: usize,
}

/// Tie-break keys for scores treated as equal: publication year descending,
/// then identifier ascending.
fn tie_break(doc_a: &Document, doc_b: &Document) -> Ordering {
    doc_b
        .year
        .cmp(&doc_a.year)
        .then_with(|| doc_a.id.cmp(&doc_b.id))
}

/// Filter, order, and truncate scored candidates into a result list.
///
/// `scores[i]` is the similarity of snapshot row `i` to the query.
///
/// Ordering is a two-pass process. The primary sort uses the exact scores
/// under `f32::total_cmp`, which keeps the comparator a total order (an
/// epsilon-window comparator is not transitive and breaks the sort
/// contract). A second pass then finds maximal runs of adjacent scores no
/// further than [`SCORE_EPSILON`] apart and reorders each run by the
/// tie-break keys.
pub fn rank(snapshot: &IndexSnapshot, scores: &[f32], filters: &FilterSpec) -> Vec<SearchResult> {
    debug_assert_eq!(scores.len(), snapshot.len());

    let mut candidates: Vec<(usize, f32)> = scores
        .iter()
        .copied()
        .enumerate()
        .collect();

    // predicate chain: each step only removes candidates
    if let Some(range) = filters.year_range {
        candidates.retain(|&(row, _)| range.contains(snapshot.documents()[row].year));
    }
    candidates.retain(|&(_, score)| score >= filters.min_score);

    candidates.sort_by(|&(row_a, score_a), &(row_b, score_b)| {
        score_b
            .total_cmp(&score_a)
            .then_with(|| tie_break(&snapshot.documents()[row_a], &snapshot.documents()[row_b]))
    });

    // resolve near-tied runs: scores are descending, so adjacent differences
    // are non-negative and a run is a maximal chain within the epsilon
    let mut start = 0;
    while start < candidates.len() {
        let mut end = start + 1;
        while end < candidates.len() && candidates[end - 1].1 - candidates[end].1 <= SCORE_EPSILON {
            end += 1;
        }
        if end - start > 1 {
            candidates[start..end].sort_by(|&(row_a, _), &(row_b, _)| {
                tie_break(&snapshot.documents()[row_a], &snapshot.documents()[row_b])
            });
        }
        start = end;
    }

    candidates.truncate(filters.limit);

    candidates
        .into_iter()
        .enumerate()
        .map(|(position, (row, score))| SearchResult {
            document: snapshot.documents()[row].clone(),
            score,
            rank: position + 1,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::document;
    use crate::store::SnapshotBuilder;

    fn snapshot_with_scores(entries: &[(&str, i32, f32)]) -> (IndexSnapshot, Vec<f32>) {
        // vectors are irrelevant here; the pipeline only consumes the scores
        let mut builder = SnapshotBuilder::new(1);
        let mut scores = Vec::new();
        for &(id, year, score) in entries {
            builder
                .push(document(id, &format!("Paper {}", id), year), vec![1.0])
                .unwrap();
            scores.push(score);
        }
        (builder.build(), scores)
    }

    fn spec(limit: usize) -> FilterSpec {
        FilterSpec {
            year_range: None,
            min_score: 0.0,
            limit,
        }
    }

    #[test]
    fn orders_by_score_descending() {
        let (snap, scores) = snapshot_with_scores(&[
            ("a", 2020, 0.3),
            ("b", 2020, 0.9),
            ("c", 2020, 0.6),
        ]);
        let results = rank(&snap, &scores, &spec(10));
        let ids: Vec<&str> = results.iter().map(|r| r.document.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
    }

    #[test]
    fn ties_break_by_year_desc_then_id_asc() {
        let (snap, scores) = snapshot_with_scores(&[
            ("c", 2022, 0.8),
            ("b", 2020, 0.8),
            ("a", 2022, 0.8),
        ]);
        let results = rank(&snap, &scores, &spec(10));
        let ids: Vec<&str> = results.iter().map(|r| r.document.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c", "b"]);
    }

    #[test]
    fn ranks_are_dense_and_one_based() {
        let (snap, scores) = snapshot_with_scores(&[
            ("a", 2020, 0.5),
            ("b", 2021, 0.7),
            ("c", 2022, 0.2),
        ]);
        let results = rank(&snap, &scores, &spec(10));
        let ranks: Vec<usize> = results.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
    }

    #[test]
    fn truncates_to_limit() {
        let (snap, scores) = snapshot_with_scores(&[
            ("a", 2020, 0.5),
            ("b", 2021, 0.7),
            ("c", 2022, 0.2),
            ("d", 2023, 0.9),
        ]);
        let results = rank(&snap, &scores, &spec(2));
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].document.id, "d");
        assert_eq!(results[1].document.id, "b");
    }

    #[test]
    fn limit_zero_yields_empty_list() {
        let (snap, scores) = snapshot_with_scores(&[("a", 2020, 0.9)]);
        assert!(rank(&snap, &scores, &spec(0)).is_empty());
    }

    #[test]
    fn year_filter_removes_out_of_range_candidates() {
        let (snap, scores) = snapshot_with_scores(&[
            ("a", 2015, 0.9),
            ("b", 2020, 0.8),
            ("c", 2021, 0.7),
            ("d", 2025, 0.6),
        ]);
        let filters = FilterSpec {
            year_range: Some(YearRange::new(2020, 2021)),
            min_score: 0.0,
            limit: 10,
        };
        let results = rank(&snap, &scores, &filters);
        assert_eq!(results.len(), 2);
        for result in &results {
            assert!((2020..=2021).contains(&result.document.year));
        }
    }

    #[test]
    fn threshold_is_inclusive() {
        let (snap, scores) = snapshot_with_scores(&[
            ("a", 2020, 0.5),
            ("b", 2020, 0.49),
        ]);
        let filters = FilterSpec {
            year_range: None,
            min_score: 0.5,
            limit: 10,
        };
        let results = rank(&snap, &scores, &filters);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document.id, "a");
    }

    #[test]
    fn unreachable_threshold_yields_empty_list() {
        let (snap, scores) = snapshot_with_scores(&[
            ("a", 2020, 0.4),
            ("b", 2021, 0.6),
        ]);
        let filters = FilterSpec {
            year_range: None,
            min_score: 0.9,
            limit: 10,
        };
        assert!(rank(&snap, &scores, &filters).is_empty());
    }

    #[test]
    fn filters_compose_as_logical_and() {
        let (snap, scores) = snapshot_with_scores(&[
            ("a", 2015, 0.9), // fails year
            ("b", 2021, 0.1), // fails threshold
            ("c", 2021, 0.9), // passes both
        ]);
        let filters = FilterSpec {
            year_range: Some(YearRange::new(2020, 2022)),
            min_score: 0.5,
            limit: 10,
        };
        let results = rank(&snap, &scores, &filters);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document.id, "c");
    }

    #[test]
    fn scores_within_epsilon_are_tied() {
        let (snap, mut scores) = snapshot_with_scores(&[
            ("b", 2019, 0.0),
            ("a", 2023, 0.0),
        ]);
        // distinct f32 values whose difference sits inside the tie window
        scores[0] = 4e-10;
        scores[1] = 0.0;
        assert_ne!(scores[0], scores[1]);
        let results = rank(&snap, &scores, &spec(10));
        // tied within epsilon, so the newer paper wins despite the hair of score
        assert_eq!(results[0].document.id, "a");
        assert_eq!(results[1].document.id, "b");
    }

    #[test]
    fn chained_near_ties_resolve_by_year_then_id() {
        // a-b and b-c are each within epsilon while a-c is not; the chain
        // forms one run and the tie-break keys order the whole run
        let (snap, mut scores) = snapshot_with_scores(&[
            ("a", 2019, 0.0),
            ("b", 2021, 0.0),
            ("c", 2023, 0.0),
        ]);
        scores[0] = 1.6e-9;
        scores[1] = 8e-10;
        scores[2] = 0.0;
        let results = rank(&snap, &scores, &spec(10));
        let ids: Vec<&str> = results.iter().map(|r| r.document.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
    }

    #[test]
    fn dense_near_zero_scores_sort_without_panicking() {
        let mut builder = SnapshotBuilder::new(1);
        let mut scores = Vec::new();
        for i in 0..64 {
            let id = format!("p{:02}", i);
            builder
                .push(document(&id, &format!("Paper {}", id), 2000 + (i % 7)), vec![1.0])
                .unwrap();
            scores.push((i % 5) as f32 * 4e-10);
        }
        let snap = builder.build();

        let results = rank(&snap, &scores, &spec(64));
        assert_eq!(results.len(), 64);
        let ranks: Vec<usize> = results.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, (1..=64).collect::<Vec<_>>());
    }
}
