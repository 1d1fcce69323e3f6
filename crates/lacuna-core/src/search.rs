//! Batched nearest-neighbor search over two normalized pools.
//!
//! For every query row we want the reference row with the largest dot product. The full
//! N×M similarity matrix is never built: the reference pool is walked in contiguous chunks
//! of at most `chunk_size` rows, and the query pool in batches of at most `query_batch_size`
//! rows, so the live similarity block is bounded by `query_batch_size × chunk_size`.
//!
//! Ties resolve to the earliest reference row: within a chunk the first maximal column wins,
//! and a later chunk only replaces the running best on a strictly higher score. Parallel mode
//! hands whole query batches to workers; each worker owns its rows and still walks the
//! reference chunks in order, so results match the sequential path exactly.

use std::ops::Range;
use std::time::Instant;

use ndarray::{ArrayView1, ArrayView2, Axis};
use rayon::prelude::*;
use serde::Serialize;

use crate::store::VectorStore;

/// Reference rows per similarity block.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;
/// Query rows per similarity block.
pub const DEFAULT_QUERY_BATCH_SIZE: usize = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    pub chunk_size: usize,
    pub query_batch_size: usize,
    /// Distribute query batches across the rayon thread pool.
    pub parallel: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            query_batch_size: DEFAULT_QUERY_BATCH_SIZE,
            parallel: false,
        }
    }
}

/// Best reference match for one query item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchRecord {
    pub query_id: String,
    pub matched_id: String,
    /// Cosine similarity of the pair.
    pub similarity: f32,
}

impl MatchRecord {
    /// Cosine distance, `1 - similarity`.
    pub fn distance(&self) -> f32 {
        1.0 - self.similarity
    }
}

/// Largest chunk size whose similarity block plus chunk rows fit in `budget_bytes`
/// (`4 * C * (query_rows + dim) <= budget`). Never less than 1.
pub fn chunk_size_for_budget(query_rows: usize, dim: usize, budget_bytes: usize) -> usize {
    let per_reference_row = std::mem::size_of::<f32>() * (query_rows + dim);
    if per_reference_row == 0 {
        return DEFAULT_CHUNK_SIZE;
    }
    (budget_bytes / per_reference_row).max(1)
}

/// Finds, for every row of `query`, the row of `reference` with the highest dot product.
/// Both pools are expected to be normalized already. Records come back in query order.
pub fn best_matches(
    query: &VectorStore,
    reference: &VectorStore,
    options: &SearchOptions,
) -> Result<Vec<MatchRecord>, SearchError> {
    if options.chunk_size == 0 {
        return Err(SearchError::InvalidChunkSize(options.chunk_size));
    }
    if options.query_batch_size == 0 {
        return Err(SearchError::InvalidQueryBatchSize(options.query_batch_size));
    }
    if query.is_empty() {
        return Ok(Vec::new());
    }
    if reference.is_empty() {
        return Err(SearchError::NoReferenceVectors);
    }
    if query.dim() != reference.dim() {
        return Err(SearchError::DimensionMismatch {
            query: query.dim(),
            reference: reference.dim(),
        });
    }

    let started = Instant::now();
    let batches = split_rows(query.len(), options.query_batch_size);
    let scan = |rows: Range<usize>| {
        tracing::debug!(start = rows.start, end = rows.end, "scanning query batch");
        scan_batch(query.rows(rows), reference, options.chunk_size)
    };
    let best: Vec<Best> = if options.parallel {
        batches
            .into_par_iter()
            .map(scan)
            .collect::<Vec<_>>()
            .into_iter()
            .flatten()
            .collect()
    } else {
        batches.into_iter().flat_map(scan).collect()
    };

    let records = best
        .into_iter()
        .enumerate()
        .map(|(i, b)| match b.index {
            Some(j) => Ok(MatchRecord {
                query_id: query.id(i).to_string(),
                matched_id: reference.id(j).to_string(),
                similarity: b.similarity,
            }),
            None => Err(SearchError::NoComparableMatch(query.id(i).to_string())),
        })
        .collect::<Result<Vec<_>, _>>()?;

    tracing::info!(
        queries = query.len(),
        references = reference.len(),
        chunk_size = options.chunk_size,
        parallel = options.parallel,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "best matches computed"
    );
    Ok(records)
}

#[derive(Debug, Clone, Copy)]
struct Best {
    index: Option<usize>,
    similarity: f32,
}

impl Best {
    const NONE: Best = Best {
        index: None,
        similarity: f32::NEG_INFINITY,
    };
}

fn split_rows(len: usize, size: usize) -> Vec<Range<usize>> {
    (0..len)
        .step_by(size)
        .map(|start| start..start.saturating_add(size).min(len))
        .collect()
}

/// Running best per query row across all reference chunks, in chunk order.
fn scan_batch(block: ArrayView2<'_, f32>, reference: &VectorStore, chunk_size: usize) -> Vec<Best> {
    let mut best = vec![Best::NONE; block.nrows()];
    for (chunk_index, chunk) in split_rows(reference.len(), chunk_size).into_iter().enumerate() {
        let offset = chunk.start;
        let sims = block.dot(&reference.rows(chunk).t());
        for (row, current) in sims.axis_iter(Axis(0)).zip(best.iter_mut()) {
            if let Some((col, similarity)) = first_max(row) {
                if similarity > current.similarity {
                    *current = Best {
                        index: Some(offset + col),
                        similarity,
                    };
                }
            }
        }
        tracing::trace!(chunk_index, offset, "chunk scanned");
    }
    best
}

/// Column and value of the first maximal entry. NaN entries never win.
fn first_max(row: ArrayView1<'_, f32>) -> Option<(usize, f32)> {
    let mut found: Option<(usize, f32)> = None;
    for (col, &value) in row.iter().enumerate() {
        if value.is_nan() {
            continue;
        }
        match found {
            Some((_, top)) if value <= top => {}
            _ => found = Some((col, value)),
        }
    }
    found
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SearchError {
    #[error("reference pool is empty")]
    NoReferenceVectors,
    #[error("chunk size must be at least 1, got {0}")]
    InvalidChunkSize(usize),
    #[error("query batch size must be at least 1, got {0}")]
    InvalidQueryBatchSize(usize),
    #[error("query dimension {query} does not match reference dimension {reference}")]
    DimensionMismatch { query: usize, reference: usize },
    #[error("no comparable reference vector for {0:?}")]
    NoComparableMatch(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;

    fn store(pairs: &[(&str, &[f32])]) -> VectorStore {
        VectorStore::from_pairs(pairs.iter().map(|(id, v)| (id.to_string(), v.to_vec()))).unwrap()
    }

    fn opts(chunk_size: usize) -> SearchOptions {
        SearchOptions {
            chunk_size,
            ..SearchOptions::default()
        }
    }

    /// Deterministic pseudo-random pool (LCG) so tests need no extra crates.
    fn synthetic(prefix: &str, n: usize, dim: usize, seed: u64) -> VectorStore {
        let mut state = seed;
        let mut next = move || {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            ((state >> 33) as f32 / (1u64 << 31) as f32) * 2.0 - 1.0
        };
        VectorStore::from_pairs(
            (0..n).map(|i| (format!("{prefix}{i}"), (0..dim).map(|_| next()).collect::<Vec<f32>>())),
        )
        .unwrap()
    }

    #[test]
    fn worked_example() {
        let q = normalize(&store(&[("a", &[1.0, 0.0]), ("b", &[0.0, 1.0])]));
        let r = normalize(&store(&[("x", &[1.0, 0.0]), ("y", &[0.6, 0.8])]));
        let m = best_matches(&q, &r, &SearchOptions::default()).unwrap();
        assert_eq!(m.len(), 2);
        assert_eq!(m[0].query_id, "a");
        assert_eq!(m[0].matched_id, "x");
        assert!((m[0].similarity - 1.0).abs() < 1e-6);
        assert!(m[0].distance().abs() < 1e-6);
        assert_eq!(m[1].matched_id, "y");
        assert!((m[1].similarity - 0.8).abs() < 1e-6);
        assert!((m[1].distance() - 0.2).abs() < 1e-6);
    }

    #[test]
    fn chunking_does_not_change_results() {
        let q = normalize(&synthetic("q", 23, 16, 7));
        let r = normalize(&synthetic("r", 57, 16, 11));
        let full = best_matches(&q, &r, &opts(r.len())).unwrap();
        for c in 1..=r.len() {
            let chunked = best_matches(&q, &r, &opts(c)).unwrap();
            assert_eq!(chunked.len(), full.len());
            for (a, b) in chunked.iter().zip(&full) {
                assert_eq!(a.matched_id, b.matched_id, "chunk size {c}");
                assert!((a.similarity - b.similarity).abs() < 1e-6, "chunk size {c}");
            }
        }
        let oversized = best_matches(&q, &r, &opts(r.len() * 4)).unwrap();
        assert_eq!(oversized, full);
    }

    #[test]
    fn query_batching_and_parallel_match_sequential() {
        let q = normalize(&synthetic("q", 41, 8, 3));
        let r = normalize(&synthetic("r", 30, 8, 5));
        let baseline = best_matches(&q, &r, &opts(7)).unwrap();
        for batch in [1, 4, 40, 41, 100] {
            let sequential = SearchOptions {
                chunk_size: 7,
                query_batch_size: batch,
                parallel: false,
            };
            let parallel = SearchOptions {
                parallel: true,
                ..sequential
            };
            let seq = best_matches(&q, &r, &sequential).unwrap();
            assert_eq!(best_matches(&q, &r, &parallel).unwrap(), seq, "batch {batch}");
            for (a, b) in seq.iter().zip(&baseline) {
                assert_eq!(a.query_id, b.query_id);
                assert_eq!(a.matched_id, b.matched_id, "batch {batch}");
                assert!((a.similarity - b.similarity).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn ties_go_to_first_reference_row() {
        let q = normalize(&store(&[("q", &[1.0, 0.0])]));
        let r = normalize(&store(&[
            ("low", &[0.0, 1.0]),
            ("first", &[2.0, 0.0]),
            ("second", &[5.0, 0.0]),
            ("third", &[1.0, 0.0]),
        ]));
        for c in 1..=r.len() {
            let m = best_matches(&q, &r, &opts(c)).unwrap();
            assert_eq!(m[0].matched_id, "first", "chunk size {c}");
        }
    }

    #[test]
    fn zero_query_vector_scores_zero() {
        let q = normalize(&store(&[("z", &[0.0, 0.0, 0.0])]));
        let r = normalize(&store(&[("x", &[1.0, 0.0, 0.0]), ("y", &[0.0, 1.0, 0.0])]));
        let m = best_matches(&q, &r, &opts(1)).unwrap();
        assert_eq!(m[0].similarity, 0.0);
        assert_eq!(m[0].matched_id, "x");
        assert!(m[0].distance().is_finite());
    }

    #[test]
    fn negative_similarities_still_pick_a_match() {
        let q = normalize(&store(&[("q", &[1.0, 0.0])]));
        let r = normalize(&store(&[("opposite", &[-1.0, 0.0]), ("tilted", &[-1.0, 1.0])]));
        let m = best_matches(&q, &r, &opts(1)).unwrap();
        assert_eq!(m[0].matched_id, "tilted");
        assert!(m[0].similarity < 0.0);
    }

    #[test]
    fn empty_reference_fails() {
        let q = normalize(&store(&[("a", &[1.0, 0.0])]));
        let err = best_matches(&q, &VectorStore::empty(2), &SearchOptions::default()).unwrap_err();
        assert_eq!(err, SearchError::NoReferenceVectors);
    }

    #[test]
    fn empty_query_returns_nothing() {
        let r = normalize(&store(&[("x", &[1.0, 0.0])]));
        assert!(best_matches(&VectorStore::empty(2), &r, &SearchOptions::default())
            .unwrap()
            .is_empty());
        assert!(best_matches(&VectorStore::empty(2), &VectorStore::empty(2), &SearchOptions::default())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn rejects_bad_options_and_dimensions() {
        let q = store(&[("a", &[1.0, 0.0])]);
        let r = store(&[("x", &[1.0, 0.0, 0.0])]);
        assert_eq!(
            best_matches(&q, &q, &opts(0)).unwrap_err(),
            SearchError::InvalidChunkSize(0)
        );
        let o = SearchOptions {
            query_batch_size: 0,
            ..SearchOptions::default()
        };
        assert_eq!(best_matches(&q, &q, &o).unwrap_err(), SearchError::InvalidQueryBatchSize(0));
        assert_eq!(
            best_matches(&q, &r, &SearchOptions::default()).unwrap_err(),
            SearchError::DimensionMismatch { query: 2, reference: 3 }
        );
    }

    #[test]
    fn budget_sizing() {
        assert_eq!(chunk_size_for_budget(100, 300, 4 * 400 * 10), 10);
        assert_eq!(chunk_size_for_budget(100, 300, 1), 1);
        assert_eq!(chunk_size_for_budget(0, 0, 1024), DEFAULT_CHUNK_SIZE);
    }

    #[test]
    fn first_max_prefers_earliest() {
        let row = ndarray::array![0.1_f32, 0.9, f32::NAN, 0.9];
        assert_eq!(first_max(row.view()), Some((1, 0.9)));
        let empty = ndarray::Array1::<f32>::zeros(0);
        assert_eq!(first_max(empty.view()), None);
    }
}
