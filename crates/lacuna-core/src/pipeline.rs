//! Distant-closest pipeline: normalize → batched best-match search → rank.

use crate::normalize::normalize;
use crate::rank::{rank, RankError, Ranking};
use crate::search::{best_matches, SearchError, SearchOptions};
use crate::store::VectorStore;

/// Runs the full search on raw (unnormalized) pools and returns the `top_k` query items
/// whose closest reference match is farthest away. The input pools are not modified.
pub fn find_distant_closest(
    query: &VectorStore,
    reference: &VectorStore,
    options: &SearchOptions,
    top_k: usize,
) -> Result<Ranking, PipelineError> {
    if top_k == 0 {
        return Err(RankError::InvalidTopK(top_k).into());
    }
    tracing::info!(
        queries = query.len(),
        references = reference.len(),
        dim = reference.dim(),
        top_k,
        "finding distant-closest items"
    );
    let query = normalize(query);
    let reference = normalize(reference);
    let matches = best_matches(&query, &reference, options)?;
    Ok(rank(matches, top_k)?)
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PipelineError {
    #[error("search error: {0}")]
    Search(#[from] SearchError),
    #[error("ranking error: {0}")]
    Rank(#[from] RankError),
}
