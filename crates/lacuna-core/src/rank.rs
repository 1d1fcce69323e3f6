//! Distant-closest ranking: query items ordered by how weak even their best match is.

use crate::search::MatchRecord;

/// The `requested` lowest-similarity records, ascending by similarity.
#[derive(Debug, Clone, PartialEq)]
pub struct Ranking {
    pub records: Vec<MatchRecord>,
    /// The K that was asked for.
    pub requested: usize,
}

impl Ranking {
    /// True when fewer records were available than requested.
    pub fn is_partial(&self) -> bool {
        self.records.len() < self.requested
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Sort ascending by similarity (ties keep query order) and keep the first `top_k`.
/// Asking for more than is available returns everything.
pub fn rank(mut records: Vec<MatchRecord>, top_k: usize) -> Result<Ranking, RankError> {
    if top_k == 0 {
        return Err(RankError::InvalidTopK(top_k));
    }
    records.sort_by(|a, b| a.similarity.total_cmp(&b.similarity));
    records.truncate(top_k);
    let ranking = Ranking {
        records,
        requested: top_k,
    };
    if ranking.is_partial() {
        tracing::debug!(requested = top_k, available = ranking.len(), "fewer records than requested");
    }
    Ok(ranking)
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RankError {
    #[error("top-k must be at least 1, got {0}")]
    InvalidTopK(usize),
}
