/// Ranker
///
/// Picks the `k` best-scored item positions and maps them back to catalog
/// keys. Order is descending by score; equal scores keep ascending item
/// index, so identical input always yields identical output. NaN scores
/// rank below every real score.
use crate::services::catalog::IndexMapping;
use std::cmp::Ordering;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum RankingError {
    #[error("Requested {requested} recommendations but the catalog holds {available}")]
    OutOfRange { requested: usize, available: usize },

    #[error("Score count {scores} does not match item count {items}")]
    LengthMismatch { scores: usize, items: usize },
}

/// Indices of the `k` highest scores, best first.
pub fn top_k_indices(scores: &[f32], k: usize) -> Result<Vec<usize>, RankingError> {
    if k > scores.len() {
        return Err(RankingError::OutOfRange {
            requested: k,
            available: scores.len(),
        });
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    // sort_by is stable: ties stay in index order
    order.sort_by(|&a, &b| compare_desc(scores[a], scores[b]));
    order.truncate(k);
    Ok(order)
}

/// Top `k` catalog keys for scores laid out in `mapping` order.
pub fn rank(scores: &[f32], k: usize, mapping: &IndexMapping) -> Result<Vec<String>, RankingError> {
    if scores.len() != mapping.len() {
        return Err(RankingError::LengthMismatch {
            scores: scores.len(),
            items: mapping.len(),
        });
    }

    Ok(top_k_indices(scores, k)?
        .into_iter()
        .filter_map(|idx| mapping.key_at(idx).map(str::to_string))
        .collect())
}

fn compare_desc(a: f32, b: f32) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}
