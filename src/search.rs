//! Exact brute-force top-k similarity search.
//!
//! Scores are plain dot products between query and corpus rows, which equal
//! cosine similarity under the documented precondition that both blocks hold
//! unit-normalized embeddings. Normalization is the embedding adapter's
//! responsibility; this module never normalizes.
//!
//! Selection is exact: every corpus row is scored for every query, then the
//! k best are kept, ordered by descending score with exact ties broken by
//! the lower corpus row index. The tie-break is load-bearing: downstream
//! ranking-dynamics comparisons assume orderings are reproducible across
//! runs, so a tie must never resolve differently between two sweeps.
//!
//! Per-query scoring is independent and parallelized across query rows.

use std::cmp::Ordering;

use log::debug;
use rayon::prelude::*;

use crate::core::{EmbeddingBlock, Ranking};
use crate::error::{RankGuardError, Result};

#[inline]
fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Ranks the corpus against every query and keeps the top `k` per query.
///
/// `k` is clamped to the corpus size when it exceeds it; every returned
/// list has length `min(k, corpus.nitems)` and contains corpus ids only,
/// without duplicates.
///
/// # Errors
///
/// - [`RankGuardError::EmptyInput`] if either block has zero rows.
/// - [`RankGuardError::ShapeMismatch`] if the embedding dimensions differ.
/// - [`RankGuardError::InvalidParameter`] if `k == 0`.
///
/// # Examples
///
/// ```
/// use rankguard::core::EmbeddingBlock;
/// use rankguard::search::search;
///
/// let corpus = EmbeddingBlock::from_rows(
///     vec!["d1".into(), "d2".into()],
///     vec![vec![1.0, 0.0], vec![0.0, 1.0]],
/// ).unwrap();
/// let queries = EmbeddingBlock::from_rows(
///     vec!["q1".into()],
///     vec![vec![0.9, 0.1]],
/// ).unwrap();
///
/// let ranking = search(&queries, &corpus, 2).unwrap();
/// assert_eq!(ranking.get("q1").unwrap(), ["d1", "d2"].as_slice());
/// ```
pub fn search(queries: &EmbeddingBlock, corpus: &EmbeddingBlock, k: usize) -> Result<Ranking> {
    if queries.nitems == 0 {
        return Err(RankGuardError::EmptyInput("query embeddings"));
    }
    if corpus.nitems == 0 {
        return Err(RankGuardError::EmptyInput("corpus embeddings"));
    }
    if queries.ndims != corpus.ndims {
        return Err(RankGuardError::ShapeMismatch {
            expected: corpus.ndims,
            actual: queries.ndims,
        });
    }
    if k == 0 {
        return Err(RankGuardError::InvalidParameter(
            "search depth k must be >= 1".into(),
        ));
    }

    let depth = k.min(corpus.nitems);
    debug!(
        "search: {} queries x {} docs, dims={}, depth={}",
        queries.nitems, corpus.nitems, corpus.ndims, depth
    );

    let lists: Vec<(String, Vec<String>)> = (0..queries.nitems)
        .into_par_iter()
        .map(|qi| {
            let q = queries.row(qi);
            let mut scored: Vec<(usize, f64)> = (0..corpus.nitems)
                .map(|ci| (ci, dot(q, corpus.row(ci))))
                .collect();

            // Descending score; exact ties resolve to the lower corpus row.
            scored.sort_unstable_by(|a, b| {
                b.1.partial_cmp(&a.1)
                    .unwrap_or(Ordering::Equal)
                    .then_with(|| a.0.cmp(&b.0))
            });
            scored.truncate(depth);

            let docs = scored
                .iter()
                .map(|&(ci, _)| corpus.ids[ci].clone())
                .collect();
            (queries.ids[qi].clone(), docs)
        })
        .collect();

    Ok(Ranking::from_lists(lists))
}
