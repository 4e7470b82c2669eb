//! Retrieval quality metrics: recall@k family and nDCG@10.
//!
//! Recall@k is a binary hit rate: the fraction of queries whose top-k list
//! contains at least one judged-relevant document (gain > 0). Queries with
//! no judged documents stay in the denominator and contribute 0, never a
//! divide-by-zero.
//!
//! nDCG runs at fixed depth 10, or `min(10, K)` when the ranking is
//! shallower. The graded formula reduces exactly to the binary single-gold
//! case: with one judged document of gain 1, IDCG is 1 and nDCG equals the
//! DCG of the gold position alone.

use std::collections::BTreeMap;

use log::debug;

use crate::core::{Judgments, Ranking};
use crate::error::{RankGuardError, Result};

/// Depth of the nDCG metric, capped by the ranking depth.
const NDCG_DEPTH: usize = 10;

/// Discounted cumulative gain of a ranked gain sequence.
///
/// `gains[i]` is the gain at 1-indexed rank `i + 1`; the discount is
/// `log2(rank + 1)`.
#[inline]
fn dcg(gains: &[f64]) -> f64 {
    gains
        .iter()
        .enumerate()
        .map(|(i, &g)| g / ((i + 2) as f64).log2())
        .sum()
}

/// Scores a ranking against relevance judgments.
///
/// Returns a metric table keyed `recall@{k}` for each requested `k` plus
/// `ndcg@10`, every value in [0, 1], averaged over all queries in the
/// ranking. Judgment lookups that miss are gain 0, not an error.
///
/// # Errors
///
/// - [`RankGuardError::EmptyInput`] if the ranking has no queries.
/// - [`RankGuardError::InvalidParameter`] if `k_values` is empty, contains
///   0, or its maximum exceeds the ranking depth.
///
/// # Examples
///
/// ```
/// use rankguard::core::{Judgments, Ranking};
/// use rankguard::eval::evaluate;
///
/// let mut ranking = Ranking::new();
/// ranking.insert("q1", vec!["d3".into(), "d1".into(), "d2".into()]);
/// let mut judgments = Judgments::new();
/// judgments.add("q1", "d1", 1.0);
///
/// let metrics = evaluate(&ranking, &judgments, &[1, 2]).unwrap();
/// assert_eq!(metrics["recall@1"], 0.0);
/// assert_eq!(metrics["recall@2"], 1.0);
/// ```
pub fn evaluate(
    ranking: &Ranking,
    judgments: &Judgments,
    k_values: &[usize],
) -> Result<BTreeMap<String, f64>> {
    if ranking.is_empty() {
        return Err(RankGuardError::EmptyInput("ranking"));
    }
    if k_values.is_empty() {
        return Err(RankGuardError::EmptyInput("recall depths"));
    }
    if k_values.contains(&0) {
        return Err(RankGuardError::InvalidParameter(
            "recall depth k must be >= 1".into(),
        ));
    }
    let depth = ranking.depth();
    let max_k = *k_values.iter().max().unwrap_or(&0);
    if max_k > depth {
        return Err(RankGuardError::InvalidParameter(format!(
            "recall depth {max_k} exceeds ranking depth {depth}"
        )));
    }

    let mut ks: Vec<usize> = k_values.to_vec();
    ks.sort_unstable();
    ks.dedup();

    let nqueries = ranking.len();
    let ndcg_depth = NDCG_DEPTH.min(depth);
    debug!(
        "evaluate: {} queries, recall depths {:?}, ndcg depth {}",
        nqueries, ks, ndcg_depth
    );

    let mut hits: Vec<f64> = vec![0.0; ks.len()];
    let mut ndcg_sum = 0.0;

    for (qid, docs) in ranking.iter() {
        let relevant = judgments.relevant_set(qid);

        for (slot, &k) in ks.iter().enumerate() {
            if docs[..k].iter().any(|d| relevant.contains(d.as_str())) {
                hits[slot] += 1.0;
            }
        }

        let gains: Vec<f64> = docs
            .iter()
            .take(ndcg_depth)
            .map(|d| judgments.gain(qid, d))
            .collect();
        let mut ideal = judgments.ideal_gains(qid);
        ideal.truncate(ndcg_depth);

        let idcg = dcg(&ideal);
        if idcg > 0.0 {
            ndcg_sum += dcg(&gains) / idcg;
        }
    }

    let mut metrics = BTreeMap::new();
    for (slot, &k) in ks.iter().enumerate() {
        metrics.insert(format!("recall@{k}"), hits[slot] / nqueries as f64);
    }
    metrics.insert("ndcg@10".into(), ndcg_sum / nqueries as f64);

    Ok(metrics)
}
