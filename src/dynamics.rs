//! Pairwise ranking-dynamics metrics between two sweep points.
//!
//! Given two rankings of the same query set produced under different noise
//! levels, this module quantifies how much the ranking itself moved:
//!
//! - **Top-k overlap**: `|A_k ∩ B_k| / k` over the depth-k truncated lists.
//!   The denominator is always the requested depth k, never the union size.
//! - **Average rank displacement**: mean absolute difference of 1-indexed
//!   positions over documents common to both full lists.
//! - **Kendall tau on the intersection**: concordant-vs-discordant pair
//!   ratio over the documents shared by the truncated lists. With fewer
//!   than two shared documents tau is `None`, a distinguishable no-signal
//!   value; coercing it to 0 would claim "maximally neutral" where the
//!   honest claim is "insufficient data".
//!
//! The comparison is pairing-agnostic: the orchestrator decides which
//! (ε_i, ε_j) pairs to feed it, whether adjacent in sweep order or each
//! against a fixed reference.

use std::collections::HashMap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::core::Ranking;
use crate::error::{RankGuardError, Result};

/// Per-query stability metrics for one pair of ranked lists.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QueryShift {
    /// `|A_k ∩ B_k| / k`; 1.0 when both truncated lists are empty.
    pub overlap: f64,
    /// Mean |rank_A − rank_B| over common docs of the full lists; 0.0 when
    /// no doc is common.
    pub displacement: f64,
    /// Kendall tau over the truncated-list intersection; `None` when the
    /// intersection holds fewer than two documents.
    pub tau: Option<f64>,
    /// True when the rank-1 document differs between the two lists.
    pub top1_changed: bool,
}

/// Aggregated stability metrics for a pair of sweep points.
///
/// Recomputable from the two rankings alone; derived, read-only.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DynamicsRecord {
    /// Mean tau over queries with a defined tau; `None` when no query had one.
    pub mean_tau: Option<f64>,
    /// How many queries contributed a defined tau.
    pub tau_defined: usize,
    /// Mean top-k overlap over compared queries.
    pub mean_overlap: f64,
    /// Mean rank displacement over compared queries.
    pub mean_displacement: f64,
    /// Fraction of compared queries whose rank-1 document changed.
    pub top1_change_rate: f64,
    /// Queries present in both rankings.
    pub queries_compared: usize,
    /// Queries present in only one ranking, excluded from aggregation.
    pub queries_excluded: usize,
}

#[inline]
fn positions(list: &[String]) -> HashMap<&str, usize> {
    list.iter()
        .enumerate()
        .map(|(i, d)| (d.as_str(), i))
        .collect()
}

/// Computes the per-query shift between two ranked lists at depth `k`.
///
/// Overlap and tau look at the lists truncated to `k`; displacement uses
/// positions in the full lists. Both metrics are symmetric in `a`/`b`.
pub fn query_shift(a: &[String], b: &[String], k: usize) -> QueryShift {
    debug_assert!(k >= 1, "depth must be >= 1");
    let ta = &a[..a.len().min(k)];
    let tb = &b[..b.len().min(k)];

    let pos_a = positions(ta);
    let pos_b = positions(tb);

    // Intersection in a's order, so pair enumeration is deterministic.
    let common: Vec<&str> = ta
        .iter()
        .map(String::as_str)
        .filter(|d| pos_b.contains_key(d))
        .collect();

    let overlap = if ta.is_empty() && tb.is_empty() {
        1.0
    } else {
        common.len() as f64 / k as f64
    };

    let full_a = positions(a);
    let full_b = positions(b);
    let shared_full: Vec<&str> = a
        .iter()
        .map(String::as_str)
        .filter(|d| full_b.contains_key(d))
        .collect();
    let displacement = if shared_full.is_empty() {
        0.0
    } else {
        let total: f64 = shared_full
            .iter()
            .map(|d| {
                let ra = full_a[d] as i64 + 1;
                let rb = full_b[d] as i64 + 1;
                (ra - rb).unsigned_abs() as f64
            })
            .sum();
        total / shared_full.len() as f64
    };

    let tau = if common.len() < 2 {
        None
    } else {
        let mut concordant = 0u64;
        let mut discordant = 0u64;
        for i in 0..common.len() {
            for j in (i + 1)..common.len() {
                let da = pos_a[common[i]] as i64 - pos_a[common[j]] as i64;
                let db = pos_b[common[i]] as i64 - pos_b[common[j]] as i64;
                let prod = da * db;
                if prod > 0 {
                    concordant += 1;
                } else if prod < 0 {
                    discordant += 1;
                }
            }
        }
        let denom = concordant + discordant;
        if denom == 0 {
            // Unreachable for strict total orders with m >= 2, kept as a guard.
            Some(0.0)
        } else {
            Some((concordant as f64 - discordant as f64) / denom as f64)
        }
    };

    let top1_changed = match (a.first(), b.first()) {
        (Some(x), Some(y)) => x != y,
        (None, None) => false,
        _ => true,
    };

    QueryShift {
        overlap,
        displacement,
        tau,
        top1_changed,
    }
}

/// Compares two rankings at depth `k` and aggregates per-query shifts.
///
/// Only queries present in both rankings are compared; the rest are counted
/// in `queries_excluded`. Undefined taus are excluded from the tau mean
/// rather than coerced to 0, and `tau_defined` reports how many queries
/// contributed.
///
/// # Errors
///
/// [`RankGuardError::InvalidParameter`] if `k == 0`.
///
/// # Examples
///
/// ```
/// use rankguard::core::Ranking;
/// use rankguard::dynamics::compare;
///
/// let mut a = Ranking::new();
/// a.insert("q1", vec!["d1".into(), "d2".into(), "d3".into()]);
/// let mut b = Ranking::new();
/// b.insert("q1", vec!["d2".into(), "d1".into(), "d4".into()]);
///
/// let record = compare(&a, &b, 3).unwrap();
/// assert!((record.mean_overlap - 2.0 / 3.0).abs() < 1e-12);
/// assert_eq!(record.mean_tau, Some(-1.0));
/// ```
pub fn compare(a: &Ranking, b: &Ranking, k: usize) -> Result<DynamicsRecord> {
    if k == 0 {
        return Err(RankGuardError::InvalidParameter(
            "comparison depth k must be >= 1".into(),
        ));
    }

    // Ranking iterates in ascending query-id order, so the merge below
    // visits common queries deterministically.
    let common: Vec<&String> = a.query_ids().filter(|q| b.get(q.as_str()).is_some()).collect();
    let excluded = (a.len() - common.len()) + (b.len() - common.len());

    debug!(
        "compare: depth={}, {} common queries, {} excluded",
        k,
        common.len(),
        excluded
    );

    let mut overlap_sum = 0.0;
    let mut displacement_sum = 0.0;
    let mut top1_changes = 0usize;
    let mut tau_sum = 0.0;
    let mut tau_defined = 0usize;

    for qid in &common {
        let shift = query_shift(
            a.get(qid.as_str()).unwrap_or_default(),
            b.get(qid.as_str()).unwrap_or_default(),
            k,
        );
        overlap_sum += shift.overlap;
        displacement_sum += shift.displacement;
        if shift.top1_changed {
            top1_changes += 1;
        }
        if let Some(tau) = shift.tau {
            tau_sum += tau;
            tau_defined += 1;
        }
    }

    let n = common.len();
    let (mean_overlap, mean_displacement, top1_change_rate) = if n == 0 {
        (0.0, 0.0, 0.0)
    } else {
        (
            overlap_sum / n as f64,
            displacement_sum / n as f64,
            top1_changes as f64 / n as f64,
        )
    };
    let mean_tau = if tau_defined == 0 {
        None
    } else {
        Some(tau_sum / tau_defined as f64)
    };

    Ok(DynamicsRecord {
        mean_tau,
        tau_defined,
        mean_overlap,
        mean_displacement,
        top1_change_rate,
        queries_compared: n,
        queries_excluded: excluded,
    })
}
