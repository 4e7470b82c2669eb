//! Core data model: embedding blocks, rankings, relevance judgments and
//! sweep records.
//!
//! This module provides the shared, read-only data the whole sweep operates
//! on:
//!
//! - [`EmbeddingBlock`]: a dense, row-major matrix of embeddings with an
//!   ordered id list aligned 1:1 with its rows.
//! - [`Ranking`]: per-query ordered document-id lists, the output of the
//!   similarity search and the input to evaluation and dynamics.
//! - [`Judgments`]: a two-level gain map (query id → document id → gain)
//!   with an explicit lookup-with-default-0 accessor.
//! - [`SweepPoint`] / [`QualityReport`]: the (ε, seed) identity of one run
//!   and its quality-metrics table.
//!
//! Design goals:
//! - Flat `Vec<f64>` storage with shape fields; zero-copy row slices for
//!   the hot scoring loops.
//! - Deterministic iteration everywhere a consumer aggregates: rankings are
//!   keyed by `BTreeMap` so query order is stable across runs.
//! - Blocks are never mutated after construction; the guard and the search
//!   return new data.
//!
//! # Examples
//!
//! Build a block and read a row without copying:
//!
//! ```
//! use rankguard::core::EmbeddingBlock;
//!
//! let block = EmbeddingBlock::from_rows(
//!     vec!["a".into(), "b".into()],
//!     vec![vec![1.0, 0.0], vec![0.0, 1.0]],
//! ).unwrap();
//!
//! assert_eq!(block.shape(), (2, 2));
//! assert_eq!(block.row(1), &[0.0, 1.0]);
//! ```
//!
//! # Panics
//!
//! - Row accessors panic on out-of-bounds indices; construction errors are
//!   reported through [`crate::error::RankGuardError`] instead.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{RankGuardError, Result};

/// A dense, row-major embedding matrix with an aligned id per row.
///
/// One row per item (corpus document or query), fixed dimension across all
/// rows. The id list is ordered and deduplicated; `ids[i]` names `row(i)`.
#[derive(Clone, Debug, PartialEq)]
pub struct EmbeddingBlock {
    /// Number of items (rows).
    pub nitems: usize,
    /// Embedding dimension (columns).
    pub ndims: usize,
    /// Row-major flattened values, `nitems * ndims` long.
    pub data: Vec<f64>,
    /// Item ids, aligned 1:1 with rows.
    pub ids: Vec<String>,
}

impl EmbeddingBlock {
    /// Builds a block from per-item rows and their ids.
    ///
    /// # Errors
    ///
    /// - [`RankGuardError::EmptyInput`] if `rows` is empty.
    /// - [`RankGuardError::ShapeMismatch`] if `ids.len() != rows.len()` or
    ///   rows have differing lengths.
    /// - [`RankGuardError::InvalidParameter`] if an id occurs twice.
    pub fn from_rows(ids: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self> {
        if rows.is_empty() {
            return Err(RankGuardError::EmptyInput("embedding rows"));
        }
        if ids.len() != rows.len() {
            return Err(RankGuardError::ShapeMismatch {
                expected: rows.len(),
                actual: ids.len(),
            });
        }
        let ndims = rows[0].len();
        if ndims == 0 {
            return Err(RankGuardError::EmptyInput("embedding dimension"));
        }
        for row in &rows {
            if row.len() != ndims {
                return Err(RankGuardError::ShapeMismatch {
                    expected: ndims,
                    actual: row.len(),
                });
            }
        }
        check_unique(&ids)?;

        let nitems = rows.len();
        let mut data = Vec::with_capacity(nitems * ndims);
        for row in &rows {
            data.extend_from_slice(row);
        }

        Ok(Self {
            nitems,
            ndims,
            data,
            ids,
        })
    }

    /// Builds a block from already-flattened row-major data.
    ///
    /// # Errors
    ///
    /// Same validation as [`EmbeddingBlock::from_rows`]; additionally
    /// [`RankGuardError::ShapeMismatch`] if `data.len() != ids.len() * ndims`.
    pub fn from_flat(ids: Vec<String>, data: Vec<f64>, ndims: usize) -> Result<Self> {
        if ids.is_empty() {
            return Err(RankGuardError::EmptyInput("embedding rows"));
        }
        if ndims == 0 {
            return Err(RankGuardError::EmptyInput("embedding dimension"));
        }
        if data.len() != ids.len() * ndims {
            return Err(RankGuardError::ShapeMismatch {
                expected: ids.len() * ndims,
                actual: data.len(),
            });
        }
        check_unique(&ids)?;
        Ok(Self {
            nitems: ids.len(),
            ndims,
            data,
            ids,
        })
    }

    /// Returns `(nitems, ndims)`.
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.nitems, self.ndims)
    }

    /// Returns a zero-copy slice of the requested row.
    ///
    /// # Panics
    ///
    /// Panics if `i >= nitems`.
    #[inline]
    pub fn row(&self, i: usize) -> &[f64] {
        assert!(i < self.nitems, "row index out of bounds");
        let start = i * self.ndims;
        &self.data[start..start + self.ndims]
    }
}

fn check_unique(ids: &[String]) -> Result<()> {
    let mut seen = HashSet::with_capacity(ids.len());
    for id in ids {
        if !seen.insert(id.as_str()) {
            return Err(RankGuardError::InvalidParameter(format!(
                "duplicate item id: {id}"
            )));
        }
    }
    Ok(())
}

/// Per-query ordered document-id lists at a fixed search depth.
///
/// Each list is ordered by descending similarity score, ties broken by the
/// lower corpus row index, and contains no duplicate ids. `BTreeMap` keys
/// keep iteration order deterministic for aggregation and persistence.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Ranking {
    lists: BTreeMap<String, Vec<String>>,
}

impl Ranking {
    /// Creates an empty ranking.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a ranking from `(query id, ordered doc ids)` pairs.
    pub fn from_lists<I>(lists: I) -> Self
    where
        I: IntoIterator<Item = (String, Vec<String>)>,
    {
        Self {
            lists: lists.into_iter().collect(),
        }
    }

    /// Inserts or replaces one query's list.
    pub fn insert(&mut self, query_id: impl Into<String>, docs: Vec<String>) {
        self.lists.insert(query_id.into(), docs);
    }

    /// Returns the ranked list for a query, if present.
    #[inline]
    pub fn get(&self, query_id: &str) -> Option<&[String]> {
        self.lists.get(query_id).map(Vec::as_slice)
    }

    /// Number of queries.
    #[inline]
    pub fn len(&self) -> usize {
        self.lists.len()
    }

    /// True when no query has a list.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    /// Minimum list length across queries; 0 for an empty ranking.
    ///
    /// Evaluation depth checks use this: a metric at depth k needs every
    /// query to carry at least k ranked documents.
    pub fn depth(&self) -> usize {
        self.lists.values().map(Vec::len).min().unwrap_or(0)
    }

    /// Iterates `(query id, ranked docs)` in ascending query-id order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.lists.iter()
    }

    /// Query ids in ascending order.
    pub fn query_ids(&self) -> impl Iterator<Item = &String> {
        self.lists.keys()
    }
}

/// Graded relevance judgments: query id → (document id → gain).
///
/// Gains are non-negative; 0 means not relevant. Lookups for absent
/// queries or documents return 0 rather than failing, which makes the
/// single-gold degenerate case (one entry, gain 1) and sparse graded
/// judgment sets uniform to consume.
#[derive(Clone, Debug, Default)]
pub struct Judgments {
    by_query: HashMap<String, HashMap<String, f64>>,
}

impl Judgments {
    /// Creates an empty judgment set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one judged `(query, document, gain)` triple.
    ///
    /// # Panics
    ///
    /// Panics if `gain` is negative or not finite.
    pub fn add(&mut self, query_id: impl Into<String>, doc_id: impl Into<String>, gain: f64) {
        assert!(
            gain >= 0.0 && gain.is_finite(),
            "relevance gain must be finite and non-negative"
        );
        self.by_query
            .entry(query_id.into())
            .or_default()
            .insert(doc_id.into(), gain);
    }

    /// Gain for `(query, doc)`, 0.0 when either level is absent.
    #[inline]
    pub fn gain(&self, query_id: &str, doc_id: &str) -> f64 {
        self.by_query
            .get(query_id)
            .and_then(|docs| docs.get(doc_id))
            .copied()
            .unwrap_or(0.0)
    }

    /// All judged gains for a query, sorted descending, for ideal DCG.
    pub fn ideal_gains(&self, query_id: &str) -> Vec<f64> {
        let mut gains: Vec<f64> = self
            .by_query
            .get(query_id)
            .map(|docs| docs.values().copied().collect())
            .unwrap_or_default();
        gains.sort_unstable_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
        gains
    }

    /// Document ids judged relevant (gain > 0) for a query.
    pub fn relevant_set(&self, query_id: &str) -> HashSet<&str> {
        self.by_query
            .get(query_id)
            .map(|docs| {
                docs.iter()
                    .filter(|(_, &g)| g > 0.0)
                    .map(|(d, _)| d.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of queries carrying at least one judgment.
    #[inline]
    pub fn len(&self) -> usize {
        self.by_query.len()
    }

    /// True when no query has a judgment.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.by_query.is_empty()
    }
}

/// The (ε, seed) pair that deterministically identifies one sweep run.
///
/// Immutable once its ranking is persisted; every persisted artifact is
/// keyed by it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SweepPoint {
    /// Privacy parameter; lower ε means more noise (σ = 1/ε).
    pub eps: f64,
    /// RNG seed for the guard.
    pub seed: u64,
}

impl SweepPoint {
    /// Stable label for file naming and logs, e.g. `eps0.5_seed42`.
    pub fn label(&self) -> String {
        format!("eps{}_seed{}", self.eps, self.seed)
    }
}

/// Quality metrics for one sweep point: metric name → value in [0, 1].
///
/// Metric names follow the `recall@{k}` / `ndcg@10` convention so rows from
/// different sweep points line up as a table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub point: SweepPoint,
    pub metrics: BTreeMap<String, f64>,
}
