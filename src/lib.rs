//! rankguard: retrieval quality and ranking dynamics under noisy embeddings.
//!
//! The crate measures how an additive-noise guard applied to document
//! embeddings degrades exact nearest-neighbor retrieval, and how the ranking
//! itself moves as the privacy parameter ε changes. A sweep fixes a corpus,
//! a query set and relevance judgments, embeds once, then for each ε:
//!
//! 1. [`guard::guard`] perturbs the corpus embeddings (σ = 1/ε, seeded),
//! 2. [`search::search`] ranks the corpus against every query (exact top-k),
//! 3. [`eval::evaluate`] scores the ranking against the judgments,
//! 4. [`dynamics::compare`] quantifies how two rankings at different ε
//!    levels differ (Kendall tau on the intersection, top-k overlap,
//!    rank displacement).
//!
//! [`sweep::run_sweep`] drives the whole pipeline over an ordered ε list and
//! persists rankings, quality tables and dynamics records through a
//! [`sweep::RankingSink`].
//!
//! Determinism is a design requirement throughout: the guard threads an
//! explicit seeded generator, top-k selection breaks score ties by the lower
//! corpus row index, and all aggregation iterates in a fixed order, so the
//! same inputs always produce bit-identical rankings.
//!
//! # Example
//!
//! ```
//! use rankguard::core::{EmbeddingBlock, Judgments};
//! use rankguard::sweep::{run_sweep, MemorySink, PairingPolicy, SweepConfig};
//!
//! let corpus = EmbeddingBlock::from_rows(
//!     vec!["d1".into(), "d2".into()],
//!     vec![vec![1.0, 0.0], vec![0.0, 1.0]],
//! ).unwrap();
//! let queries = EmbeddingBlock::from_rows(
//!     vec!["q1".into()],
//!     vec![vec![1.0, 0.0]],
//! ).unwrap();
//! let mut judgments = Judgments::new();
//! judgments.add("q1", "d1", 1.0);
//!
//! let config = SweepConfig {
//!     eps_list: vec![0.0, 2.0],
//!     seed: 7,
//!     search_k: 2,
//!     recall_ks: vec![1, 2],
//!     pairings: vec![PairingPolicy::Adjacent],
//! };
//! let mut sink = MemorySink::default();
//! let report = run_sweep(&corpus, &queries, &judgments, &config, &mut sink).unwrap();
//! assert_eq!(report.quality.len(), 2);
//! assert_eq!(report.dynamics.len(), 1);
//! ```

pub mod core;
pub mod dynamics;
pub mod error;
pub mod eval;
pub mod guard;
pub mod search;
pub mod sweep;

#[cfg(test)]
mod tests;
