//! Sweep orchestration: guard → search → evaluate per ε, then dynamics.
//!
//! A sweep walks an ordered ε list with a fixed seed. Each ε yields exactly
//! one [`Ranking`] and one [`QualityReport`]; any step failure aborts the
//! entire sweep rather than skipping the failed ε, because downstream
//! dynamics analysis assumes a complete, ordered set of rankings. Partial
//! results already handed to the sink remain as a diagnostic trail.
//!
//! The per-ε compute stage (guard, search, evaluate) only reads the shared
//! corpus/query blocks plus its own ε and seed, so it runs in parallel
//! across ε values. Persistence then runs sequentially in list order, and
//! the dynamics stage starts only once every ranking has been persisted,
//! since adjacent-pair comparisons need both neighbors complete.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::core::{EmbeddingBlock, Judgments, QualityReport, Ranking, SweepPoint};
use crate::dynamics::{compare, DynamicsRecord};
use crate::error::{RankGuardError, Result};
use crate::eval::evaluate;
use crate::guard::guard;
use crate::search::search;

/// Which ranking pairs the dynamics stage compares.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum PairingPolicy {
    /// Consecutive ε values in sweep order.
    Adjacent,
    /// Every other ε against this fixed baseline ε, which must appear in
    /// the sweep list (typically 0.0 or the largest ε).
    Reference(f64),
}

/// Parameters of one sweep.
#[derive(Clone, Debug)]
pub struct SweepConfig {
    /// Noise levels in sweep order. Order matters for adjacent pairings.
    pub eps_list: Vec<f64>,
    /// Guard seed, shared by every ε so runs differ only in noise scale.
    pub seed: u64,
    /// Search depth K; also the depth dynamics comparisons run at.
    pub search_k: usize,
    /// Depths for the recall@k family; max must not exceed `search_k`.
    pub recall_ks: Vec<usize>,
    /// Dynamics pairings to compute after the sweep.
    pub pairings: Vec<PairingPolicy>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            eps_list: vec![0.0, 16.0, 8.0, 4.0, 2.0, 1.0],
            seed: 42,
            search_k: 10,
            recall_ks: vec![1, 5, 10],
            pairings: vec![PairingPolicy::Adjacent],
        }
    }
}

/// One aggregated dynamics row: the compared pair and its metrics.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DynamicsEntry {
    pub policy: PairingPolicy,
    pub from: SweepPoint,
    pub to: SweepPoint,
    pub record: DynamicsRecord,
}

/// Everything a finished sweep produced, in ε-list order.
#[derive(Clone, Debug, Default)]
pub struct SweepReport {
    pub quality: Vec<QualityReport>,
    pub dynamics: Vec<DynamicsEntry>,
}

/// Durable destination for sweep artifacts.
///
/// A persisted ranking must be retrievable by its sweep point for later
/// dynamics computation; quality and dynamics rows are tabular output.
/// Any error from a sink method aborts the remaining sweep.
pub trait RankingSink {
    fn persist_ranking(&mut self, point: SweepPoint, ranking: &Ranking) -> Result<()>;
    fn persist_quality(&mut self, report: &QualityReport) -> Result<()>;
    fn persist_dynamics(&mut self, entry: &DynamicsEntry) -> Result<()>;
}

/// In-memory sink for programmatic use and tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub rankings: Vec<(SweepPoint, Ranking)>,
    pub quality: Vec<QualityReport>,
    pub dynamics: Vec<DynamicsEntry>,
}

impl RankingSink for MemorySink {
    fn persist_ranking(&mut self, point: SweepPoint, ranking: &Ranking) -> Result<()> {
        self.rankings.push((point, ranking.clone()));
        Ok(())
    }

    fn persist_quality(&mut self, report: &QualityReport) -> Result<()> {
        self.quality.push(report.clone());
        Ok(())
    }

    fn persist_dynamics(&mut self, entry: &DynamicsEntry) -> Result<()> {
        self.dynamics.push(entry.clone());
        Ok(())
    }
}

#[derive(Serialize)]
struct RankingRow<'a> {
    query_id: &'a str,
    doc_ids: &'a [String],
}

/// JSONL sink writing one rankings file per ε plus quality and dynamics
/// tables under an output directory.
///
/// Every file is written to a temporary sibling and renamed into place, so
/// a reader never observes a partially written artifact. Table files are
/// rewritten in full on each persist; at sweep scale (tens of rows) this is
/// cheaper than managing append durability.
#[derive(Debug)]
pub struct JsonlSink {
    dir: PathBuf,
    quality: Vec<QualityReport>,
    dynamics: Vec<DynamicsEntry>,
}

impl JsonlSink {
    /// Creates the output directory if needed.
    ///
    /// # Errors
    ///
    /// [`RankGuardError::PersistenceFailure`] if the directory cannot be
    /// created.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .map_err(|e| RankGuardError::PersistenceFailure(format!("create {dir:?}: {e}")))?;
        Ok(Self {
            dir,
            quality: Vec::new(),
            dynamics: Vec::new(),
        })
    }

    /// Path of the rankings file for a sweep point.
    pub fn ranking_path(&self, point: SweepPoint) -> PathBuf {
        self.dir.join(format!("rank_{}.jsonl", point.label()))
    }

    fn write_atomic(&self, name: &Path, lines: &[String]) -> Result<()> {
        let target = self.dir.join(name);
        let tmp = self.dir.join(format!(
            "{}.tmp",
            name.file_name().and_then(|n| n.to_str()).unwrap_or("out")
        ));
        let body = if lines.is_empty() {
            String::new()
        } else {
            format!("{}\n", lines.join("\n"))
        };
        fs::write(&tmp, body)
            .map_err(|e| RankGuardError::PersistenceFailure(format!("write {tmp:?}: {e}")))?;
        fs::rename(&tmp, &target)
            .map_err(|e| RankGuardError::PersistenceFailure(format!("rename to {target:?}: {e}")))?;
        Ok(())
    }

    fn to_lines<T: Serialize>(rows: impl IntoIterator<Item = T>) -> Result<Vec<String>> {
        rows.into_iter()
            .map(|row| {
                serde_json::to_string(&row)
                    .map_err(|e| RankGuardError::PersistenceFailure(format!("serialize: {e}")))
            })
            .collect()
    }
}

impl RankingSink for JsonlSink {
    fn persist_ranking(&mut self, point: SweepPoint, ranking: &Ranking) -> Result<()> {
        let lines = Self::to_lines(ranking.iter().map(|(qid, docs)| RankingRow {
            query_id: qid,
            doc_ids: docs,
        }))?;
        let name = PathBuf::from(format!("rank_{}.jsonl", point.label()));
        self.write_atomic(&name, &lines)?;
        debug!("persisted ranking {} ({} queries)", point.label(), ranking.len());
        Ok(())
    }

    fn persist_quality(&mut self, report: &QualityReport) -> Result<()> {
        self.quality.push(report.clone());
        let lines = Self::to_lines(self.quality.iter())?;
        self.write_atomic(Path::new("quality.jsonl"), &lines)
    }

    fn persist_dynamics(&mut self, entry: &DynamicsEntry) -> Result<()> {
        self.dynamics.push(entry.clone());
        let lines = Self::to_lines(self.dynamics.iter())?;
        self.write_atomic(Path::new("dynamics.jsonl"), &lines)
    }
}

/// Runs a full sweep and the requested dynamics pairings.
///
/// Stages per ε, in list order: guard → search → evaluate → persist. The
/// compute stage runs in parallel across ε values; persistence is
/// sequential and ordered; dynamics runs last, over the persisted set.
///
/// # Errors
///
/// - [`RankGuardError::EmptyInput`] if `eps_list` is empty.
/// - [`RankGuardError::InvalidParameter`] if a `Reference` baseline is not
///   in `eps_list`, or from search/evaluate parameter validation.
/// - [`RankGuardError::PersistenceFailure`] from the sink; aborts the rest
///   of the sweep.
pub fn run_sweep(
    corpus: &EmbeddingBlock,
    queries: &EmbeddingBlock,
    judgments: &Judgments,
    config: &SweepConfig,
    sink: &mut dyn RankingSink,
) -> Result<SweepReport> {
    if config.eps_list.is_empty() {
        return Err(RankGuardError::EmptyInput("eps list"));
    }
    // A duplicated eps would collide on SweepPoint labels (and thus on sink
    // file names) and make a Reference baseline ambiguous.
    for (i, &eps) in config.eps_list.iter().enumerate() {
        if config.eps_list[..i].contains(&eps) {
            return Err(RankGuardError::InvalidParameter(format!(
                "duplicate eps {eps} in the sweep list"
            )));
        }
    }
    for policy in &config.pairings {
        if let PairingPolicy::Reference(baseline) = policy {
            if !config.eps_list.iter().any(|&e| e == *baseline) {
                return Err(RankGuardError::InvalidParameter(format!(
                    "reference eps {baseline} is not in the sweep list"
                )));
            }
        }
    }

    info!(
        "sweep: {} eps values, seed={}, k={}, corpus={} docs, {} queries",
        config.eps_list.len(),
        config.seed,
        config.search_k,
        corpus.nitems,
        queries.nitems
    );

    // Independent per-eps compute; only the shared read-only blocks are
    // touched, so rayon can fan out. First failure cancels the collect.
    let computed: Vec<(SweepPoint, Ranking, QualityReport)> = config
        .eps_list
        .par_iter()
        .map(|&eps| {
            let point = SweepPoint {
                eps,
                seed: config.seed,
            };
            debug!("sweep point {}: guarding", point.label());
            let noisy = guard(corpus, eps, config.seed);
            debug!("sweep point {}: searching", point.label());
            let ranking = search(queries, &noisy, config.search_k)?;
            debug!("sweep point {}: evaluating", point.label());
            let metrics = evaluate(&ranking, judgments, &config.recall_ks)?;
            Ok((point, ranking, QualityReport { point, metrics }))
        })
        .collect::<Result<Vec<_>>>()?;

    // Sequential, ordered persistence: the sink sees the sweep exactly as
    // the eps list orders it, and dynamics only starts after the last write.
    for (point, ranking, report) in &computed {
        sink.persist_ranking(*point, ranking)?;
        sink.persist_quality(report)?;
        info!("sweep point {} persisted", point.label());
    }

    let mut dynamics = Vec::new();
    for policy in &config.pairings {
        match *policy {
            PairingPolicy::Adjacent => {
                for pair in computed.windows(2) {
                    let entry = pair_entry(*policy, &pair[0], &pair[1], config.search_k)?;
                    sink.persist_dynamics(&entry)?;
                    dynamics.push(entry);
                }
            }
            PairingPolicy::Reference(baseline) => {
                // Validated above; eps values are unique in the list.
                let ri = config
                    .eps_list
                    .iter()
                    .position(|&e| e == baseline)
                    .ok_or_else(|| {
                        RankGuardError::InvalidParameter(format!(
                            "reference eps {baseline} is not in the sweep list"
                        ))
                    })?;
                for (i, other) in computed.iter().enumerate() {
                    if i == ri {
                        continue;
                    }
                    let entry = pair_entry(*policy, &computed[ri], other, config.search_k)?;
                    sink.persist_dynamics(&entry)?;
                    dynamics.push(entry);
                }
            }
        }
    }

    info!(
        "sweep done: {} quality rows, {} dynamics rows",
        computed.len(),
        dynamics.len()
    );

    Ok(SweepReport {
        quality: computed.into_iter().map(|(_, _, report)| report).collect(),
        dynamics,
    })
}

fn pair_entry(
    policy: PairingPolicy,
    from: &(SweepPoint, Ranking, QualityReport),
    to: &(SweepPoint, Ranking, QualityReport),
    k: usize,
) -> Result<DynamicsEntry> {
    let record = compare(&from.1, &to.1, k)?;
    debug!(
        "dynamics {} -> {}: tau={:?} overlap={:.4} displacement={:.4}",
        from.0.label(),
        to.0.label(),
        record.mean_tau,
        record.mean_overlap,
        record.mean_displacement
    );
    Ok(DynamicsEntry {
        policy,
        from: from.0,
        to: to.0,
        record,
    })
}
