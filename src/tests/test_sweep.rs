use approx::assert_relative_eq;

use crate::core::{Ranking, SweepPoint};
use crate::error::RankGuardError;
use crate::sweep::{
    run_sweep, DynamicsEntry, JsonlSink, MemorySink, PairingPolicy, RankingSink, SweepConfig,
};
use crate::tests::test_data::{echo_queries, gold_judgments, unit_block};
use crate::tests::{init_logging, SEARCH_K, SWEEP_EPS, SWEEP_SEED};

fn fixture_config() -> SweepConfig {
    SweepConfig {
        eps_list: SWEEP_EPS.to_vec(),
        seed: SWEEP_SEED,
        search_k: SEARCH_K,
        recall_ks: vec![1, 5],
        pairings: vec![PairingPolicy::Adjacent, PairingPolicy::Reference(0.0)],
    }
}

#[test]
fn full_sweep_over_synthetic_corpus() {
    init_logging();
    let corpus = unit_block("d", 12, 16, 7);
    let queries = echo_queries(&corpus, 6);
    let judgments = gold_judgments(6);
    let config = fixture_config();

    let mut sink = MemorySink::default();
    let report = run_sweep(&corpus, &queries, &judgments, &config, &mut sink).unwrap();

    // One ranking and one quality row per eps, in sweep order.
    assert_eq!(sink.rankings.len(), SWEEP_EPS.len());
    assert_eq!(report.quality.len(), SWEEP_EPS.len());
    for (row, &eps) in report.quality.iter().zip(SWEEP_EPS.iter()) {
        assert_eq!(row.point, SweepPoint { eps, seed: SWEEP_SEED });
        for (name, value) in &row.metrics {
            assert!(
                (0.0..=1.0).contains(value),
                "{name} out of range: {value}"
            );
        }
    }

    // At eps 0 every query echoes its own document, so retrieval is perfect.
    let baseline = &report.quality[0];
    assert_relative_eq!(baseline.metrics["recall@1"], 1.0);
    assert_relative_eq!(baseline.metrics["ndcg@10"], 1.0);

    // Adjacent pairs come first (3 of them), then reference pairs (3).
    assert_eq!(report.dynamics.len(), 2 * (SWEEP_EPS.len() - 1));
    for entry in report.dynamics.iter().take(SWEEP_EPS.len() - 1) {
        assert_eq!(entry.policy, PairingPolicy::Adjacent);
    }
    for entry in report.dynamics.iter().skip(SWEEP_EPS.len() - 1) {
        assert_eq!(entry.policy, PairingPolicy::Reference(0.0));
        assert_eq!(entry.from.eps, 0.0);
    }
    for entry in &report.dynamics {
        assert_eq!(entry.record.queries_compared, queries.nitems);
        assert_eq!(entry.record.queries_excluded, 0);
        assert!((0.0..=1.0).contains(&entry.record.mean_overlap));
    }
    assert_eq!(sink.dynamics.len(), report.dynamics.len());
}

#[test]
fn sweep_is_deterministic() {
    let corpus = unit_block("d", 10, 12, 19);
    let queries = echo_queries(&corpus, 4);
    let judgments = gold_judgments(4);
    let config = fixture_config();

    let mut first = MemorySink::default();
    let mut second = MemorySink::default();
    run_sweep(&corpus, &queries, &judgments, &config, &mut first).unwrap();
    run_sweep(&corpus, &queries, &judgments, &config, &mut second).unwrap();

    assert_eq!(first.rankings, second.rankings);
    assert_eq!(first.quality, second.quality);
    assert_eq!(first.dynamics, second.dynamics);
}

#[test]
fn empty_eps_list_is_an_error() {
    let corpus = unit_block("d", 5, 8, 3);
    let queries = echo_queries(&corpus, 2);
    let judgments = gold_judgments(2);
    let config = SweepConfig {
        eps_list: Vec::new(),
        ..fixture_config()
    };

    let mut sink = MemorySink::default();
    assert!(matches!(
        run_sweep(&corpus, &queries, &judgments, &config, &mut sink).unwrap_err(),
        RankGuardError::EmptyInput("eps list")
    ));
}

#[test]
fn duplicate_eps_is_an_error() {
    // Two sweep points with the same eps would share a label, so a file
    // sink would overwrite the first ranking and a Reference baseline
    // would be ambiguous.
    let corpus = unit_block("d", 5, 8, 3);
    let queries = echo_queries(&corpus, 2);
    let judgments = gold_judgments(2);
    let config = SweepConfig {
        eps_list: vec![0.0, 2.0, 2.0],
        ..fixture_config()
    };

    let mut sink = MemorySink::default();
    assert!(matches!(
        run_sweep(&corpus, &queries, &judgments, &config, &mut sink).unwrap_err(),
        RankGuardError::InvalidParameter(_)
    ));
    assert!(sink.rankings.is_empty(), "nothing may persist on abort");
}

#[test]
fn unknown_reference_eps_is_an_error() {
    let corpus = unit_block("d", 5, 8, 3);
    let queries = echo_queries(&corpus, 2);
    let judgments = gold_judgments(2);
    let config = SweepConfig {
        pairings: vec![PairingPolicy::Reference(99.0)],
        ..fixture_config()
    };

    let mut sink = MemorySink::default();
    assert!(matches!(
        run_sweep(&corpus, &queries, &judgments, &config, &mut sink).unwrap_err(),
        RankGuardError::InvalidParameter(_)
    ));
}

struct FailingSink;

impl RankingSink for FailingSink {
    fn persist_ranking(&mut self, _point: SweepPoint, _ranking: &Ranking) -> crate::error::Result<()> {
        Err(RankGuardError::PersistenceFailure("disk full".into()))
    }

    fn persist_quality(
        &mut self,
        _report: &crate::core::QualityReport,
    ) -> crate::error::Result<()> {
        Ok(())
    }

    fn persist_dynamics(&mut self, _entry: &DynamicsEntry) -> crate::error::Result<()> {
        Ok(())
    }
}

#[test]
fn sink_failure_aborts_the_sweep() {
    let corpus = unit_block("d", 8, 8, 5);
    let queries = echo_queries(&corpus, 3);
    let judgments = gold_judgments(3);
    let config = fixture_config();

    let mut sink = FailingSink;
    assert!(matches!(
        run_sweep(&corpus, &queries, &judgments, &config, &mut sink).unwrap_err(),
        RankGuardError::PersistenceFailure(_)
    ));
}

#[test]
fn jsonl_sink_writes_retrievable_artifacts() {
    init_logging();
    let corpus = unit_block("d", 8, 8, 13);
    let queries = echo_queries(&corpus, 3);
    let judgments = gold_judgments(3);
    let config = SweepConfig {
        eps_list: vec![0.0, 2.0],
        recall_ks: vec![1],
        pairings: vec![PairingPolicy::Adjacent],
        ..fixture_config()
    };

    let dir = tempfile::tempdir().unwrap();
    let mut sink = JsonlSink::new(dir.path()).unwrap();
    let report = run_sweep(&corpus, &queries, &judgments, &config, &mut sink).unwrap();

    for row in &report.quality {
        let path = sink.ranking_path(row.point);
        assert!(path.exists(), "missing ranking file {path:?}");
        let body = std::fs::read_to_string(&path).unwrap();
        assert_eq!(body.lines().count(), queries.nitems);
        // Every line is a valid {query_id, doc_ids} row.
        for line in body.lines() {
            let parsed: serde_json::Value = serde_json::from_str(line).unwrap();
            assert!(parsed["query_id"].is_string());
            assert_eq!(parsed["doc_ids"].as_array().unwrap().len(), SEARCH_K);
        }
    }

    let quality = std::fs::read_to_string(dir.path().join("quality.jsonl")).unwrap();
    assert_eq!(quality.lines().count(), 2);

    let dynamics = std::fs::read_to_string(dir.path().join("dynamics.jsonl")).unwrap();
    assert_eq!(dynamics.lines().count(), 1);
    let entry: DynamicsEntry = serde_json::from_str(dynamics.lines().next().unwrap()).unwrap();
    assert_eq!(entry.policy, PairingPolicy::Adjacent);
    assert_eq!(entry.from.eps, 0.0);
    assert_eq!(entry.to.eps, 2.0);

    // No temp files left behind.
    for f in std::fs::read_dir(dir.path()).unwrap() {
        let name = f.unwrap().file_name();
        assert!(
            !name.to_string_lossy().ends_with(".tmp"),
            "stale temp file {name:?}"
        );
    }
}
