use approx::assert_relative_eq;

use crate::guard::guard;
use crate::tests::test_data::unit_block;
use crate::tests::SWEEP_SEED;

#[test]
fn eps_zero_is_identity() {
    let block = unit_block("d", 10, 16, 3);
    let out = guard(&block, 0.0, SWEEP_SEED);
    assert_eq!(out, block);
}

#[test]
fn negative_eps_is_identity() {
    let block = unit_block("d", 4, 8, 3);
    let out = guard(&block, -1.5, SWEEP_SEED);
    assert_eq!(out, block);
}

#[test]
fn same_seed_same_noise() {
    let block = unit_block("d", 12, 24, 9);
    let a = guard(&block, 2.0, SWEEP_SEED);
    let b = guard(&block, 2.0, SWEEP_SEED);
    assert_eq!(a, b);
}

#[test]
fn different_seeds_differ() {
    let block = unit_block("d", 12, 24, 9);
    let a = guard(&block, 2.0, 1);
    let b = guard(&block, 2.0, 2);
    assert_ne!(a.data, b.data);
}

#[test]
fn input_block_untouched() {
    let block = unit_block("d", 6, 8, 11);
    let snapshot = block.clone();
    let _ = guard(&block, 0.5, SWEEP_SEED);
    assert_eq!(block, snapshot);
}

#[test]
fn shape_and_ids_preserved() {
    let block = unit_block("d", 7, 12, 5);
    let out = guard(&block, 4.0, SWEEP_SEED);
    assert_eq!(out.shape(), block.shape());
    assert_eq!(out.ids, block.ids);
}

#[test]
fn lower_eps_means_larger_noise() {
    // sigma = 1/eps: eps 0.5 -> sigma 2.0, eps 50 -> sigma 0.02. Over
    // 20 * 64 coordinates the mean absolute deviations are far apart.
    let block = unit_block("d", 20, 64, 17);
    let coarse = guard(&block, 0.5, SWEEP_SEED);
    let fine = guard(&block, 50.0, SWEEP_SEED);

    let mad = |noisy: &crate::core::EmbeddingBlock| {
        let total: f64 = noisy
            .data
            .iter()
            .zip(block.data.iter())
            .map(|(a, b)| (a - b).abs())
            .sum();
        total / block.data.len() as f64
    };
    let mad_coarse = mad(&coarse);
    let mad_fine = mad(&fine);
    assert!(
        mad_coarse > 10.0 * mad_fine,
        "expected much larger deviation at low eps: {mad_coarse} vs {mad_fine}"
    );
    // Same seed and shape, so the underlying standard-normal draws are the
    // same and the deviation ratio is exactly the sigma ratio.
    assert_relative_eq!(mad_coarse / mad_fine, 100.0, max_relative = 1e-9);
}
