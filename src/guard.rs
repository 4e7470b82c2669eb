//! Additive Gaussian noise guard for embedding matrices.
//!
//! The guard perturbs each coordinate of a corpus embedding block with an
//! independent zero-mean Gaussian sample of standard deviation `1/ε`. Lower
//! ε means larger noise, i.e. more privacy and less retrieval utility; this
//! inverse relationship is the behavior sweeps rely on. The noise model is
//! illustrative, not a certified differential-privacy mechanism.
//!
//! The generator is an explicitly seeded `ChaCha8Rng` owned by the call, so
//! the same `(shape, ε, seed)` always produces bit-identical noise and
//! parallel sweeps never contend on global RNG state.

use log::{debug, trace};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};

use crate::core::EmbeddingBlock;

/// Applies the noise guard to an embedding block.
///
/// For `eps <= 0.0` the input is returned unchanged (the no-privacy
/// baseline); this is an observable branch, not an error. For `eps > 0.0`
/// one N(0, (1/eps)²) sample per coordinate is added elementwise.
///
/// Pure function of `(embeddings, eps, seed)`; the input block is never
/// mutated.
///
/// # Examples
///
/// ```
/// use rankguard::core::EmbeddingBlock;
/// use rankguard::guard::guard;
///
/// let block = EmbeddingBlock::from_rows(
///     vec!["a".into(), "b".into()],
///     vec![vec![1.0, 0.0], vec![0.0, 1.0]],
/// ).unwrap();
///
/// let baseline = guard(&block, 0.0, 42);
/// assert_eq!(baseline, block);
///
/// let noisy = guard(&block, 2.0, 42);
/// assert_eq!(noisy.shape(), block.shape());
/// assert_ne!(noisy.data, block.data);
/// ```
pub fn guard(embeddings: &EmbeddingBlock, eps: f64, seed: u64) -> EmbeddingBlock {
    if eps <= 0.0 {
        debug!("guard: eps={eps} <= 0, identity baseline");
        return embeddings.clone();
    }

    let sigma = 1.0 / eps;
    debug!(
        "guard: eps={eps}, sigma={sigma:.6}, seed={seed}, shape={:?}",
        embeddings.shape()
    );

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut data = Vec::with_capacity(embeddings.data.len());
    for &value in &embeddings.data {
        let z: f64 = StandardNormal.sample(&mut rng);
        data.push(value + sigma * z);
    }

    trace!(
        "guard: perturbed {} coordinates across {} items",
        data.len(),
        embeddings.nitems
    );

    EmbeddingBlock {
        nitems: embeddings.nitems,
        ndims: embeddings.ndims,
        data,
        ids: embeddings.ids.clone(),
    }
}
