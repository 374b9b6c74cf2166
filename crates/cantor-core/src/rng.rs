//! Deterministic random-phase source.
//!
//! All randomness in a render comes from one PCG stream seeded by
//! [`RenderConfig::seed`](crate::RenderConfig::seed), drawn on the host
//! before synthesis is dispatched.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;

/// Creates the render's PCG64 generator.
pub fn create_rng(seed: u64) -> Pcg64 {
    Pcg64::seed_from_u64(seed)
}

/// `len` values in [0, 1); a value `r` stands for the phase `2πr`.
pub fn random_phases(seed: u64, len: usize) -> Vec<f32> {
    let mut rng = create_rng(seed);
    (0..len).map(|_| rng.gen::<f32>()).collect()
}
