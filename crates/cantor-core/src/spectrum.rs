//! Window and transform helpers shared by analysis and synthesis.

use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

/// Square-root Hann window of half-width `w`, centred on 0.
///
/// `sinwin(n, w)² + sinwin(n - w, w)² = 1` for `0 <= n <= w`, so an
/// analysis/synthesis pair overlap-adds to unity at hop `w`.
#[inline]
pub fn sinwin(n: f32, w: f32) -> f32 {
    if w <= 0.0 || n.abs() >= w {
        0.0
    } else {
        (std::f32::consts::FRAC_PI_2 * n / w).cos()
    }
}

/// Smallest power of two `>= n` (1 for 0).
#[inline]
pub fn next_pow2(n: usize) -> usize {
    n.max(1).next_power_of_two()
}

/// Forward and inverse plans of one size.
#[derive(Clone)]
pub struct FftPair {
    pub forward: Arc<dyn Fft<f32>>,
    pub inverse: Arc<dyn Fft<f32>>,
}

impl FftPair {
    pub fn new(len: usize) -> Self {
        let mut planner = FftPlanner::new();
        Self {
            forward: planner.plan_fft_forward(len),
            inverse: planner.plan_fft_inverse(len),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.forward.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.forward.len() == 0
    }

    /// Zero-filled work buffer of the plan's length.
    pub fn buffer(&self) -> Vec<Complex<f32>> {
        vec![Complex::new(0.0, 0.0); self.len()]
    }
}

impl std::fmt::Debug for FftPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FftPair").field("len", &self.len()).finish()
    }
}
