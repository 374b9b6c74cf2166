//! Builder for configuring and constructing a `SentenceEngine`.

use cantor_core::RenderConfig;

use crate::{Result, SentenceEngine};

/// Every setting has a default; `build()` validates the result and sets up
/// the execution backend.
///
/// # Example
///
/// ```ignore
/// use cantor::prelude::*;
///
/// let engine = SentenceEngine::builder()
///     .sample_rate(48000.0)
///     .seed(7)
///     .num_threads(4)
///     .build()?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct SentenceEngineBuilder {
    config: RenderConfig,
}

impl SentenceEngineBuilder {
    /// Start from an existing configuration.
    pub fn from_config(config: RenderConfig) -> Self {
        Self { config }
    }

    /// Default: 44100.0
    pub fn sample_rate(mut self, rate: f32) -> Self {
        self.config.sample_rate = rate;
        self
    }

    /// Seed of the random noise phases. Default: 0
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    /// Run jobs on the rayon backend. Default: true
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.config.parallel = parallel;
        self
    }

    /// Dedicated worker pool size. Default: rayon's global pool
    pub fn num_threads(mut self, threads: usize) -> Self {
        self.config.num_threads = Some(threads);
        self
    }

    /// Pitch-track values at or below this (Hz) fall back to the piece key.
    /// Default: 55.0
    pub fn min_tracked_freq(mut self, freq: f32) -> Self {
        self.config.min_tracked_freq = freq;
        self
    }

    /// Default: 0.15
    pub fn periodicity_threshold(mut self, threshold: f32) -> Self {
        self.config.periodicity_threshold = threshold;
        self
    }

    pub fn build(self) -> Result<SentenceEngine> {
        SentenceEngine::new(self.config)
    }
}
