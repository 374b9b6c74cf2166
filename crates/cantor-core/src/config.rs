//! Run configuration.
//!
//! Everything that used to be implicit global state (sample rate, random
//! source, execution strategy) is threaded through a run via [`RenderConfig`].

use crate::{Error, Result};

/// Configuration for one resynthesis run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct RenderConfig {
    /// Sample rate of pieces and output in Hz (default: 44100.0)
    pub sample_rate: f32,
    /// Seed of the random-phase source (default: 0)
    pub seed: u64,
    /// Dispatch jobs on the rayon pool instead of the calling thread (default: true)
    pub parallel: bool,
    /// Dedicated worker count; `None` uses rayon's global pool (default: None)
    pub num_threads: Option<usize>,
    /// Pitch-track values at or below this (Hz) fall back to the piece key (default: 55.0)
    pub min_tracked_freq: f32,
    /// Periodicity threshold for the voiced-extent lag search (default: 0.15)
    pub periodicity_threshold: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100.0,
            seed: 0,
            parallel: true,
            num_threads: None,
            min_tracked_freq: 55.0,
            periodicity_threshold: 0.15,
        }
    }
}

impl RenderConfig {
    pub fn validate(&self) -> Result<()> {
        if !(8000.0..=384000.0).contains(&self.sample_rate) {
            return Err(Error::InvalidConfig(format!(
                "sample_rate {} out of range (8000-384000 Hz)",
                self.sample_rate
            )));
        }
        if self.num_threads == Some(0) {
            return Err(Error::InvalidConfig(
                "num_threads must be at least 1".into(),
            ));
        }
        if !self.min_tracked_freq.is_finite() || self.min_tracked_freq < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "min_tracked_freq {} must be a non-negative frequency",
                self.min_tracked_freq
            )));
        }
        Ok(())
    }

    /// Periodicity threshold clamped to the usable range (0.01 - 0.5).
    pub fn threshold(&self) -> f32 {
        self.periodicity_threshold.clamp(0.01, 0.5)
    }

    /// Convert milliseconds to (fractional) samples.
    #[inline]
    pub fn ms_to_samples(&self, ms: f32) -> f32 {
        ms * 0.001 * self.sample_rate
    }

    /// Convert a sample index to milliseconds.
    #[inline]
    pub fn samples_to_ms(&self, samples: f32) -> f32 {
        samples / self.sample_rate * 1000.0
    }
}
