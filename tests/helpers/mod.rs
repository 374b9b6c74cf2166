//! Test helpers and fixtures for cantor integration tests
//!
//! ## Tolerance Levels
//!
//! Use the appropriate tolerance from [`tolerances`] module:
//! - `FLOAT_EPSILON` (1e-6): Exact operations (passthrough, unity gain)
//! - `LEVEL_TOLERANCE` (10%): Resynthesized tone level
//! - `MEAN_TOLERANCE` (0.05): DC offset of a resynthesized tone
//! - `SILENCE_THRESHOLD` (0.0001): Silence detection (-80dB)
//! - `CONTINUITY_STEP` (0.2): Largest clean sample-to-sample jump

#![allow(dead_code)]

pub mod tolerances;

use cantor::prelude::*;

/// Default test sample rate
pub const TEST_SAMPLE_RATE: f32 = 44100.0;

/// 100 ms at the test sample rate
pub const TEST_LEN: usize = 4410;

/// Pitch-track hop used by the fixtures
pub const TRACK_INTERVAL: usize = 256;

/// Route library logs to the test harness (`RUST_LOG` is not consulted).
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Create a sequential engine (bit-exact reference backend).
pub fn test_engine() -> SentenceEngine {
    init_tracing();
    SentenceEngine::builder()
        .sample_rate(TEST_SAMPLE_RATE)
        .parallel(false)
        .build()
        .expect("Failed to create test engine")
}

/// Create a rayon-backed engine with a dedicated pool.
pub fn parallel_engine(threads: usize) -> SentenceEngine {
    init_tracing();
    SentenceEngine::builder()
        .sample_rate(TEST_SAMPLE_RATE)
        .num_threads(threads)
        .build()
        .expect("Failed to create parallel engine")
}

/// Generate a test signal: sine wave at given frequency for specified samples.
pub fn generate_sine(frequency: f32, sample_rate: f32, num_samples: usize) -> Vec<f32> {
    (0..num_samples)
        .map(|i| {
            let t = i as f64 / sample_rate as f64;
            (2.0 * std::f64::consts::PI * frequency as f64 * t).sin() as f32
        })
        .collect()
}

/// Generate white noise (random samples in -1..1).
pub fn generate_noise(num_samples: usize, seed: u64) -> Vec<f32> {
    // Simple LCG for reproducible "random" noise
    let mut rng = seed;
    (0..num_samples)
        .map(|_| {
            rng = rng.wrapping_mul(6364136223846793005).wrapping_add(1);
            ((rng >> 33) as f32 / u32::MAX as f32) * 4.0 - 1.0
        })
        .collect()
}

/// Calculate RMS of a signal.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

/// Calculate peak amplitude of a signal.
pub fn peak(samples: &[f32]) -> f32 {
    samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max)
}

/// Middle 60% of a buffer, away from edge effects.
pub fn middle(samples: &[f32]) -> &[f32] {
    let lo = samples.len() / 5;
    let hi = samples.len() - lo;
    &samples[lo..hi]
}

/// Arithmetic mean of a signal.
pub fn mean(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().sum::<f32>() / samples.len() as f32
}

/// Count upward zero crossings.
pub fn rising_crossings(samples: &[f32]) -> usize {
    samples
        .windows(2)
        .filter(|w| w[0] < 0.0 && w[1] >= 0.0)
        .count()
}

/// One voiced piece with a flat pitch track and identity alignment.
pub fn tone_piece(wave: Vec<f32>, freq: f32, voicing: VoicingClass) -> Piece {
    let len = wave.len();
    let end_ms = len as f32 / TEST_SAMPLE_RATE * 1000.0;
    Piece {
        wave,
        pitch: PitchTrack::constant(freq, TRACK_INTERVAL, len),
        alignment: vec![
            AlignmentPoint::new(0.0, 0.0, voicing),
            AlignmentPoint::new(end_ms, end_ms, voicing),
        ],
    }
}

/// Single-piece sentence at a flat target pitch with unit volume.
pub fn tone_sentence(source_freq: f32, target_freq: f32, len: usize) -> SentenceDescriptor {
    let wave = generate_sine(source_freq, TEST_SAMPLE_RATE, len);
    SentenceDescriptor {
        pieces: vec![tone_piece(wave, source_freq, VoicingClass::Voiced)],
        piece_map: vec![ControlPoint::new(0.0, 0.0)],
        volume_map: vec![ControlPoint::new(0.0, 1.0)],
        freq_map: vec![ControlPoint::new(0.0, target_freq)],
    }
}
