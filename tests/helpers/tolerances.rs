//! Tolerance constants for resynthesis testing.
//!
//! Different checks require different precision levels.

/// Floating point rounding errors (for passthrough, exact gain).
/// Use for operations that should be mathematically exact.
pub const FLOAT_EPSILON: f32 = 1e-6;

/// Relative RMS tolerance for resynthesized tones.
/// Window sidelobes and noise residue keep the level within 10%.
pub const LEVEL_TOLERANCE: f32 = 0.1;

/// Largest DC offset of a resynthesized zero-mean tone.
pub const MEAN_TOLERANCE: f32 = 0.05;

/// Silence threshold (~-80dB).
/// Values below this are considered silent.
pub const SILENCE_THRESHOLD: f32 = 0.0001;

/// Largest sample-to-sample jump of a clean tone at the test pitches.
/// A 440 Hz unit sine moves at most ~0.063 per sample at 44.1 kHz.
pub const CONTINUITY_STEP: f32 = 0.2;
