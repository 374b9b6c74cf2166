//! # Cantor Core
//!
//! Shared foundation of the cantor voice resynthesis engine:
//!
//! - **Descriptor**: pieces, alignment maps, pitch tracks and the global
//!   control-point timelines of a sentence
//! - **Config**: [`RenderConfig`], the explicit per-run state (sample rate,
//!   seed, execution strategy)
//! - **Device**: flat and ragged device arrays, explicit transfers, and the
//!   [`Executor`] that runs a batch of independent jobs
//! - **Timeline**: forward-cursor piecewise-linear lookups
//! - **Spectrum**: analysis/synthesis window and FFT plans
//! - **Rng**: the seeded random-phase source

pub mod config;
pub mod descriptor;
pub mod device;
pub mod error;
pub mod rng;
pub mod spectrum;
pub mod timeline;

pub use config::RenderConfig;
pub use descriptor::{
    AlignmentPoint, ControlPoint, Piece, PitchTrack, SentenceDescriptor, VoicingClass,
};
pub use device::{
    flatten, Backend, Device, DeviceArray, Executor, RaggedArray, RayonPool, Sequential, Span,
    TransferStats,
};
pub use error::{Error, Result};
pub use spectrum::{next_pow2, sinwin, FftPair};
pub use timeline::{lerp, Cursor, Timeline};

// Re-export for downstream crates building FFT buffers
pub use rustfft::num_complex::Complex;
