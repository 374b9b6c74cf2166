//! # Cantor - Singing-Voice Resynthesis Engine
//!
//! Renders a continuous vocal line from recorded voice pieces, following a
//! target pitch curve, a duration mapping, a phoneme-blend timeline and a
//! volume envelope. Whole-utterance batch rendering, not streaming.
//!
//! ## Architecture
//!
//! Cantor is an umbrella crate that coordinates:
//! - **cantor-core** - Descriptors, run config, device buffers and job executor
//! - **cantor-analysis** - Source periods, voicing search, harmonic/noise analysis
//! - **cantor-sampler** - Time warp, parallel resynthesis, mixing, one-shot sampler
//!
//! ## Quick Start
//!
//! ```ignore
//! use cantor::prelude::*;
//!
//! let engine = SentenceEngine::builder()
//!     .sample_rate(44100.0)
//!     .seed(42)
//!     .build()?;
//!
//! let out = engine.render_to_vec(&descriptor, 44100)?;
//! ```
//!
//! ## Feature Flags
//!
//! - `serialization` - serde derives on descriptors, config and frequency maps

/// Re-export of cantor-core for direct access
pub use cantor_core as core;

/// Re-export of cantor-analysis for direct access
pub use cantor_analysis as analysis;

/// Re-export of cantor-sampler for direct access
pub use cantor_sampler as sampler;

// Descriptor types
pub use cantor_core::{
    AlignmentPoint, ControlPoint, Piece, PitchTrack, RenderConfig, SentenceDescriptor,
    TransferStats, VoicingClass,
};

// Frequency maps and the standalone sampler
pub use cantor_sampler::{
    render_one_shot, ControlPointMapper, FrequencyMap, FrequencyMapper, OneShotSample,
};

pub mod error;
pub use error::{Error, Result};

mod builder;
mod engine;

pub use builder::SentenceEngineBuilder;
pub use engine::SentenceEngine;

/// Convenience prelude for common imports
pub mod prelude {
    // Main engine
    pub use crate::{SentenceEngine, SentenceEngineBuilder};

    // Descriptor
    pub use crate::{
        AlignmentPoint, ControlPoint, Piece, PitchTrack, RenderConfig, SentenceDescriptor,
        VoicingClass,
    };

    // Frequency maps
    pub use crate::{FrequencyMap, FrequencyMapper};

    // One-shot sampler
    pub use crate::{render_one_shot, OneShotSample};
}
