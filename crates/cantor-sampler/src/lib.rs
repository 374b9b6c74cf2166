//! Destination timeline, parallel resynthesis and output mixing.
//!
//! Turns the per-period models of `cantor-analysis` into an output waveform
//! that follows a target pitch curve.
//!
//! # Features
//!
//! - **Frequency map**: per-sample target pitch and segment boundaries via
//!   the [`FrequencyMapper`] trait
//! - **Time warp**: per-segment template clocks and the synthesis job layout
//! - **Synthesis**: pitch-synchronous overlap-add into paired accumulation
//!   buffers, one parallel batch
//! - **Mixer**: variable-width box decimation with the volume envelope
//! - **One-shot**: fixed-ratio resample-and-normalize sampler
//!
//! # Example
//!
//! ```ignore
//! use cantor_sampler::{build_segments, plan_jobs, synthesize, mix};
//!
//! let segments = build_segments(&map);
//! let plan = plan_jobs(&segments, &map, &analysis.table.pieces, &desc.piece_map, rate);
//! let template = synthesize(&device, &segments, &plan, &analysis, &phases)?;
//! mix(&device.download(&template), &segments, &map, &desc.volume_map, rate, &mut out);
//! ```

// Error types
pub mod error;
pub use error::{Error, Result};

pub mod frequency_map;
pub mod mixer;
pub mod oneshot;
pub mod synthesis;
pub mod warp;

pub use frequency_map::{ControlPointMapper, FrequencyMap, FrequencyMapper};
pub use mixer::mix;
pub use oneshot::{render_one_shot, OneShotSample};
pub use synthesis::{merge, synthesize, HarmonicLevel};
pub use warp::{build_segments, plan_jobs, Candidate, DestinationSegment, JobPlan, SynthesisJob};
