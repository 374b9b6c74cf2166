//! # Cantor Analysis
//!
//! Source analysis for the cantor voice resynthesis engine:
//!
//! - **Periods**: pitch-synchronous period lists from each piece's alignment
//!   map and pitch track
//! - **Voicing**: maximum voiced extent per period (YIN lag search) and its
//!   propagation across transitional periods
//! - **Spectral**: harmonic windows and noise spectra per period
//!
//! [`analyze_sources`] runs the three in order on a [`Device`](cantor_core::Device).

pub mod error;
pub mod periods;
pub mod source;
pub mod spectral;
pub mod voicing;

pub use error::{Error, Result};
pub use periods::{extract_all, extract_periods, source_range, PeriodRef, PeriodTable, SourcePeriod};
pub use source::{analyze_sources, SourceAnalysis};
pub use spectral::{analyze_spectra, decompose_period, PeriodSpectra, SpectralLayout};
pub use voicing::{propagate_extents, propagate_on_host, search_extents, voiced_extent};
