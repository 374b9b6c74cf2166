//! Centralized error type for the cantor umbrella crate.
//!
//! Wraps all subsystem errors so `?` propagates naturally across crate boundaries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] cantor_core::Error),

    #[error("Analysis: {0}")]
    Analysis(#[from] cantor_analysis::Error),

    #[error("Sampler: {0}")]
    Sampler(#[from] cantor_sampler::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
