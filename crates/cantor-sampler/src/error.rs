//! Error types for cantor-sampler.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid frequency map: {0}")]
    InvalidFrequencyMap(String),

    #[error("Invalid segment bounds: {0}")]
    InvalidSegmentBounds(String),

    #[error("One-shot sample has no frames")]
    EmptyOneShot,

    #[error("Core: {0}")]
    Core(#[from] cantor_core::Error),

    #[error("Analysis: {0}")]
    Analysis(#[from] cantor_analysis::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
