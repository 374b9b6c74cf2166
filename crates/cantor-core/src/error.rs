//! Error types for cantor-core.

use thiserror::Error;

/// Error type for cantor-core operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Invalid piece {piece}: {reason}")]
    InvalidPiece { piece: usize, reason: String },

    #[error("Piece {piece}: alignment {axis} time decreases at point {point} ({from} ms -> {to} ms)")]
    UnorderedAlignment {
        piece: usize,
        point: usize,
        axis: &'static str,
        from: f32,
        to: f32,
    },

    #[error("Invalid frequency map: {0}")]
    InvalidFrequencyMap(String),

    #[error("Invalid timeline: {0}")]
    InvalidTimeline(String),

    #[error("Transfer size mismatch: device holds {expected} items, host supplied {actual}")]
    TransferSizeMismatch { expected: usize, actual: usize },

    #[error("Thread pool: {0}")]
    ThreadPool(String),
}

/// Result type alias.
pub type Result<T> = core::result::Result<T, Error>;
