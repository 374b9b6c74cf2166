//! Error types for cantor-analysis.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Piece {piece} yields no pitch periods")]
    EmptyPeriodList { piece: usize },

    #[error("Core: {0}")]
    Core(#[from] cantor_core::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
