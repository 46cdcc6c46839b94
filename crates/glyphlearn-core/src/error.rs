//! Error types for glyphlearn-core
//!
//! Provides a unified error type for the shared data model. Table lookups
//! that can fail return one of these variants instead of panicking.

use thiserror::Error;

/// glyphlearn-core error type
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid parameter value
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Index out of bounds
    #[error("index out of bounds: {index} >= {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    /// Class text not present in the class table
    #[error("unknown class: '{0}'")]
    UnknownClass(String),

    /// Malformed character fragment text
    #[error("invalid fragment text: '{0}'")]
    InvalidFragment(String),
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, Error>;
