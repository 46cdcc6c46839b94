//! Error types for glyphlearn-classify

use glyphlearn_core::ClassId;
use thiserror::Error;

/// Errors that can occur during classification and adaptation
#[derive(Debug, Error)]
pub enum ClassifyError {
    /// Core library error
    #[error("core error: {0}")]
    Core(#[from] glyphlearn_core::Error),

    /// Class id outside the working alphabet
    #[error("invalid class id {class_id}: alphabet has {num_classes} classes")]
    InvalidClassId { class_id: ClassId, num_classes: usize },

    /// Invalid parameter provided
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Blob rejected before matching (no features, or implausibly many)
    #[error("input rejected: {num_features} features")]
    InputRejected { num_features: usize },

    /// Config or proto capacity of a class is exhausted
    #[error("capacity exhausted for class {class_id}: {what}")]
    CapacityExhausted { class_id: ClassId, what: &'static str },

    /// An optional resource required by the operation is not loaded
    #[error("missing resource: {0}")]
    MissingResource(&'static str),

    /// Template (de)serialization failed
    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// I/O error while persisting templates
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for classification operations
pub type ClassifyResult<T> = Result<T, ClassifyError>;
