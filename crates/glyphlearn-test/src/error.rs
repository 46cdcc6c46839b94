//! Error types for the test helpers

use thiserror::Error;

/// Errors that can occur while building test fixtures
#[derive(Debug, Error)]
pub enum TestError {
    /// A fixture could not be built from the given geometry
    #[error("invalid fixture '{name}': {message}")]
    InvalidFixture { name: String, message: String },
}

/// Result type for test helper operations
pub type TestResult<T> = Result<T, TestError>;
