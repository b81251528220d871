//! Analysis error types.

use thiserror::Error;

/// Errors that can occur when starting an analysis run.
///
/// Noisy or missing data is never an error; it is recovered locally and
/// recorded in the audit log.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for analysis operations.
pub type AnalysisResult<T> = Result<T, AnalysisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_error() {
        let err = AnalysisError::InvalidInput("Body weight must be positive".to_string());
        assert!(err.to_string().contains("Body weight must be positive"));
    }
}
