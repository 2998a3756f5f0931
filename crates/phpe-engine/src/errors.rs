use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result alias used across the bridge
pub type Result<T, E = EngineError> = std::result::Result<T, E>;

/// Errors that can occur during bridge operations
///
/// A non-zero exit code from a guest script is NOT represented here: it is
/// ordinary result data carried by [`crate::ExecutionResult`]. These variants
/// cover failures of the bridge itself and of the native engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Native engine bring-up failed. Cached by the lifecycle manager and
    /// re-surfaced on every subsequent acquire attempt.
    #[error("PHP engine initialization failed: {0}")]
    InitializationFailed(String),

    /// File-execution target could not be resolved or does not exist
    #[error("PHP script not found: {0}")]
    ScriptNotFound(PathBuf),

    /// The native engine itself faulted, as opposed to a guest script
    /// exiting non-zero
    #[error("PHP execution failed: {0}")]
    ExecutionFailed(String),

    /// Request construction or input marshalling violated a precondition
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Structured decode was attempted on empty stdout
    #[error("empty output from PHP script")]
    EmptyOutput,

    /// stdout was captured but is not valid JSON
    #[error("failed to decode script output as JSON: {0}")]
    Decode(String),

    /// IO error outside the cases above
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_diagnostic_detail() {
        let err = EngineError::ScriptNotFound(PathBuf::from("missing.php"));
        assert_eq!(err.to_string(), "PHP script not found: missing.php");

        let err = EngineError::InvalidInput("empty PHP code".to_string());
        assert_eq!(err.to_string(), "invalid input: empty PHP code");
    }
}
