//! Captured execution results

use crate::errors::{EngineError, Result};
use crate::sapi::RawOutput;
use serde::de::DeserializeOwned;
use std::borrow::Cow;

/// Result of one guest execution
///
/// Immutable once constructed. A non-zero exit code is carried here as data;
/// it is the caller's signal to interpret, not a bridge error.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    exit_code: i32,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

impl ExecutionResult {
    pub(crate) fn from_raw(raw: RawOutput) -> Self {
        Self {
            exit_code: raw.exit_code,
            stdout: raw.stdout,
            stderr: raw.stderr,
        }
    }

    /// Guest exit code; 0 conventionally denotes success
    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }

    /// Whether the guest script exited cleanly
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Captured stdout, exactly as produced by the engine
    pub fn stdout_bytes(&self) -> &[u8] {
        &self.stdout
    }

    /// Captured stderr bytes
    pub fn stderr_bytes(&self) -> &[u8] {
        &self.stderr
    }

    /// stdout as text. Engine output is assumed UTF-8; malformed sequences
    /// are replaced rather than failing, so this accessor never errors.
    pub fn stdout(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stdout)
    }

    /// stderr as text, lossy like [`Self::stdout`]
    pub fn stderr(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stderr)
    }

    /// Decode stdout as a JSON value.
    ///
    /// A pure function of the captured bytes; calling it repeatedly yields
    /// the same answer and never mutates the result. Fails with
    /// [`EngineError::EmptyOutput`] when the script produced nothing, and
    /// [`EngineError::Decode`] when stdout is present but not valid JSON.
    pub fn json(&self) -> Result<serde_json::Value> {
        self.json_as()
    }

    /// Decode stdout as a typed value.
    pub fn json_as<T: DeserializeOwned>(&self) -> Result<T> {
        if self.stdout.is_empty() {
            return Err(EngineError::EmptyOutput);
        }
        serde_json::from_slice(&self.stdout).map_err(|e| EngineError::Decode(e.to_string()))
    }
}
