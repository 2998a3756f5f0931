//! Native engine adapter seam
//!
//! The interpreter is reached through the [`Sapi`] trait so the lifecycle
//! manager never depends on how the native side is wired. Production uses
//! [`crate::embed::EmbedSapi`]; embedding hosts and tests may substitute
//! their own adapter via [`crate::Engine::new`].

use crate::errors::Result;
use std::collections::BTreeMap;
use std::path::Path;

/// Raw output captured from one native execution
#[derive(Debug, Clone, Default)]
pub struct RawOutput {
    /// Guest exit code; 0 conventionally denotes success
    pub exit_code: i32,
    /// Captured stdout bytes, exactly as the engine produced them
    pub stdout: Vec<u8>,
    /// Captured stderr bytes
    pub stderr: Vec<u8>,
}

/// Adapter over the embedded PHP interpreter
///
/// The interpreter behind an implementation is assumed stateful and
/// non-reentrant; both entry points take `&mut self` so exclusive access is
/// part of the contract rather than a convention. The lifecycle manager
/// serializes all calls on top of that.
///
/// Errors returned here are engine faults. A script that runs to completion
/// with a non-zero exit code is a successful call carrying that code in
/// [`RawOutput`].
pub trait Sapi: Send {
    /// Execute inline code with optional stdin bytes and ini overrides.
    fn execute_inline(
        &mut self,
        code: &str,
        stdin: Option<&[u8]>,
        ini: &BTreeMap<String, String>,
    ) -> Result<RawOutput>;

    /// Execute a script file with argv, optional stdin bytes, environment
    /// overlay, and ini overrides. The path has already been resolved and
    /// checked for existence by the orchestration layer.
    fn execute_file(
        &mut self,
        path: &Path,
        argv: &[String],
        stdin: Option<&[u8]>,
        env: &BTreeMap<String, String>,
        ini: &BTreeMap<String, String>,
    ) -> Result<RawOutput>;
}
