//! Execution requests and stdin marshalling

use crate::errors::{EngineError, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// What to execute: inline code or a script file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// PHP source text executed directly
    Inline(String),
    /// Path to a script file, resolved and checked at execution time
    File(PathBuf),
}

/// Input handed to the guest script on stdin
#[derive(Debug, Clone, Default)]
pub enum Stdin {
    /// No stdin is supplied to the execution call
    #[default]
    None,
    /// UTF-8 text
    Text(String),
    /// Raw bytes, passed through unchanged
    Bytes(Vec<u8>),
    /// A JSON value, serialized for scripts that parse stdin as JSON
    Json(serde_json::Value),
}

impl Stdin {
    /// Serialize an arbitrary host value for a JSON-consuming script.
    ///
    /// Serialization failure is reported as [`EngineError::InvalidInput`];
    /// it is never degraded into "no input", which a guest script could not
    /// tell apart from an intentionally empty payload.
    pub fn serialize<T: Serialize>(value: &T) -> Result<Self> {
        let bytes = serde_json::to_vec(value)
            .map_err(|e| EngineError::InvalidInput(format!("stdin serialization failed: {}", e)))?;
        Ok(Stdin::Bytes(bytes))
    }

    /// Marshal into the byte buffer the native adapter consumes.
    pub fn to_bytes(&self) -> Result<Option<Vec<u8>>> {
        match self {
            Stdin::None => Ok(None),
            Stdin::Text(text) => Ok(Some(text.clone().into_bytes())),
            Stdin::Bytes(bytes) => Ok(Some(bytes.clone())),
            Stdin::Json(value) => {
                let bytes = serde_json::to_vec(value).map_err(|e| {
                    EngineError::InvalidInput(format!("stdin serialization failed: {}", e))
                })?;
                Ok(Some(bytes))
            }
        }
    }
}

/// One execution of guest code, bundled with its inputs
///
/// Built in the style of `std::process::Command`:
///
/// ```
/// use phpe_engine::{ExecutionRequest, Stdin};
///
/// let request = ExecutionRequest::inline("echo strtoupper(file_get_contents('php://stdin'));")?
///     .stdin(Stdin::Text("hello".to_string()))
///     .ini("memory_limit", "32M");
/// # Ok::<(), phpe_engine::EngineError>(())
/// ```
///
/// argv and env are only meaningful for file execution; for inline code they
/// are accepted but the embed adapter ignores them.
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    source: Source,
    stdin: Stdin,
    argv: Vec<String>,
    env: BTreeMap<String, String>,
    ini: BTreeMap<String, String>,
}

impl ExecutionRequest {
    /// Request executing inline code. Fails fast with
    /// [`EngineError::InvalidInput`] on empty code, before anything reaches
    /// the native layer.
    pub fn inline(code: impl Into<String>) -> Result<Self> {
        let code = code.into();
        if code.is_empty() {
            return Err(EngineError::InvalidInput("empty PHP code".to_string()));
        }
        Ok(Self::new(Source::Inline(code)))
    }

    /// Request executing a script file. Fails fast on an empty path; whether
    /// the file exists is checked at execution time.
    pub fn file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return Err(EngineError::InvalidInput(
                "empty PHP script path".to_string(),
            ));
        }
        Ok(Self::new(Source::File(path)))
    }

    fn new(source: Source) -> Self {
        Self {
            source,
            stdin: Stdin::None,
            argv: Vec::new(),
            env: BTreeMap::new(),
            ini: BTreeMap::new(),
        }
    }

    /// Supply stdin for the guest script
    pub fn stdin(mut self, stdin: Stdin) -> Self {
        self.stdin = stdin;
        self
    }

    /// Append one command-line argument (file execution only)
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.argv.push(arg.into());
        self
    }

    /// Append command-line arguments (file execution only)
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.argv.extend(args.into_iter().map(Into::into));
        self
    }

    /// Overlay one environment variable for the duration of the call
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Overlay environment variables for the duration of the call
    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Apply one ini setting before execution.
    ///
    /// ini settings are an engine-global side effect; they are not guaranteed
    /// to reset between calls.
    pub fn ini(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.ini.insert(key.into(), value.into());
        self
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    pub fn stdin_input(&self) -> &Stdin {
        &self.stdin
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    pub fn env_vars(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    pub fn ini_settings(&self) -> &BTreeMap<String, String> {
        &self.ini
    }
}

pub(crate) fn resolve_script(path: &Path) -> Result<PathBuf> {
    if !path.is_file() {
        return Err(EngineError::ScriptNotFound(path.to_path_buf()));
    }
    // Hand the native layer an absolute path; the engine may chdir internally.
    path.canonicalize()
        .map_err(|_| EngineError::ScriptNotFound(path.to_path_buf()))
}
