//! Engine lifecycle and execution orchestration
//!
//! The embedded interpreter is a process-wide singleton: stateful, not
//! thread-safe, and impossible to tear down cleanly. This module owns it. It
//! is initialized lazily on the first [`Engine::acquire`], a failed bring-up
//! is cached and re-surfaced forever (a broken native engine does not heal by
//! retrying), and every execution holds a mutex for the full native call so
//! no two executions are ever in flight at once.

use crate::embed::EmbedSapi;
use crate::errors::{EngineError, Result};
use crate::request::{resolve_script, ExecutionRequest, Source, Stdin};
use crate::resource::ScriptResource;
use crate::result::ExecutionResult;
use crate::sapi::Sapi;
use once_cell::sync::OnceCell;
use phpe_config::{lib_paths, Config};
use serde::Serialize;
use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

/// Environment variable naming the embed bridge library directly
pub const ENGINE_LIB_ENV: &str = "PHPE_ENGINE_LIB";

/// Global engine singleton; holds the sticky initialization outcome
static ENGINE: OnceCell<std::result::Result<Engine, EngineError>> = OnceCell::new();

/// Handle to the embedded PHP interpreter
///
/// The process-wide instance comes from [`Engine::acquire`]. Embedding hosts
/// that bring their own adapter (and tests, which need an instrumentable
/// stub) construct non-singleton engines with [`Engine::new`]; the
/// serialization guarantee holds per engine either way.
pub struct Engine {
    sapi: Mutex<Box<dyn Sapi>>,
    default_ini: BTreeMap<String, String>,
}

impl Engine {
    /// Get or initialize the engine singleton.
    ///
    /// Initialization is attempted at most once per process. If it fails,
    /// the failure is cached and every later call returns
    /// [`EngineError::InitializationFailed`] with the original detail.
    pub fn acquire() -> Result<&'static Engine> {
        acquire_in(&ENGINE, Self::initialize)
    }

    /// Wrap an adapter in a non-singleton engine.
    pub fn new(sapi: Box<dyn Sapi>) -> Self {
        Self {
            sapi: Mutex::new(sapi),
            default_ini: BTreeMap::new(),
        }
    }

    /// Wrap an adapter, applying `default_ini` to every execution unless a
    /// request overrides individual keys.
    pub fn with_default_ini(sapi: Box<dyn Sapi>, default_ini: BTreeMap<String, String>) -> Self {
        Self {
            sapi: Mutex::new(sapi),
            default_ini,
        }
    }

    /// Bring up the native engine: advisory config, library discovery, dlopen.
    fn initialize() -> std::result::Result<Engine, EngineError> {
        let config = match Config::load() {
            Ok(config) => config,
            Err(e) => {
                // The config store is advisory; a broken file must not brick
                // the engine.
                warn!("ignoring unreadable config: {}", e);
                Config::default()
            }
        };

        let lib_path = locate_engine_library(&config).ok_or_else(|| {
            EngineError::InitializationFailed(format!(
                "no PHP embed bridge library found; set engine-library in {} or {}",
                Config::path().display(),
                ENGINE_LIB_ENV
            ))
        })?;

        let sapi = EmbedSapi::load(&lib_path)?;
        debug!(library = %lib_path.display(), "PHP engine initialized");

        Ok(Engine::with_default_ini(Box::new(sapi), config.ini))
    }

    /// Execute a request and capture its result.
    ///
    /// Holds the engine lock for the entire native call: concurrent callers
    /// queue and run one at a time, and each result contains only the bytes
    /// of its own execution. A non-zero guest exit code is an `Ok` result;
    /// [`EngineError::ExecutionFailed`] means the engine itself faulted.
    /// Nothing is retried: a partially executed script may have mutated
    /// engine-global state, so retry policy belongs to the caller.
    pub fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionResult> {
        // Marshal and validate before touching the interpreter, so input
        // defects never cost an engine invocation.
        let stdin = request.stdin_input().to_bytes()?;
        let ini = self.merged_ini(request.ini_settings());

        match request.source() {
            Source::Inline(code) => {
                let mut sapi = self.lock()?;
                let raw = sapi.execute_inline(code, stdin.as_deref(), &ini)?;
                Ok(ExecutionResult::from_raw(raw))
            }
            Source::File(path) => {
                let script = resolve_script(path)?;
                let mut sapi = self.lock()?;
                let raw = sapi.execute_file(
                    &script,
                    request.argv(),
                    stdin.as_deref(),
                    request.env_vars(),
                    &ini,
                )?;
                Ok(ExecutionResult::from_raw(raw))
            }
        }
    }

    /// Run inline code with no stdin and default settings.
    pub fn run_inline(&self, code: &str) -> Result<ExecutionResult> {
        self.execute(&ExecutionRequest::inline(code)?)
    }

    /// Run a script file with no stdin and default settings.
    pub fn run_file(&self, path: impl Into<PathBuf>) -> Result<ExecutionResult> {
        self.execute(&ExecutionRequest::file(path)?)
    }

    /// Resolve and run a bundled script resource.
    pub fn run_resource(&self, resource: &ScriptResource) -> Result<ExecutionResult> {
        let path = resource.resolve()?;
        self.execute(&ExecutionRequest::file(path)?)
    }

    /// Serialize `input` to JSON, feed it to `code` on stdin, decode stdout.
    pub fn process_json<T: Serialize>(&self, input: &T, code: &str) -> Result<serde_json::Value> {
        let request = ExecutionRequest::inline(code)?.stdin(Stdin::serialize(input)?);
        self.execute(&request)?.json()
    }

    /// Feed text to `code` on stdin and return the captured stdout as text.
    pub fn process_text(&self, text: &str, code: &str) -> Result<String> {
        let request = ExecutionRequest::inline(code)?.stdin(Stdin::Text(text.to_string()));
        Ok(self.execute(&request)?.stdout().into_owned())
    }

    fn merged_ini(&self, overrides: &BTreeMap<String, String>) -> BTreeMap<String, String> {
        let mut merged = self.default_ini.clone();
        merged.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged
    }

    fn lock(&self) -> Result<MutexGuard<'_, Box<dyn Sapi>>> {
        // A panic during a native call leaves the interpreter in an unknown
        // state; surface that instead of pretending the engine is healthy.
        self.sapi.lock().map_err(|_| {
            EngineError::ExecutionFailed(
                "interpreter lock poisoned by a previous execution".to_string(),
            )
        })
    }
}

/// Lookup order: config override, then `PHPE_ENGINE_LIB`, then probing near a
/// `php` executable on PATH.
fn locate_engine_library(config: &Config) -> Option<PathBuf> {
    if let Some(path) = &config.engine_library {
        return Some(path.clone());
    }
    if let Some(path) = env::var_os(ENGINE_LIB_ENV) {
        return Some(PathBuf::from(path));
    }
    lib_paths::discover_engine_library()
}

/// Singleton access with sticky failure, factored over the cell so the state
/// machine is testable without touching the process-wide instance.
fn acquire_in<F>(
    cell: &OnceCell<std::result::Result<Engine, EngineError>>,
    init: F,
) -> Result<&Engine>
where
    F: FnOnce() -> std::result::Result<Engine, EngineError>,
{
    match cell.get_or_init(init) {
        Ok(engine) => Ok(engine),
        Err(EngineError::InitializationFailed(detail)) => {
            Err(EngineError::InitializationFailed(detail.clone()))
        }
        Err(other) => Err(EngineError::InitializationFailed(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sapi::RawOutput;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct EchoIniSapi;

    impl Sapi for EchoIniSapi {
        fn execute_inline(
            &mut self,
            _code: &str,
            _stdin: Option<&[u8]>,
            ini: &BTreeMap<String, String>,
        ) -> Result<RawOutput> {
            let rendered: Vec<String> = ini.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
            Ok(RawOutput {
                exit_code: 0,
                stdout: rendered.join("\n").into_bytes(),
                stderr: Vec::new(),
            })
        }

        fn execute_file(
            &mut self,
            _path: &Path,
            _argv: &[String],
            _stdin: Option<&[u8]>,
            _env: &BTreeMap<String, String>,
            _ini: &BTreeMap<String, String>,
        ) -> Result<RawOutput> {
            Ok(RawOutput::default())
        }
    }

    struct PanickingSapi;

    impl Sapi for PanickingSapi {
        fn execute_inline(
            &mut self,
            _code: &str,
            _stdin: Option<&[u8]>,
            _ini: &BTreeMap<String, String>,
        ) -> Result<RawOutput> {
            panic!("native crash stand-in");
        }

        fn execute_file(
            &mut self,
            _path: &Path,
            _argv: &[String],
            _stdin: Option<&[u8]>,
            _env: &BTreeMap<String, String>,
            _ini: &BTreeMap<String, String>,
        ) -> Result<RawOutput> {
            panic!("native crash stand-in");
        }
    }

    #[test]
    fn failed_initialization_is_sticky_and_not_retried() {
        let cell: OnceCell<std::result::Result<Engine, EngineError>> = OnceCell::new();
        let attempts = AtomicUsize::new(0);

        for _ in 0..3 {
            let outcome = acquire_in(&cell, || {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(EngineError::InitializationFailed(
                    "libphp missing".to_string(),
                ))
            });
            match outcome {
                Err(EngineError::InitializationFailed(detail)) => {
                    assert_eq!(detail, "libphp missing");
                }
                other => panic!("expected InitializationFailed, got {:?}", other.map(|_| ())),
            }
        }

        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn successful_initialization_returns_the_same_engine() {
        let cell: OnceCell<std::result::Result<Engine, EngineError>> = OnceCell::new();
        let first = acquire_in(&cell, || Ok(Engine::new(Box::new(EchoIniSapi)))).unwrap();
        let second = acquire_in(&cell, || {
            panic!("initializer must not run twice");
        })
        .unwrap();
        assert!(std::ptr::eq(first, second));
    }

    #[test]
    fn request_ini_overrides_engine_defaults() {
        let mut defaults = BTreeMap::new();
        defaults.insert("memory_limit".to_string(), "16M".to_string());
        defaults.insert("display_errors".to_string(), "0".to_string());
        let engine = Engine::with_default_ini(Box::new(EchoIniSapi), defaults);

        let request = ExecutionRequest::inline("echo 1;")
            .unwrap()
            .ini("memory_limit", "64M");
        let result = engine.execute(&request).unwrap();

        assert_eq!(result.stdout(), "display_errors=0\nmemory_limit=64M");
    }

    #[test]
    fn poisoned_lock_surfaces_as_execution_failed() {
        let engine = std::sync::Arc::new(Engine::new(Box::new(PanickingSapi)));

        let poisoner = std::sync::Arc::clone(&engine);
        let handle = std::thread::spawn(move || {
            let _ = poisoner.run_inline("echo 'boom';");
        });
        assert!(handle.join().is_err());

        match engine.run_inline("echo 'after';") {
            Err(EngineError::ExecutionFailed(detail)) => {
                assert!(detail.contains("poisoned"));
            }
            other => panic!("expected ExecutionFailed, got {:?}", other.map(|_| ())),
        }
    }
}
