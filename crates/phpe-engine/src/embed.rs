//! Production adapter over the PHP embed bridge library
//!
//! The embed bridge is a thin C wrapper around libphp's embed SAPI, loaded at
//! runtime with dlopen (Unix) or LoadLibrary (Windows). The library is kept
//! loaded for the lifetime of the process; libphp offers no reliable teardown
//! and the lifecycle manager never asks for one.
//!
//! All symbols are resolved and the engine is started during [`EmbedSapi::load`],
//! so every way the native side can be miswired surfaces as an
//! initialization failure instead of a mid-execution fault.

use crate::errors::{EngineError, Result};
use crate::sapi::{RawOutput, Sapi};
use std::collections::BTreeMap;
use std::ffi::{c_char, c_int, c_uchar, CString, OsString};
use std::path::{Path, PathBuf};
use tracing::debug;

/// (pointer, length) buffer owned by the native side until freed
#[repr(C)]
struct BridgeBuffer {
    data: *const c_char,
    len: usize,
}

/// Mirror of the bridge's result struct
#[repr(C)]
struct BridgeResult {
    exit_code: i32,
    stdout: BridgeBuffer,
    stderr: BridgeBuffer,
}

impl BridgeResult {
    const fn empty() -> Self {
        Self {
            exit_code: 0,
            stdout: BridgeBuffer {
                data: std::ptr::null(),
                len: 0,
            },
            stderr: BridgeBuffer {
                data: std::ptr::null(),
                len: 0,
            },
        }
    }
}

type StartupFn = unsafe extern "C" fn() -> c_int;
type ExecInlineFn = unsafe extern "C" fn(
    code: *const c_char,
    stdin: *const c_uchar,
    stdin_len: usize,
    ini: *const *const c_char,
    ini_len: usize,
    out: *mut BridgeResult,
) -> c_int;
type ExecFileFn = unsafe extern "C" fn(
    path: *const c_char,
    argv: *const *const c_char,
    argc: usize,
    stdin: *const c_uchar,
    stdin_len: usize,
    env: *const *const c_char,
    env_len: usize,
    ini: *const *const c_char,
    ini_len: usize,
    out: *mut BridgeResult,
) -> c_int;
type ResultFreeFn = unsafe extern "C" fn(out: *mut BridgeResult);

const SYM_STARTUP: &[u8] = b"php_embed_bridge_startup\0";
const SYM_EXEC_INLINE: &[u8] = b"php_embed_bridge_exec_inline\0";
const SYM_EXEC_FILE: &[u8] = b"php_embed_bridge_exec_file\0";
const SYM_RESULT_FREE: &[u8] = b"php_embed_bridge_result_free\0";

/// The embedded PHP engine reached through the dlopen'd bridge library
pub struct EmbedSapi {
    /// The loaded library - kept as a field to prevent early unload
    library: libloading::Library,
    path: PathBuf,
}

impl EmbedSapi {
    /// Load the embed bridge library and start the engine.
    ///
    /// On Unix the library is opened with RTLD_NOW | RTLD_GLOBAL so all
    /// libphp symbols resolve immediately and extensions loaded later can see
    /// them. On Windows standard LoadLibrary semantics apply.
    pub fn load(lib_path: &Path) -> Result<Self> {
        if !lib_path.exists() {
            return Err(EngineError::InitializationFailed(format!(
                "engine library not found: {}",
                lib_path.display()
            )));
        }

        debug!(path = %lib_path.display(), "loading PHP embed bridge library");

        let library = open_library(lib_path)?;
        let sapi = Self {
            library,
            path: lib_path.to_path_buf(),
        };

        // Resolve every symbol up front; a partially exported bridge is an
        // initialization failure, not a later execution surprise.
        sapi.symbol::<ExecInlineFn>(SYM_EXEC_INLINE)?;
        sapi.symbol::<ExecFileFn>(SYM_EXEC_FILE)?;
        sapi.symbol::<ResultFreeFn>(SYM_RESULT_FREE)?;

        let startup = sapi.symbol::<StartupFn>(SYM_STARTUP)?;
        let status = unsafe { startup() };
        if status != 0 {
            return Err(EngineError::InitializationFailed(format!(
                "php_embed_bridge_startup returned {}",
                status
            )));
        }

        debug!(path = %sapi.path.display(), "PHP engine started");
        Ok(sapi)
    }

    /// Path the library was loaded from
    pub fn library_path(&self) -> &Path {
        &self.path
    }

    fn symbol<T>(&self, name: &[u8]) -> Result<libloading::Symbol<'_, T>> {
        unsafe { self.library.get(name) }.map_err(|e| {
            EngineError::InitializationFailed(format!(
                "missing symbol {} in {}: {}",
                String::from_utf8_lossy(&name[..name.len() - 1]),
                self.path.display(),
                e
            ))
        })
    }

    /// Copy the native buffers into owned memory and release them.
    fn collect(&mut self, mut out: BridgeResult) -> Result<RawOutput> {
        let stdout = copy_buffer(&out.stdout);
        let stderr = copy_buffer(&out.stderr);
        let exit_code = out.exit_code;

        let free = self.symbol::<ResultFreeFn>(SYM_RESULT_FREE)?;
        unsafe { free(&mut out) };

        Ok(RawOutput {
            exit_code,
            stdout,
            stderr,
        })
    }
}

impl Sapi for EmbedSapi {
    fn execute_inline(
        &mut self,
        code: &str,
        stdin: Option<&[u8]>,
        ini: &BTreeMap<String, String>,
    ) -> Result<RawOutput> {
        let code_c = c_string(code, "code")?;
        let ini_c = keyval_strings(ini, "ini setting")?;
        let ini_ptrs = ptr_array(&ini_c);
        let (stdin_ptr, stdin_len) = stdin_parts(stdin);

        let mut out = BridgeResult::empty();
        let status = {
            let exec = self.symbol::<ExecInlineFn>(SYM_EXEC_INLINE)?;
            unsafe {
                exec(
                    code_c.as_ptr(),
                    stdin_ptr,
                    stdin_len,
                    ini_ptrs.as_ptr(),
                    ini_ptrs.len(),
                    &mut out,
                )
            }
        };
        if status != 0 {
            return Err(EngineError::ExecutionFailed(format!(
                "engine fault during inline execution (status {})",
                status
            )));
        }

        self.collect(out)
    }

    fn execute_file(
        &mut self,
        path: &Path,
        argv: &[String],
        stdin: Option<&[u8]>,
        env: &BTreeMap<String, String>,
        ini: &BTreeMap<String, String>,
    ) -> Result<RawOutput> {
        let path_str = path.to_str().ok_or_else(|| {
            EngineError::InvalidInput(format!("script path is not valid UTF-8: {}", path.display()))
        })?;
        let path_c = c_string(path_str, "script path")?;

        let argv_c: Vec<CString> = argv
            .iter()
            .map(|arg| c_string(arg, "argv entry"))
            .collect::<Result<_>>()?;
        let argv_ptrs = ptr_array(&argv_c);

        let env_c = keyval_strings(env, "environment variable")?;
        let env_ptrs = ptr_array(&env_c);

        let ini_c = keyval_strings(ini, "ini setting")?;
        let ini_ptrs = ptr_array(&ini_c);

        let (stdin_ptr, stdin_len) = stdin_parts(stdin);

        // The bridge also receives the overlay as key=value pairs, but PHP
        // superglobals like $_ENV read the process environment directly, so
        // mirror it there for the duration of the call.
        let _overlay = EnvOverlay::apply(env);

        let mut out = BridgeResult::empty();
        let status = {
            let exec = self.symbol::<ExecFileFn>(SYM_EXEC_FILE)?;
            unsafe {
                exec(
                    path_c.as_ptr(),
                    argv_ptrs.as_ptr(),
                    argv_ptrs.len(),
                    stdin_ptr,
                    stdin_len,
                    env_ptrs.as_ptr(),
                    env_ptrs.len(),
                    ini_ptrs.as_ptr(),
                    ini_ptrs.len(),
                    &mut out,
                )
            }
        };
        if status != 0 {
            return Err(EngineError::ExecutionFailed(format!(
                "engine fault while executing {} (status {})",
                path.display(),
                status
            )));
        }

        self.collect(out)
    }
}

fn open_library(lib_path: &Path) -> Result<libloading::Library> {
    #[cfg(unix)]
    {
        use libloading::os::unix::Library;

        // RTLD_NOW: resolve all symbols immediately
        // RTLD_GLOBAL: make libphp symbols visible to later-loaded extensions
        let flags = libloading::os::unix::RTLD_NOW | libloading::os::unix::RTLD_GLOBAL;
        let library = unsafe { Library::open(Some(lib_path), flags) }.map_err(|e| {
            EngineError::InitializationFailed(format!(
                "failed to load {}: {}",
                lib_path.display(),
                e
            ))
        })?;
        Ok(library.into())
    }

    #[cfg(windows)]
    {
        let library = unsafe { libloading::Library::new(lib_path) }.map_err(|e| {
            EngineError::InitializationFailed(format!(
                "failed to load {}: {}",
                lib_path.display(),
                e
            ))
        })?;
        Ok(library)
    }
}

fn c_string(value: &str, what: &str) -> Result<CString> {
    CString::new(value)
        .map_err(|_| EngineError::InvalidInput(format!("{} contains a NUL byte", what)))
}

fn keyval_strings(map: &BTreeMap<String, String>, what: &str) -> Result<Vec<CString>> {
    map.iter()
        .map(|(key, value)| c_string(&format!("{}={}", key, value), what))
        .collect()
}

fn ptr_array(strings: &[CString]) -> Vec<*const c_char> {
    strings.iter().map(|s| s.as_ptr()).collect()
}

fn stdin_parts(stdin: Option<&[u8]>) -> (*const c_uchar, usize) {
    match stdin {
        Some(bytes) => (bytes.as_ptr(), bytes.len()),
        None => (std::ptr::null(), 0),
    }
}

fn copy_buffer(buffer: &BridgeBuffer) -> Vec<u8> {
    if buffer.data.is_null() || buffer.len == 0 {
        return Vec::new();
    }
    unsafe { std::slice::from_raw_parts(buffer.data.cast::<u8>(), buffer.len) }.to_vec()
}

/// Scoped overlay of process environment variables.
///
/// Executions are serialized by the lifecycle manager, so mutating the
/// process environment here cannot race another execution; previous values
/// are restored when the overlay drops.
struct EnvOverlay {
    saved: Vec<(String, Option<OsString>)>,
}

impl EnvOverlay {
    fn apply(vars: &BTreeMap<String, String>) -> Self {
        let mut saved = Vec::with_capacity(vars.len());
        for (key, value) in vars {
            saved.push((key.clone(), std::env::var_os(key)));
            std::env::set_var(key, value);
        }
        Self { saved }
    }
}

impl Drop for EnvOverlay {
    fn drop(&mut self) {
        for (key, previous) in self.saved.drain(..) {
            match previous {
                Some(value) => std::env::set_var(&key, value),
                None => std::env::remove_var(&key),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_fails_for_missing_library() {
        let err = EmbedSapi::load(Path::new("/nonexistent/libphp_embed_bridge.so"));
        assert!(matches!(err, Err(EngineError::InitializationFailed(_))));
    }

    #[test]
    fn keyval_marshalling_formats_pairs() {
        let mut map = BTreeMap::new();
        map.insert("memory_limit".to_string(), "64M".to_string());
        let strings = keyval_strings(&map, "ini setting").unwrap();
        assert_eq!(strings[0].to_bytes(), b"memory_limit=64M");
    }

    #[test]
    fn nul_bytes_are_invalid_input() {
        assert!(matches!(
            c_string("bad\0code", "code"),
            Err(EngineError::InvalidInput(_))
        ));
    }

    #[test]
    fn env_overlay_restores_previous_values() {
        std::env::set_var("PHPE_OVERLAY_KEEP", "before");
        std::env::remove_var("PHPE_OVERLAY_FRESH");

        let mut vars = BTreeMap::new();
        vars.insert("PHPE_OVERLAY_KEEP".to_string(), "during".to_string());
        vars.insert("PHPE_OVERLAY_FRESH".to_string(), "during".to_string());

        {
            let _overlay = EnvOverlay::apply(&vars);
            assert_eq!(std::env::var("PHPE_OVERLAY_KEEP").as_deref(), Ok("during"));
            assert_eq!(std::env::var("PHPE_OVERLAY_FRESH").as_deref(), Ok("during"));
        }

        assert_eq!(std::env::var("PHPE_OVERLAY_KEEP").as_deref(), Ok("before"));
        assert!(std::env::var_os("PHPE_OVERLAY_FRESH").is_none());
    }

    #[test]
    fn empty_native_buffer_copies_to_empty_vec() {
        let buffer = BridgeBuffer {
            data: std::ptr::null(),
            len: 0,
        };
        assert!(copy_buffer(&buffer).is_empty());
    }
}
