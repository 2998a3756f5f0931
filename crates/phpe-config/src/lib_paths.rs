//! Platform-specific discovery of the PHP embed bridge library
//!
//! The embed bridge is a shared library wrapping libphp's embed SAPI. Hosts
//! usually point at it explicitly (config or `PHPE_ENGINE_LIB`); the helpers
//! here cover the unconfigured case by probing the directories a PHP
//! installation conventionally uses.

use std::path::{Path, PathBuf};

/// Candidate file names for the embed bridge library
/// "lib*.so" on Linux, "lib*.dylib" on macOS, "*.dll" on Windows
#[cfg(target_os = "macos")]
pub const ENGINE_LIB_CANDIDATES: &[&str] = &[
    "libphp_embed_bridge.dylib",
    "libphp.dylib",
];
#[cfg(all(unix, not(target_os = "macos")))]
pub const ENGINE_LIB_CANDIDATES: &[&str] = &[
    "libphp_embed_bridge.so",
    "libphp.so",
];
#[cfg(windows)]
pub const ENGINE_LIB_CANDIDATES: &[&str] = &[
    "php_embed_bridge.dll",
    "php8embed.dll",
];

/// Library subdirectories of a PHP installation prefix, in probe order
#[cfg(windows)]
const PREFIX_LIB_DIRS: &[&str] = &["", "lib"];
#[cfg(not(windows))]
const PREFIX_LIB_DIRS: &[&str] = &["lib", "lib64"];

/// Error type for engine library resolution
#[derive(Debug, Clone)]
pub enum LibPathError {
    /// The installation prefix does not exist or is not a directory
    PrefixNotFound(PathBuf),
    /// No candidate library file was found under the prefix
    LibraryNotFound(PathBuf),
}

impl std::fmt::Display for LibPathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LibPathError::PrefixNotFound(path) => {
                write!(f, "PHP installation prefix not found: {}", path.display())
            }
            LibPathError::LibraryNotFound(path) => {
                write!(f, "no embed bridge library under: {}", path.display())
            }
        }
    }
}

impl std::error::Error for LibPathError {}

/// Resolve the embed bridge library inside a PHP installation prefix
///
/// # Platform differences
///
/// - **Unix/macOS**: `<prefix>/lib/libphp_embed_bridge.so` (or `.dylib`),
///   falling back to `lib64` and the bare libphp name
/// - **Windows**: `<prefix>/php_embed_bridge.dll` or `<prefix>/lib/...`
pub fn resolve_engine_library(prefix: &Path) -> Result<PathBuf, LibPathError> {
    if !prefix.is_dir() {
        return Err(LibPathError::PrefixNotFound(prefix.to_path_buf()));
    }

    for dir in PREFIX_LIB_DIRS {
        let lib_dir = if dir.is_empty() {
            prefix.to_path_buf()
        } else {
            prefix.join(dir)
        };
        for name in ENGINE_LIB_CANDIDATES {
            let candidate = lib_dir.join(name);
            if candidate.is_file() {
                return Ok(candidate);
            }
        }
    }

    Err(LibPathError::LibraryNotFound(prefix.to_path_buf()))
}

/// Probe for the embed bridge library without any configuration
///
/// Walks from a `php` executable on PATH to its installation prefix
/// (`<prefix>/bin/php`), then checks the conventional library directories.
pub fn discover_engine_library() -> Option<PathBuf> {
    let php = which::which("php").ok()?;
    let prefix = php.parent()?.parent()?;
    resolve_engine_library(prefix).ok()
}
