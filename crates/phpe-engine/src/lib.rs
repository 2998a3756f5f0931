//! PHP-Rust execution bridge
//!
//! This bridge provides a minimal, focused interface for:
//! 1. Owning the embedded PHP interpreter's lifecycle (one per process)
//! 2. Executing inline code and script files with captured output
//!
//! The interpreter is stateful and non-reentrant, so every execution is
//! serialized through a single engine handle; see [`Engine`]. Inputs go in as
//! text, bytes, or JSON; results come back as exit code plus captured
//! stdout/stderr with optional JSON decoding.
//!
//! ```no_run
//! use phpe_engine::{Engine, ExecutionRequest, Stdin};
//!
//! let engine = Engine::acquire()?;
//! let result = engine.execute(
//!     &ExecutionRequest::inline("echo strtoupper(file_get_contents('php://stdin'));")?
//!         .stdin(Stdin::Text("hello".to_string())),
//! )?;
//! assert_eq!(result.stdout(), "HELLO");
//! # Ok::<(), phpe_engine::EngineError>(())
//! ```

pub mod embed;
pub mod errors;
mod engine;
mod request;
mod resource;
mod result;
pub mod sapi;

pub use engine::{Engine, ENGINE_LIB_ENV};
pub use errors::{EngineError, Result};
pub use request::{ExecutionRequest, Source, Stdin};
pub use resource::{ScriptBundle, ScriptResource};
pub use result::ExecutionResult;
pub use sapi::{RawOutput, Sapi};
