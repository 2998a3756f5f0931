//! `phpe run` - execute a PHP script file

use crate::common::{forward_result, parse_pairs, InputOpts};
use anyhow::Result;
use phpe_engine::{Engine, ExecutionRequest};
use std::path::PathBuf;
use tracing::debug;

pub fn handle_run(
    script: PathBuf,
    args: Vec<String>,
    input: &InputOpts,
    env: &[String],
    ini: &[String],
) -> Result<i32> {
    let mut request = ExecutionRequest::file(script)?
        .args(args)
        .stdin(input.to_stdin()?);
    for (key, value) in parse_pairs(env, "env")? {
        request = request.env(key, value);
    }
    for (key, value) in parse_pairs(ini, "ini")? {
        request = request.ini(key, value);
    }

    let engine = Engine::acquire()?;
    debug!("executing script file");
    let result = engine.execute(&request)?;
    forward_result(&result)
}
