//! `phpe eval` - execute inline PHP code

use crate::common::{forward_result, parse_pairs, InputOpts};
use anyhow::Result;
use phpe_engine::{Engine, ExecutionRequest};
use tracing::debug;

pub fn handle_eval(code: String, input: &InputOpts, ini: &[String]) -> Result<i32> {
    let mut request = ExecutionRequest::inline(code)?.stdin(input.to_stdin()?);
    for (key, value) in parse_pairs(ini, "ini")? {
        request = request.ini(key, value);
    }

    let engine = Engine::acquire()?;
    debug!("executing inline code");
    let result = engine.execute(&request)?;
    forward_result(&result)
}
