//! Shared helpers for the execution subcommands

use anyhow::{anyhow, Context, Result};
use clap::Args;
use phpe_engine::{ExecutionResult, Stdin};
use std::io::Write;

/// stdin options shared by `eval` and `run`
#[derive(Args, Debug, Clone, Default)]
pub struct InputOpts {
    /// Text supplied to the script on stdin
    #[arg(long, value_name = "TEXT", conflicts_with = "stdin_json")]
    pub stdin: Option<String>,

    /// JSON supplied to the script on stdin
    #[arg(long = "stdin-json", value_name = "JSON")]
    pub stdin_json: Option<String>,
}

impl InputOpts {
    pub fn to_stdin(&self) -> Result<Stdin> {
        if let Some(json) = &self.stdin_json {
            let value: serde_json::Value =
                serde_json::from_str(json).context("--stdin-json is not valid JSON")?;
            return Ok(Stdin::Json(value));
        }
        if let Some(text) = &self.stdin {
            return Ok(Stdin::Text(text.clone()));
        }
        Ok(Stdin::None)
    }
}

/// Parse repeated `KEY=VALUE` flags
pub fn parse_pairs(pairs: &[String], flag: &str) -> Result<Vec<(String, String)>> {
    pairs
        .iter()
        .map(|pair| {
            pair.split_once('=')
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .ok_or_else(|| anyhow!("--{} expects KEY=VALUE, got '{}'", flag, pair))
        })
        .collect()
}

/// Forward captured guest output to this process's stdio and hand back the
/// guest exit code. Bytes are written as captured; the guest decides its own
/// encoding.
pub fn forward_result(result: &ExecutionResult) -> Result<i32> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(result.stdout_bytes())?;
    stdout.flush()?;

    if !result.stderr_bytes().is_empty() {
        let mut stderr = std::io::stderr().lock();
        stderr.write_all(result.stderr_bytes())?;
        stderr.flush()?;
    }

    Ok(result.exit_code())
}
