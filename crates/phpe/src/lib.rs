//! phpe library - expose modules for testing
//!
//! The binary in `main.rs` is a thin argument parser; everything it calls
//! lives here so integration tests can reach it.

pub mod commands;
pub mod common;

use clap::Args;

/// Options shared by every subcommand
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalOpts {
    /// Increase logging verbosity (-v: info, -vv: debug, -vvv: trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl GlobalOpts {
    pub fn verbosity_level(&self) -> u8 {
        self.verbose
    }
}

/// Initialize tracing output on stderr.
///
/// `RUST_LOG` wins when set; otherwise the `-v` count picks the level.
pub fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
