use clap::{Parser, Subcommand};
use colored::Colorize;
use phpe::{
    commands::{
        config::{self, ConfigAction},
        eval, run,
    },
    common::InputOpts,
    GlobalOpts,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "phpe")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    about = "Embedded PHP runner",
    long_about = "phpe executes PHP code and scripts through an in-process embedded interpreter."
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOpts,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute inline PHP code
    Eval {
        /// PHP source text (without the opening tag)
        code: String,

        #[command(flatten)]
        input: InputOpts,

        /// ini override, KEY=VALUE (repeatable)
        #[arg(long = "ini", value_name = "KEY=VALUE")]
        ini: Vec<String>,
    },
    /// Execute a PHP script file
    Run {
        /// Path to the script
        script: PathBuf,

        /// Arguments passed to the script as $argv
        #[arg(trailing_var_arg = true)]
        args: Vec<String>,

        #[command(flatten)]
        input: InputOpts,

        /// Environment variable overlay, KEY=VALUE (repeatable)
        #[arg(long = "env", value_name = "KEY=VALUE")]
        env: Vec<String>,

        /// ini override, KEY=VALUE (repeatable)
        #[arg(long = "ini", value_name = "KEY=VALUE")]
        ini: Vec<String>,
    },
    /// Configure the phpe tool
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

fn main() {
    let cli = Cli::parse();
    phpe::init_logging(cli.global.verbosity_level());

    let outcome = match cli.command {
        Commands::Eval { code, input, ini } => eval::handle_eval(code, &input, &ini),
        Commands::Run {
            script,
            args,
            input,
            env,
            ini,
        } => run::handle_run(script, args, &input, &env, &ini),
        Commands::Config { action } => config::handle_config(action),
    };

    match outcome {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            std::process::exit(1);
        }
    }
}
