//! `phpe config` - inspect and edit the advisory configuration

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use phpe_config::Config;

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Print the customized settings
    Show,
    /// Print the config file path
    Path,
    /// Set a config key (engine-library, ini.<key>)
    Set { key: String, value: String },
}

pub fn handle_config(action: ConfigAction) -> Result<i32> {
    match action {
        ConfigAction::Show => {
            let config = Config::load().context("failed to load config")?;
            println!("{}", "Configuration:".bold().green());
            if config.is_empty() {
                println!("  {}", "(empty)".yellow());
            } else {
                for (key, value) in config.values_iter() {
                    println!("  {}: {}", key.cyan(), value);
                }
            }
        }
        ConfigAction::Path => {
            println!("{}", Config::path().display());
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load().context("failed to load config")?;
            config
                .set(&key, value.clone())
                .context("supported keys: engine-library, ini.<key>")?;
            config.save().context("failed to save config")?;
            println!("{} {} = {}", "Set".green(), key.cyan(), value);
        }
    }
    Ok(0)
}
