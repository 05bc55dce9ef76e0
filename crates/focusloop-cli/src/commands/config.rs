use clap::Subcommand;
use focusloop_core::Config;

use super::{print_json, CmdResult};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the full config as JSON
    Show,
    /// Print the config file path
    Path,
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Get a config value
    Get {
        /// Dot-separated key (e.g. "cycle.auto_start_breaks")
        key: String,
    },
    /// Set a config value and save
    Set {
        /// Dot-separated key
        key: String,
        /// New value
        value: String,
    },
}

pub fn run(action: ConfigAction) -> CmdResult {
    match action {
        ConfigAction::Show => {
            let config = Config::load()?;
            print_json(&config)?;
        }
        ConfigAction::Path => {
            println!("{}", Config::path()?.display());
        }
        ConfigAction::Init { force } => {
            let path = Config::path()?;
            if path.exists() && !force {
                return Err(format!("{} already exists (use --force)", path.display()).into());
            }
            Config::default().save_to(&path)?;
            println!("{}", path.display());
        }
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            match config.get(&key) {
                Some(value) => println!("{value}"),
                None => return Err(format!("unknown key: {key}").into()),
            }
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            println!("ok");
        }
    }
    Ok(())
}
