use crate::errors::CliError;
use crate::GlobalOpts;
use clap::Subcommand;
use colored::Colorize;
use dvm_config::{pointer_path, read_pointer, set_config_path, Config};

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Print the configured values
    Show,
    /// Set one key (store-path, output-dir, decode-mode, indent-width, plugin-dir)
    Set { key: String, value: String },
    /// Get or set the path to the config file.
    /// If `new_path` is provided, later runs read the config from there.
    /// If omitted, the CLI prints the current configuration file path.
    Path {
        /// Optional new config path to set
        new_path: Option<String>,
    },
}

pub fn handle_config(action: ConfigAction, opts: &GlobalOpts) -> Result<(), CliError> {
    match action {
        ConfigAction::Show => {
            let config = Config::load()?;
            println!("{}", "Configuration:".bold().green());
            if config.is_empty() {
                if opts.verbosity_level() > 0 {
                    println!("  {}", "(empty)".yellow());
                }
            } else {
                for (key, value) in config.values_iter() {
                    println!("  {}: {}", key.cyan(), value);
                }
            }
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            dvm_logger::success(&format!("Set {} = {}", key, value));
        }
        ConfigAction::Path { new_path } => {
            let config_path = Config::path()?;
            dvm_logger::debug(&format!("Reading config from: {}", config_path.display()));
            match new_path {
                Some(p) => {
                    set_config_path(&p)?;
                    dvm_logger::success(&format!("Config path set to {}", p.trim()));
                }
                None => {
                    println!("{}", config_path.display());
                    if let Some(redirect) = read_pointer(&pointer_path()?) {
                        println!("{} {}", "overridden-by".cyan(), redirect.display());
                    }
                }
            }
        }
    }
    Ok(())
}
