use anyhow::Result;
use clap::{Args, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

use crate::config::Config;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum Format {
    Toml,
    Json,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration
    Show {
        #[arg(short, long, value_enum, default_value_t = Format::Toml)]
        format: Format,
    },

    /// Get a configuration value
    Get {
        /// Config key (e.g., toolchain.target)
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Config key (e.g., sandbox.timeout_secs)
        key: String,

        /// Value to set
        value: String,
    },

    /// Show config file path
    Path,

    /// Initialize default config file
    Init {
        /// Overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

/// `file` is the global `--config` override.
pub fn run(args: &ConfigArgs, file: Option<&Path>) -> Result<()> {
    match &args.command {
        ConfigCommands::Show { format } => show_config(file, *format),
        ConfigCommands::Get { key } => get_config(file, key),
        ConfigCommands::Set { key, value } => set_config(file, key, value),
        ConfigCommands::Path => show_path(file),
        ConfigCommands::Init { force } => init_config(file, *force),
    }
}

fn load(file: Option<&Path>) -> Result<Config> {
    match file {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

fn target_path(file: Option<&Path>) -> Result<PathBuf> {
    match file {
        Some(path) => Ok(path.to_path_buf()),
        None => Config::config_path(),
    }
}

fn show_config(file: Option<&Path>, format: Format) -> Result<()> {
    let config = load(file)?;

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&config)?),
        Format::Toml => println!("{}", toml::to_string_pretty(&config)?),
    }

    Ok(())
}

fn get_config(file: Option<&Path>, key: &str) -> Result<()> {
    let config = load(file)?;
    println!("{}", config.get_value(key)?);
    Ok(())
}

fn set_config(file: Option<&Path>, key: &str, value: &str) -> Result<()> {
    let mut config = load(file)?;
    config.set_value(key, value)?;
    config.save()?;
    println!("Set {} = {}", key, value);
    Ok(())
}

fn show_path(file: Option<&Path>) -> Result<()> {
    println!("{}", target_path(file)?.display());
    Ok(())
}

fn init_config(file: Option<&Path>, force: bool) -> Result<()> {
    let path = target_path(file)?;

    if path.exists() && !force {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    Config {
        source: Some(path),
        ..Config::default()
    }
    .save_with_template()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn init_refuses_to_overwrite_without_force() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("config.toml");

        init_config(Some(&path), false).unwrap();
        assert!(path.exists());
        assert!(init_config(Some(&path), false).is_err());
        init_config(Some(&path), true).unwrap();
    }

    #[test]
    fn set_then_get_round_trips_through_file() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("config.toml");
        init_config(Some(&path), false).unwrap();

        set_config(Some(&path), "toolchain.target", "wasm32-unknown-unknown").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.toolchain.target, "wasm32-unknown-unknown");
    }

    #[test]
    fn set_rejects_unknown_key() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("config.toml");
        init_config(Some(&path), false).unwrap();

        assert!(set_config(Some(&path), "agent.default_model", "x").is_err());
    }
}
