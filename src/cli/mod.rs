pub mod client;
pub mod compile;
pub mod config;
pub mod doctor;
pub mod paths;
pub mod scaffold;
pub mod test;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;

use crate::concurrency::BuildLock;
use crate::config::Config;
use crate::toolchain::Toolchain;

#[derive(Parser)]
#[command(name = "varaforge")]
#[command(author, version, about = "Scaffold, build and test Vara smart programs")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file
    #[arg(short, long, global = true, env = "VARAFORGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Workspace root every project path must stay inside
    #[arg(short, long, global = true)]
    pub workspace: Option<PathBuf>,

    /// Print reports as JSON
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new program project
    Scaffold(scaffold::ScaffoldArgs),

    /// Build a program to WASM
    Compile(compile::CompileArgs),

    /// Run a program's tests
    Test(test::TestArgs),

    /// Generate a TypeScript client for a program
    Client(client::ClientArgs),

    /// Check which developer tools are available
    Doctor,

    /// Configuration management
    Config(config::ConfigArgs),

    /// Show resolved XDG directory paths
    Paths,
}

/// Everything a toolchain subcommand needs.
pub struct Session {
    pub config: Config,
    pub workspace: PathBuf,
    pub json: bool,
}

impl Session {
    pub fn toolchain(&self) -> Result<Toolchain> {
        let lock = BuildLock::new()?;
        Ok(Toolchain::from_config(&self.config, &self.workspace).with_build_lock(lock))
    }
}

impl Cli {
    /// `--config` file when given, otherwise the XDG config (created on first run).
    pub fn load_config(&self) -> Result<Config> {
        match &self.config {
            Some(path) => Config::load_from(path),
            None => Config::load(),
        }
    }

    /// `--workspace` wins over env and config. Relative values are taken
    /// from the current directory.
    pub fn session(&self, config: Config) -> Result<Session> {
        let workspace = match &self.workspace {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => std::env::current_dir()
                .context("Failed to determine current directory")?
                .join(path),
            None => config.workspace_root()?,
        };

        Ok(Session {
            config,
            workspace,
            json: self.json,
        })
    }
}

/// Print `report` as pretty JSON on stdout.
pub(crate) fn print_json<T: Serialize>(report: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "varaforge",
            "compile",
            "--project",
            "demo",
            "--workspace",
            "/srv/vara",
            "--json",
            "-v",
        ])
        .unwrap();

        assert!(cli.verbose);
        assert!(cli.json);
        assert_eq!(cli.workspace, Some(PathBuf::from("/srv/vara")));
        assert!(matches!(cli.command, Commands::Compile(_)));
    }

    #[test]
    fn workspace_flag_overrides_config() {
        let cli = Cli::try_parse_from(["varaforge", "-w", "/flag", "doctor"]).unwrap();
        let mut config = Config::default();
        config.workspace.root = Some("/from/config".into());

        let session = cli.session(config).unwrap();
        assert_eq!(session.workspace, PathBuf::from("/flag"));
    }

    #[test]
    fn relative_workspace_flag_is_made_absolute() {
        let cli = Cli::try_parse_from(["varaforge", "-w", "sub", "doctor"]).unwrap();
        let session = cli.session(Config::default()).unwrap();
        assert!(session.workspace.is_absolute());
        assert!(session.workspace.ends_with("sub"));
    }

    #[test]
    fn client_out_dir_defaults() {
        let cli = Cli::try_parse_from(["varaforge", "client", "demo"]).unwrap();
        let Commands::Client(args) = cli.command else {
            panic!("expected client command");
        };
        assert_eq!(args.project, Some(PathBuf::from("demo")));
        assert_eq!(args.out_dir, PathBuf::from("client"));

        let cli = Cli::try_parse_from(["varaforge", "client", "-o", "web"]).unwrap();
        let Commands::Client(args) = cli.command else {
            panic!("expected client command");
        };
        assert_eq!(args.project, None);
        assert_eq!(args.out_dir, PathBuf::from("web"));
    }

    #[test]
    fn rejects_unknown_template() {
        assert!(
            Cli::try_parse_from(["varaforge", "scaffold", "demo", "--template", "erc20"]).is_err()
        );
    }
}
