use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::paths::Paths;
use crate::sandbox::RunnerLimits;
use crate::sandbox::runner::{DEFAULT_KILL_GRACE, DEFAULT_MAX_OUTPUT_BYTES, DEFAULT_TIMEOUT};

/// Rust target used for program builds unless overridden.
pub const DEFAULT_TARGET: &str = "wasm32v1-none";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Resolved XDG-compliant paths (not serialized)
    #[serde(skip)]
    pub paths: Paths,

    /// File this config was read from (not serialized)
    #[serde(skip)]
    pub source: Option<PathBuf>,

    #[serde(default)]
    pub workspace: WorkspaceConfig,

    #[serde(default)]
    pub sandbox: SandboxConfig,

    #[serde(default)]
    pub toolchain: ToolchainConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Sandbox root. `~` is expanded. Relative values are ignored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// Per-command timeout in seconds (default: 300)
    #[serde(default = "default_sandbox_timeout")]
    pub timeout_secs: u64,

    /// Cap for each of stdout and stderr (default: 10 MiB)
    #[serde(default = "default_sandbox_max_output")]
    pub max_output_bytes: usize,

    /// Seconds between SIGTERM and SIGKILL on timeout (default: 5)
    #[serde(default = "default_kill_grace")]
    pub kill_grace_secs: u64,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_sandbox_timeout(),
            max_output_bytes: default_sandbox_max_output(),
            kill_grace_secs: default_kill_grace(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolchainConfig {
    #[serde(default = "default_target")]
    pub target: String,

    /// Timeout for `cargo build` and `cargo test` in seconds (default: 600)
    #[serde(default = "default_build_timeout")]
    pub build_timeout_secs: u64,

    /// Scaffold with `cargo sails` when it is installed
    #[serde(default = "default_true")]
    pub prefer_sails_cli: bool,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            target: default_target(),
            build_timeout_secs: default_build_timeout(),
            prefer_sails_cli: default_true(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// `text` for humans, `json` for log shippers
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => anyhow::bail!("Unknown log format: {} (expected text or json)", other),
        }
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            LogFormat::Text => "text",
            LogFormat::Json => "json",
        })
    }
}

fn default_true() -> bool {
    true
}
fn default_sandbox_timeout() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}
fn default_sandbox_max_output() -> usize {
    DEFAULT_MAX_OUTPUT_BYTES
}
fn default_kill_grace() -> u64 {
    DEFAULT_KILL_GRACE.as_secs()
}
fn default_target() -> String {
    DEFAULT_TARGET.to_string()
}
fn default_build_timeout() -> u64 {
    600
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load from the XDG config file, creating it from the template on first run.
    pub fn load() -> Result<Self> {
        let paths = Paths::resolve()?;
        paths.ensure_dirs()?;

        let path = paths.config_file();
        if !path.exists() {
            let config = Config {
                paths,
                ..Config::default()
            };
            config.save_with_template()?;
            return Ok(config);
        }

        let mut config = Self::load_from(&path)?;
        config.paths = paths;
        Ok(config)
    }

    /// Load from an explicit file. A missing file is an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let mut config = Self::parse(&content)
            .with_context(|| format!("Invalid config: {}", path.display()))?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// File that `save` writes to.
    pub fn file_path(&self) -> PathBuf {
        self.source
            .clone()
            .unwrap_or_else(|| self.paths.config_file())
    }

    pub fn save(&self) -> Result<()> {
        let path = self.file_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    /// Save config with a helpful template (for first-time setup)
    pub fn save_with_template(&self) -> Result<()> {
        let path = self.file_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&path, DEFAULT_CONFIG_TEMPLATE)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        eprintln!("Created default config at {}", path.display());
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Paths::resolve()?.config_file())
    }

    pub fn get_value(&self, key: &str) -> Result<String> {
        let parts: Vec<&str> = key.split('.').collect();
        match parts.as_slice() {
            ["workspace", "root"] => Ok(self.workspace.root.clone().unwrap_or_default()),
            ["sandbox", "timeout_secs"] => Ok(self.sandbox.timeout_secs.to_string()),
            ["sandbox", "max_output_bytes"] => Ok(self.sandbox.max_output_bytes.to_string()),
            ["sandbox", "kill_grace_secs"] => Ok(self.sandbox.kill_grace_secs.to_string()),
            ["toolchain", "target"] => Ok(self.toolchain.target.clone()),
            ["toolchain", "build_timeout_secs"] => {
                Ok(self.toolchain.build_timeout_secs.to_string())
            }
            ["toolchain", "prefer_sails_cli"] => Ok(self.toolchain.prefer_sails_cli.to_string()),
            ["logging", "level"] => Ok(self.logging.level.clone()),
            ["logging", "format"] => Ok(self.logging.format.to_string()),
            _ => anyhow::bail!("Unknown config key: {}", key),
        }
    }

    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        let parts: Vec<&str> = key.split('.').collect();
        match parts.as_slice() {
            ["workspace", "root"] => {
                self.workspace.root = (!value.is_empty()).then(|| value.to_string())
            }
            ["sandbox", "timeout_secs"] => self.sandbox.timeout_secs = value.parse()?,
            ["sandbox", "max_output_bytes"] => self.sandbox.max_output_bytes = value.parse()?,
            ["sandbox", "kill_grace_secs"] => self.sandbox.kill_grace_secs = value.parse()?,
            ["toolchain", "target"] => self.toolchain.target = value.to_string(),
            ["toolchain", "build_timeout_secs"] => {
                self.toolchain.build_timeout_secs = value.parse()?
            }
            ["toolchain", "prefer_sails_cli"] => self.toolchain.prefer_sails_cli = value.parse()?,
            ["logging", "level"] => self.logging.level = value.to_string(),
            ["logging", "format"] => self.logging.format = value.parse()?,
            _ => anyhow::bail!("Unknown config key: {}", key),
        }
        Ok(())
    }

    /// Sandbox root.
    ///
    /// Resolution order:
    /// 1. VARAFORGE_WORKSPACE env var (absolute path)
    /// 2. `workspace.root` from the config file (absolute after `~` expansion)
    /// 3. The current directory
    pub fn workspace_root(&self) -> Result<PathBuf> {
        if let Some(ws) = &self.paths.workspace {
            return Ok(ws.clone());
        }

        if let Some(root) = &self.workspace.root {
            let expanded = PathBuf::from(shellexpand::tilde(root.trim()).into_owned());
            if expanded.is_absolute() {
                return Ok(expanded);
            }
            tracing::warn!("Ignoring relative workspace.root: {}", root);
        }

        std::env::current_dir().context("Failed to determine current directory")
    }

    pub fn runner_limits(&self) -> RunnerLimits {
        RunnerLimits {
            timeout: Duration::from_secs(self.sandbox.timeout_secs),
            max_output_bytes: self.sandbox.max_output_bytes,
            kill_grace: Duration::from_secs(self.sandbox.kill_grace_secs),
        }
    }

    pub fn build_timeout(&self) -> Duration {
        Duration::from_secs(self.toolchain.build_timeout_secs)
    }
}

/// Default config template with helpful comments (used for first-time setup)
const DEFAULT_CONFIG_TEMPLATE: &str = r#"# varaforge configuration
# Auto-created on first run. Edit as needed.

[workspace]
# Directory every scaffold/compile/test path must stay inside.
# Default: the current directory. VARAFORGE_WORKSPACE overrides this.
# root = "~/vara"

[sandbox]
timeout_secs = 300            # per-command timeout
max_output_bytes = 10485760   # cap for each of stdout and stderr
kill_grace_secs = 5           # SIGTERM -> SIGKILL delay on timeout

[toolchain]
target = "wasm32v1-none"
build_timeout_secs = 600
prefer_sails_cli = true       # use `cargo sails new-program` when installed

[logging]
level = "info"                # RUST_LOG and --verbose take precedence
format = "text"               # or "json"
"#;
