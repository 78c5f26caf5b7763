//! Scaffold, compile and test Sails programs inside the workspace root.
//!
//! Every operation resolves its directories through [`SandboxRoot`] and
//! starts tools only through [`ProcessRunner`]. Security violations are
//! returned as errors (wrapping [`crate::sandbox::SecurityError`]); everything
//! else, including a failed build, is reported in the operation's report.

pub mod client;
pub mod compile;
pub mod scaffold;
pub mod template;

pub use client::{ClientReport, ClientRequest};
pub use compile::{CompileReport, CompileRequest};
pub use scaffold::{ScaffoldMethod, ScaffoldReport, ScaffoldRequest};
pub use template::{TemplateKind, validate_project_name};
pub use test::{TestCounts, TestReport, TestRequest};

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::concurrency::{BuildLock, BuildLockGuard};
use crate::config::{Config, DEFAULT_TARGET};
use crate::sandbox::{ProcessRunner, SandboxRoot};

pub(crate) const INSTALL_RUST_HINT: &str =
    "cargo not found in PATH. Please install Rust: https://rustup.rs/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainSettings {
    /// Default `--target` for builds.
    pub target: String,
    /// Timeout for `cargo build` and `cargo test`.
    pub build_timeout: Duration,
    pub prefer_sails_cli: bool,
}

impl Default for ToolchainSettings {
    fn default() -> Self {
        Self {
            target: DEFAULT_TARGET.to_string(),
            build_timeout: Duration::from_secs(600),
            prefer_sails_cli: true,
        }
    }
}

impl From<&Config> for ToolchainSettings {
    fn from(config: &Config) -> Self {
        Self {
            target: config.toolchain.target.clone(),
            build_timeout: config.build_timeout(),
            prefer_sails_cli: config.toolchain.prefer_sails_cli,
        }
    }
}

/// Shared context for toolchain operations.
#[derive(Debug, Clone)]
pub struct Toolchain {
    root: SandboxRoot,
    runner: ProcessRunner,
    settings: ToolchainSettings,
    build_lock: Option<BuildLock>,
}

impl Toolchain {
    /// `runner` is confined to `root`.
    pub fn new(root: impl AsRef<Path>, runner: ProcessRunner, settings: ToolchainSettings) -> Self {
        let root = SandboxRoot::new(root);
        Self {
            runner: runner.with_root(root.clone()),
            root,
            settings,
            build_lock: None,
        }
    }

    /// Build a toolchain from loaded config, rooted at `root`.
    pub fn from_config(config: &Config, root: impl AsRef<Path>) -> Self {
        let runner = ProcessRunner::default().with_limits(config.runner_limits());
        Self::new(root, runner, ToolchainSettings::from(config))
    }

    /// Serialize builds across processes with `lock`.
    pub fn with_build_lock(mut self, lock: BuildLock) -> Self {
        self.build_lock = Some(lock);
        self
    }

    pub fn root(&self) -> &SandboxRoot {
        &self.root
    }

    pub fn runner(&self) -> &ProcessRunner {
        &self.runner
    }

    pub fn settings(&self) -> &ToolchainSettings {
        &self.settings
    }

    /// Resolve the optional workspace sub-directory, then the optional
    /// project directory inside it.
    pub fn resolve_project(
        &self,
        workspace_path: Option<&Path>,
        project_path: Option<&Path>,
    ) -> Result<PathBuf> {
        let workspace = self.resolve_workspace(workspace_path)?;
        let project = match project_path {
            Some(path) => workspace.resolve(path)?,
            None => workspace.path().to_path_buf(),
        };
        Ok(project)
    }

    fn resolve_workspace(&self, workspace_path: Option<&Path>) -> Result<SandboxRoot> {
        Ok(match workspace_path {
            Some(path) => self.root.narrow(path)?,
            None => self.root.clone(),
        })
    }

    async fn lock_builds(&self) -> Result<Option<BuildLockGuard>> {
        match &self.build_lock {
            Some(lock) => {
                debug!("Acquiring build lock {}", lock.path().display());
                Ok(Some(lock.acquire_async().await?))
            }
            None => Ok(None),
        }
    }
}

#[cfg(all(test, unix))]
pub(crate) mod test_support {
    //! Fake `cargo`/`rustup` executables for exercising operations end to end.

    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;

    use super::*;

    pub fn write_tool(bin: &Path, name: &str, script: &str) {
        let path = bin.join(name);
        fs::write(&path, format!("#!/bin/sh\n{script}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    /// Toolchain rooted at `root` that only sees tools in `bin`.
    pub fn toolchain(root: &Path, bin: &Path) -> Toolchain {
        let runner = ProcessRunner::default().with_search_path(bin);
        Toolchain::new(root, runner, ToolchainSettings::default())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::sandbox::SecurityError;

    #[test]
    fn resolve_project_defaults_to_root() {
        let tmp = tempfile::tempdir().unwrap();
        let tc = test_support::toolchain(tmp.path(), tmp.path());
        assert_eq!(tc.resolve_project(None, None).unwrap(), tmp.path());
    }

    #[test]
    fn resolve_project_nests_inside_workspace() {
        let tmp = tempfile::tempdir().unwrap();
        let tc = test_support::toolchain(tmp.path(), tmp.path());

        let resolved = tc
            .resolve_project(Some(Path::new("ws")), Some(Path::new("prog")))
            .unwrap();
        assert_eq!(resolved, tmp.path().join("ws").join("prog"));
    }

    #[test]
    fn resolve_project_rejects_escapes() {
        let tmp = tempfile::tempdir().unwrap();
        let tc = test_support::toolchain(tmp.path(), tmp.path());

        for (ws, project) in [
            (Some("../outside"), None),
            (None, Some("../../etc")),
            (Some("ws"), Some("../../x")),
            (None, Some("/etc")),
        ] {
            let err = tc
                .resolve_project(ws.map(Path::new), project.map(Path::new))
                .unwrap_err();
            assert!(
                err.downcast_ref::<SecurityError>()
                    .is_some_and(SecurityError::is_path_violation),
                "{ws:?} {project:?}"
            );
        }
    }

    #[test]
    fn runner_is_confined_to_root() {
        let tmp = tempfile::tempdir().unwrap();
        let tc = test_support::toolchain(tmp.path(), tmp.path());
        assert_eq!(tc.runner().root(), Some(tc.root()));
    }

    #[test]
    fn settings_follow_config() {
        let mut config = Config::default();
        config.toolchain.target = "wasm32-unknown-unknown".into();
        config.toolchain.build_timeout_secs = 5;
        config.toolchain.prefer_sails_cli = false;

        let settings = ToolchainSettings::from(&config);
        assert_eq!(settings.target, "wasm32-unknown-unknown");
        assert_eq!(settings.build_timeout, Duration::from_secs(5));
        assert!(!settings.prefer_sails_cli);
    }

    #[tokio::test]
    async fn build_lock_is_optional() {
        let tmp = tempfile::tempdir().unwrap();
        let tc = test_support::toolchain(tmp.path(), tmp.path());
        assert!(tc.lock_builds().await.unwrap().is_none());

        let tc = tc.with_build_lock(BuildLock::at(tmp.path().join("build.lock")).unwrap());
        let guard = tc.lock_builds().await.unwrap();
        assert!(guard.is_some());
    }
}
