use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{INSTALL_RUST_HINT, Toolchain};
use crate::sandbox::{SandboxRoot, SecurityError, SpawnOptions};

/// Output directory the Sails wasm builder uses regardless of `--target`.
pub(crate) const GEAR_TARGET_DIR: &str = "wasm32-gear";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileRequest {
    /// Sub-directory of the workspace root to treat as the workspace.
    pub workspace_path: Option<PathBuf>,
    /// Project directory relative to the workspace.
    pub project_path: Option<PathBuf>,
    pub release: bool,
    /// Overrides the configured target.
    pub target: Option<String>,
    pub verbose: bool,
}

impl Default for CompileRequest {
    fn default() -> Self {
        Self {
            workspace_path: None,
            project_path: None,
            release: true,
            target: None,
            verbose: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompileReport {
    pub success: bool,
    pub wasm_paths: Vec<PathBuf>,
    pub idl_paths: Vec<PathBuf>,
    pub stdout: String,
    pub stderr: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CompileReport {
    fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

impl Toolchain {
    /// Build the project for the wasm target and collect its artifacts.
    pub async fn compile(&self, request: CompileRequest) -> Result<CompileReport> {
        let project = self.resolve_project(
            request.workspace_path.as_deref(),
            request.project_path.as_deref(),
        )?;
        let target = request
            .target
            .clone()
            .unwrap_or_else(|| self.settings.target.clone());

        let profile = if request.release { "release" } else { "debug" };
        // `--target` may be a target-spec file path; its output must still
        // land inside the project.
        let out_dirs = artifact_dirs(&SandboxRoot::new(&project), &target, profile)?;

        if !project.join("Cargo.toml").is_file() {
            return Ok(CompileReport::failed(format!(
                "No Cargo.toml found at: {}",
                project.display()
            )));
        }

        if !self.runner.command_exists("cargo") {
            return Ok(CompileReport::failed(INSTALL_RUST_HINT));
        }

        if !self.target_installed(&target).await? {
            return Ok(CompileReport::failed(format!(
                "Rust target \"{target}\" is not installed. Run: rustup target add {target}"
            )));
        }

        let args = build_args(request.release, &target, request.verbose);
        info!("Compiling: cargo {}", args.join(" "));

        let _lock = self.lock_builds().await?;
        let result = self
            .runner
            .safe_spawn(
                "cargo",
                &args,
                SpawnOptions::new()
                    .cwd(&project)
                    .timeout(self.settings.build_timeout),
            )
            .await?;

        let stdout = result.stdout_lossy().into_owned();
        let stderr = result.stderr_lossy().into_owned();

        if !result.success() {
            return Ok(CompileReport {
                success: false,
                stdout,
                stderr,
                error: Some(format!(
                    "Compilation failed with exit code {}",
                    result.exit_code
                )),
                ..CompileReport::default()
            });
        }

        let mut wasm_paths = Vec::new();
        let mut idl_paths = Vec::new();
        for dir in out_dirs {
            let (wasm, idl) = collect_artifacts(&dir)
                .with_context(|| format!("Failed to list {}", dir.display()))?;
            wasm_paths.extend(wasm);
            idl_paths.extend(idl);
        }
        debug!(
            wasm = wasm_paths.len(),
            idl = idl_paths.len(),
            "collected build artifacts"
        );

        Ok(CompileReport {
            success: true,
            wasm_paths,
            idl_paths,
            stdout,
            stderr,
            error: None,
        })
    }

    /// `rustup target list --installed`; when rustup itself fails the target
    /// is assumed to be present and cargo gets to report the problem.
    pub async fn target_installed(&self, target: &str) -> Result<bool> {
        let result = self
            .runner
            .safe_spawn(
                "rustup",
                &["target", "list", "--installed"],
                SpawnOptions::new().cwd(self.root.path()),
            )
            .await?;

        if !result.success() {
            debug!(
                exit_code = result.exit_code,
                "rustup unavailable, assuming {} is installed", target
            );
            return Ok(true);
        }

        Ok(parse_installed_targets(&result.stdout_lossy()).any(|t| t == target))
    }
}

fn build_args(release: bool, target: &str, verbose: bool) -> Vec<String> {
    let mut args = vec!["build".to_string()];
    if release {
        args.push("--release".to_string());
    }
    args.push("--target".to_string());
    args.push(target.to_string());
    if verbose {
        args.push("-v".to_string());
    }
    args
}

fn parse_installed_targets(output: &str) -> impl Iterator<Item = &str> {
    output.lines().map(str::trim).filter(|line| !line.is_empty())
}

/// Output directories for `target`, resolved inside `project`.
pub(crate) fn artifact_dirs(
    project: &SandboxRoot,
    target: &str,
    profile: &str,
) -> Result<Vec<PathBuf>, SecurityError> {
    let mut dirs = vec![project.resolve(Path::new("target").join(target).join(profile))?];
    if target != GEAR_TARGET_DIR {
        dirs.push(project.resolve(Path::new("target").join(GEAR_TARGET_DIR).join(profile))?);
    }
    Ok(dirs)
}

/// `(wasm, idl)` files directly inside `dir`, sorted. A missing directory
/// yields nothing.
pub(crate) fn collect_artifacts(dir: &Path) -> io::Result<(Vec<PathBuf>, Vec<PathBuf>)> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok((Vec::new(), Vec::new())),
        Err(e) => return Err(e),
    };

    let mut wasm = Vec::new();
    let mut idl = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let path = entry.path();
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("wasm") => wasm.push(path),
            Some("idl") => idl.push(path),
            _ => {}
        }
    }

    wasm.sort();
    idl.sort();
    Ok((wasm, idl))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_args_follow_flags() {
        assert_eq!(
            build_args(true, "wasm32v1-none", false),
            ["build", "--release", "--target", "wasm32v1-none"]
        );
        assert_eq!(
            build_args(false, "wasm32v1-none", true),
            ["build", "--target", "wasm32v1-none", "-v"]
        );
    }

    #[test]
    fn parses_installed_targets() {
        let output = "wasm32v1-none\n  x86_64-unknown-linux-gnu  \n\n";
        let targets: Vec<_> = parse_installed_targets(output).collect();
        assert_eq!(targets, ["wasm32v1-none", "x86_64-unknown-linux-gnu"]);
    }

    #[test]
    fn artifact_dirs_include_gear_output() {
        let project = SandboxRoot::new("/p");
        let dirs = artifact_dirs(&project, "wasm32v1-none", "release").unwrap();
        assert_eq!(
            dirs,
            [
                PathBuf::from("/p/target/wasm32v1-none/release"),
                PathBuf::from("/p/target/wasm32-gear/release"),
            ]
        );
        assert_eq!(artifact_dirs(&project, "wasm32-gear", "debug").unwrap().len(), 1);
    }

    #[test]
    fn artifact_dirs_reject_targets_leaving_the_project() {
        let project = SandboxRoot::new("/p");
        for target in ["/etc", "/tmp/custom-target.json", "../../outside"] {
            let err = artifact_dirs(&project, target, "release").unwrap_err();
            assert!(err.is_path_violation(), "{target}");
        }
    }

    #[test]
    fn collects_wasm_and_idl_files() {
        let tmp = tempfile::tempdir().unwrap();
        for name in ["demo.wasm", "demo.opt.wasm", "demo.idl", "demo.d", "libdemo.rlib"] {
            fs::write(tmp.path().join(name), "").unwrap();
        }
        fs::create_dir(tmp.path().join("deps.wasm")).unwrap();

        let (wasm, idl) = collect_artifacts(tmp.path()).unwrap();
        assert_eq!(
            wasm,
            [tmp.path().join("demo.opt.wasm"), tmp.path().join("demo.wasm")]
        );
        assert_eq!(idl, [tmp.path().join("demo.idl")]);

        let (wasm, idl) = collect_artifacts(&tmp.path().join("missing")).unwrap();
        assert!(wasm.is_empty() && idl.is_empty());
    }
}
