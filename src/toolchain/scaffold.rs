use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::Toolchain;
use super::template::{self, TemplateKind, validate_project_name};
use crate::sandbox::{SandboxRoot, SecurityError, SpawnOptions};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaffoldRequest {
    /// Crate name, also the new directory's name.
    pub name: String,
    #[serde(default)]
    pub template: TemplateKind,
    /// Sub-directory of the workspace root to create the project in.
    pub workspace_path: Option<PathBuf>,
    /// Replace an existing directory.
    #[serde(default)]
    pub force: bool,
}

impl ScaffoldRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            template: TemplateKind::default(),
            workspace_path: None,
            force: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScaffoldMethod {
    SailsCli,
    EmbeddedTemplate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScaffoldReport {
    pub success: bool,
    pub project_path: PathBuf,
    pub method: ScaffoldMethod,
    pub created_files: Vec<String>,
    pub next_steps: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScaffoldReport {
    fn failed(project_path: PathBuf, error: impl Into<String>) -> Self {
        Self {
            success: false,
            project_path,
            method: ScaffoldMethod::EmbeddedTemplate,
            created_files: Vec::new(),
            next_steps: Vec::new(),
            error: Some(error.into()),
        }
    }
}

impl Toolchain {
    /// Create a new program project named `request.name`.
    ///
    /// Uses `cargo sails new-program` when it is installed and preferred,
    /// otherwise (or when it fails) renders the embedded template.
    pub async fn scaffold(&self, request: ScaffoldRequest) -> Result<ScaffoldReport> {
        let workspace = self.resolve_workspace(request.workspace_path.as_deref())?;

        if let Err(e) = validate_project_name(&request.name) {
            return Ok(ScaffoldReport::failed(PathBuf::new(), e.to_string()));
        }

        let project = workspace.narrow(&request.name)?;
        let project_path = project.path().to_path_buf();
        if project_path == workspace.path() {
            return Ok(ScaffoldReport::failed(
                project_path,
                "Project directory cannot be the workspace root",
            ));
        }

        if fs::symlink_metadata(&project_path).is_ok() {
            if !request.force {
                return Ok(ScaffoldReport::failed(
                    project_path.clone(),
                    format!(
                        "Directory already exists: {}. Use --force to overwrite.",
                        project_path.display()
                    ),
                ));
            }
            info!("Removing existing directory: {}", project_path.display());
            remove_path(&project_path)?;
        }

        if self.settings.prefer_sails_cli
            && request.template == TemplateKind::Counter
            && self.sails_cli_available().await?
        {
            match self
                .scaffold_with_sails_cli(&request.name, &workspace, &project_path)
                .await?
            {
                Some(report) => return Ok(report),
                None => {
                    if fs::symlink_metadata(&project_path).is_ok() {
                        remove_path(&project_path)?;
                    }
                }
            }
        }

        self.scaffold_with_template(request.template, &request.name, &project)
    }

    pub async fn sails_cli_available(&self) -> Result<bool> {
        if !self.runner.command_exists("cargo") {
            debug!("cargo not found in PATH");
            return Ok(false);
        }

        let result = self
            .runner
            .safe_spawn(
                "cargo",
                &["sails", "--help"],
                SpawnOptions::new().cwd(self.root.path()),
            )
            .await?;
        Ok(result.success())
    }

    /// `None` when the CLI failed and the caller should fall back.
    async fn scaffold_with_sails_cli(
        &self,
        name: &str,
        workspace: &SandboxRoot,
        project_path: &Path,
    ) -> Result<Option<ScaffoldReport>> {
        info!("Scaffolding with Sails CLI: {}", name);

        if let Err(e) = workspace.ensure_dir(workspace.path()) {
            warn!("Cannot prepare {}: {}", workspace.path().display(), e);
            return Ok(None);
        }

        let result = self
            .runner
            .safe_spawn(
                "cargo",
                &["sails", "new-program", name],
                SpawnOptions::new().cwd(workspace.path()),
            )
            .await?;

        if !result.success() || !project_path.is_dir() {
            warn!("Sails CLI failed, falling back to embedded template");
            debug!("{}", result.stderr_lossy());
            return Ok(None);
        }

        let created_files = list_files(project_path)
            .with_context(|| format!("Failed to list {}", project_path.display()))?;

        Ok(Some(ScaffoldReport {
            success: true,
            project_path: project_path.to_path_buf(),
            method: ScaffoldMethod::SailsCli,
            created_files,
            next_steps: vec![
                format!("cd {}", name),
                "cargo build --release".to_string(),
                "cargo test".to_string(),
            ],
            error: None,
        }))
    }

    fn scaffold_with_template(
        &self,
        kind: TemplateKind,
        name: &str,
        project: &SandboxRoot,
    ) -> Result<ScaffoldReport> {
        info!("Scaffolding with embedded template: {}", kind);

        let template = kind.template();
        match template.render_into(project, &template::project_vars(name)) {
            Ok(created_files) => Ok(ScaffoldReport {
                success: true,
                project_path: project.path().to_path_buf(),
                method: ScaffoldMethod::EmbeddedTemplate,
                created_files,
                next_steps: template.next_steps(name, &self.settings.target),
                error: None,
            }),
            Err(e) if e.downcast_ref::<SecurityError>().is_some() => Err(e),
            Err(e) => Ok(ScaffoldReport::failed(
                project.path().to_path_buf(),
                format!("{:#}", e),
            )),
        }
    }
}

/// Remove a file, symlink or directory tree. Symlinks are not followed.
fn remove_path(path: &Path) -> Result<()> {
    let meta = fs::symlink_metadata(path)?;
    let removed = if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    removed.with_context(|| format!("Failed to remove {}", path.display()))
}

/// Files under `dir` relative to it, sorted, skipping `target/`.
fn list_files(dir: &Path) -> std::io::Result<Vec<String>> {
    fn walk(base: &Path, dir: &Path, out: &mut Vec<String>) -> std::io::Result<()> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                if entry.file_name() == "target" && dir == base {
                    continue;
                }
                walk(base, &path, out)?;
            } else if let Ok(relative) = path.strip_prefix(base) {
                out.push(relative.to_string_lossy().replace('\\', "/"));
            }
        }
        Ok(())
    }

    let mut files = Vec::new();
    walk(dir, dir, &mut files)?;
    files.sort();
    Ok(files)
}
