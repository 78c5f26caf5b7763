//! TypeScript client generation for a built program.
//!
//! The client is written into a directory of the workspace and points at
//! the program's WASM and IDL by relative path, so it keeps working after
//! a rebuild.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::Toolchain;
use super::compile::{GEAR_TARGET_DIR, artifact_dirs, collect_artifacts};
use super::template::{self, PROJECT_NAME, TemplateFile, TemplateVars};
use crate::sandbox::{SandboxError, SandboxRoot, SecurityError};

pub const DEFAULT_CLIENT_DIR: &str = "client";

/// Name used when the project has no readable `package.name`.
const FALLBACK_PROGRAM_NAME: &str = "vara-program";

const WASM_PATH: &str = "WASM_PATH";
const IDL_PATH: &str = "IDL_PATH";

static CLIENT_FILES: &[TemplateFile] = &[
    TemplateFile {
        path: "package.json",
        contents: include_str!("../../templates/client/package.json.tmpl"),
    },
    TemplateFile {
        path: "tsconfig.json",
        contents: include_str!("../../templates/client/tsconfig.json.tmpl"),
    },
    TemplateFile {
        path: "src/index.ts",
        contents: include_str!("../../templates/client/index.ts.tmpl"),
    },
    TemplateFile {
        path: "README.md",
        contents: include_str!("../../templates/client/README.md.tmpl"),
    },
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRequest {
    /// Sub-directory of the workspace root to treat as the workspace.
    pub workspace_path: Option<PathBuf>,
    /// Program directory relative to the workspace.
    pub project_path: Option<PathBuf>,
    /// Client directory relative to the workspace.
    #[serde(default = "default_out_dir")]
    pub out_dir: PathBuf,
}

fn default_out_dir() -> PathBuf {
    PathBuf::from(DEFAULT_CLIENT_DIR)
}

impl Default for ClientRequest {
    fn default() -> Self {
        Self {
            workspace_path: None,
            project_path: None,
            out_dir: default_out_dir(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientReport {
    pub success: bool,
    pub out_dir: PathBuf,
    pub created_files: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wasm_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idl_path: Option<PathBuf>,
    pub next_steps: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ClientReport {
    fn failed(out_dir: PathBuf, error: impl Into<String>) -> Self {
        Self {
            success: false,
            out_dir,
            created_files: Vec::new(),
            wasm_path: None,
            idl_path: None,
            next_steps: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// Build outputs found for a project, release before debug.
#[derive(Debug, Default, PartialEq, Eq)]
struct ProgramArtifacts {
    wasm: Option<PathBuf>,
    idl: Option<PathBuf>,
}

impl Toolchain {
    /// Generate a TypeScript client for the program at `request.project_path`.
    pub fn scaffold_client(&self, request: ClientRequest) -> Result<ClientReport> {
        let workspace = self.resolve_workspace(request.workspace_path.as_deref())?;
        let project = match &request.project_path {
            Some(path) => workspace.narrow(path)?,
            None => workspace.clone(),
        };
        let out = workspace.narrow(&request.out_dir)?;
        let out_path = out.path().to_path_buf();

        if !project.path().is_dir() {
            return Ok(ClientReport::failed(
                out_path,
                format!("Project directory not found: {}", project.path().display()),
            ));
        }

        let name = read_package_name(&project.path().join("Cargo.toml"))
            .unwrap_or_else(|| FALLBACK_PROGRAM_NAME.to_string());
        let artifacts = self.find_program_artifacts(&project)?;
        info!("Generating client for {} in {}", name, out_path.display());

        match workspace.ensure_dir(&out_path) {
            Ok(_) => {}
            Err(SandboxError::Security(e)) => return Err(e.into()),
            Err(e) => return Ok(ClientReport::failed(out_path, e.to_string())),
        }

        // Unbuilt programs get the paths a release build will produce.
        let stem = name.replace('-', "_");
        let expected = project.path().join("target").join(GEAR_TARGET_DIR).join("release");
        let wasm = artifacts
            .wasm
            .clone()
            .unwrap_or_else(|| expected.join(format!("{stem}.opt.wasm")));
        let idl = artifacts
            .idl
            .clone()
            .unwrap_or_else(|| expected.join(format!("{stem}.idl")));

        let vars = TemplateVars::from([
            (PROJECT_NAME.to_string(), name),
            (WASM_PATH.to_string(), portable(&workspace.relative_between(&out_path, &wasm)?)),
            (IDL_PATH.to_string(), portable(&workspace.relative_between(&out_path, &idl)?)),
        ]);

        let created_files = match template::write_files(CLIENT_FILES, &out, &vars) {
            Ok(files) => files,
            Err(e) if e.downcast_ref::<SecurityError>().is_some() => return Err(e),
            Err(e) => return Ok(ClientReport::failed(out_path, format!("{:#}", e))),
        };

        Ok(ClientReport {
            success: true,
            next_steps: next_steps(&request.out_dir, &artifacts),
            out_dir: out_path,
            created_files,
            wasm_path: artifacts.wasm,
            idl_path: artifacts.idl,
            error: None,
        })
    }

    fn find_program_artifacts(&self, project: &SandboxRoot) -> Result<ProgramArtifacts> {
        let mut found = ProgramArtifacts::default();
        for profile in ["release", "debug"] {
            for dir in artifact_dirs(project, &self.settings.target, profile)? {
                let (wasm, idl) = collect_artifacts(&dir)
                    .with_context(|| format!("Failed to read {}", dir.display()))?;
                if found.wasm.is_none() {
                    found.wasm = wasm
                        .iter()
                        .find(|path| path.to_string_lossy().ends_with(".opt.wasm"))
                        .or(wasm.first())
                        .cloned();
                }
                if found.idl.is_none() {
                    found.idl = idl.into_iter().next();
                }
                if found.wasm.is_some() && found.idl.is_some() {
                    return Ok(found);
                }
            }
        }
        debug!("Artifacts in {}: {:?}", project.path().display(), found);
        Ok(found)
    }
}

/// `package.name` from a Cargo manifest.
fn read_package_name(manifest: &Path) -> Option<String> {
    let text = fs::read_to_string(manifest).ok()?;
    let table: toml::Table = toml::from_str(&text).ok()?;
    table
        .get("package")?
        .get("name")?
        .as_str()
        .map(str::to_string)
}

fn portable(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn next_steps(out_dir: &Path, artifacts: &ProgramArtifacts) -> Vec<String> {
    let mut steps = vec![
        format!("cd {}", out_dir.display()),
        "npm install".to_string(),
        "npm run build".to_string(),
        "export VARA_SEED=\"<your seed phrase>\"".to_string(),
    ];
    steps.push(match &artifacts.wasm {
        Some(path) => format!("WASM: {}", path.display()),
        None => "Build the program first: cargo build --release".to_string(),
    });
    steps.push(match &artifacts.idl {
        Some(path) => format!("IDL: {}", path.display()),
        None => "IDL will be generated during build".to_string(),
    });
    steps
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn package_name_from_manifest() {
        let tmp = tempfile::tempdir().unwrap();
        let manifest = tmp.path().join("Cargo.toml");

        fs::write(&manifest, "[package]\nname = \"my-counter\"\nversion = \"0.1.0\"\n").unwrap();
        assert_eq!(read_package_name(&manifest).as_deref(), Some("my-counter"));

        fs::write(&manifest, "[workspace]\nmembers = []\n").unwrap();
        assert_eq!(read_package_name(&manifest), None);

        fs::write(&manifest, "not toml = = =").unwrap();
        assert_eq!(read_package_name(&manifest), None);

        assert_eq!(read_package_name(&tmp.path().join("missing.toml")), None);
    }

    #[test]
    fn next_steps_without_artifacts() {
        let steps = next_steps(Path::new("client"), &ProgramArtifacts::default());
        assert_eq!(steps[0], "cd client");
        assert!(steps.contains(&"Build the program first: cargo build --release".to_string()));
        assert!(steps.contains(&"IDL will be generated during build".to_string()));
    }

    #[test]
    fn request_defaults_to_client_dir() {
        let request: ClientRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(request, ClientRequest::default());
        assert_eq!(request.out_dir, PathBuf::from("client"));
    }
}
