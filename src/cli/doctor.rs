//! CLI subcommand: `varaforge doctor`
//!
//! Reports which allowlisted tools resolve on PATH and whether the
//! configured build target is installed.

use anyhow::Result;
use serde::Serialize;
use std::path::PathBuf;

use super::Session;
use crate::sandbox::PATTERN_SET_VERSION;
use crate::toolchain::INSTALL_RUST_HINT;
use crate::toolchain::template::TEMPLATES;

#[derive(Debug, Serialize)]
struct ToolStatus {
    command: &'static str,
    path: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    workspace: PathBuf,
    tools: Vec<ToolStatus>,
    target: String,
    target_installed: bool,
    sails_cli: bool,
    pattern_set_version: u32,
}

impl DoctorReport {
    fn healthy(&self) -> bool {
        self.target_installed && self.has("cargo")
    }

    fn has(&self, command: &str) -> bool {
        self.tools
            .iter()
            .any(|tool| tool.command == command && tool.path.is_some())
    }
}

pub async fn run(session: &Session) -> Result<()> {
    let toolchain = session.toolchain()?;
    let runner = toolchain.runner();

    let tools = runner
        .allowlist()
        .entries()
        .iter()
        .map(|entry| ToolStatus {
            command: entry.command(),
            path: runner.resolve(entry.command()),
        })
        .collect();

    let target = toolchain.settings().target.clone();
    let report = DoctorReport {
        workspace: toolchain.root().path().to_path_buf(),
        tools,
        target_installed: toolchain.target_installed(&target).await?,
        target,
        sails_cli: toolchain.sails_cli_available().await?,
        pattern_set_version: PATTERN_SET_VERSION,
    };

    if session.json {
        return super::print_json(&report);
    }

    println!("Workspace:  {}", report.workspace.display());
    println!();
    println!("Tools:");
    for tool in &report.tools {
        match &tool.path {
            Some(path) => println!("  ✓ {:<8} {}", tool.command, path.display()),
            None => println!("  ✗ {:<8} not found", tool.command),
        }
    }
    println!();
    let mark = if report.target_installed { "✓" } else { "✗" };
    println!("Target:     {} {}", mark, report.target);
    let mark = if report.sails_cli { "✓" } else { "✗" };
    println!("Sails CLI:  {} cargo sails", mark);
    println!("Patterns:   v{}", report.pattern_set_version);
    println!();
    println!("Templates:");
    for template in TEMPLATES {
        println!(
            "  {:<10} {} - {}",
            template.kind, template.display_name, template.description
        );
    }

    if !report.has("cargo") {
        println!();
        println!("{}", INSTALL_RUST_HINT);
    } else if !report.target_installed {
        println!();
        println!("Install the target with: rustup target add {}", report.target);
    }

    if !report.healthy() {
        anyhow::bail!("toolchain is incomplete");
    }
    Ok(())
}
