use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use super::Session;
use crate::toolchain::{CompileReport, CompileRequest};

#[derive(Args)]
pub struct CompileArgs {
    /// Project directory, relative to the workspace
    #[arg(short, long)]
    pub project: Option<PathBuf>,

    /// Sub-directory of the workspace root to resolve the project against
    #[arg(long)]
    pub path: Option<PathBuf>,

    /// Build without optimizations
    #[arg(long)]
    pub debug: bool,

    /// Rust target (defaults to toolchain.target from config)
    #[arg(long)]
    pub target: Option<String>,

    /// Pass -v to cargo
    #[arg(long)]
    pub cargo_verbose: bool,
}

impl From<&CompileArgs> for CompileRequest {
    fn from(args: &CompileArgs) -> Self {
        CompileRequest {
            workspace_path: args.path.clone(),
            project_path: args.project.clone(),
            release: !args.debug,
            target: args.target.clone(),
            verbose: args.cargo_verbose,
        }
    }
}

pub async fn run(args: &CompileArgs, session: &Session) -> Result<()> {
    let report = session
        .toolchain()?
        .compile(CompileRequest::from(args))
        .await?;

    if session.json {
        super::print_json(&report)?;
    } else {
        print_report(&report);
    }

    match report.error {
        Some(error) if !report.success => anyhow::bail!(error),
        _ => Ok(()),
    }
}

fn print_report(report: &CompileReport) {
    // cargo writes progress to stderr; keep both streams where they came from.
    if !report.stdout.is_empty() {
        print!("{}", report.stdout);
    }
    if !report.stderr.is_empty() {
        eprint!("{}", report.stderr);
    }

    if !report.success {
        return;
    }

    if report.wasm_paths.is_empty() && report.idl_paths.is_empty() {
        println!("Build succeeded, but no .wasm or .idl artifacts were found.");
        return;
    }

    println!("Artifacts:");
    for path in report.wasm_paths.iter().chain(&report.idl_paths) {
        println!("  {}", path.display());
    }
}
