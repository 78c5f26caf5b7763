use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use super::Session;
use crate::toolchain::client::DEFAULT_CLIENT_DIR;
use crate::toolchain::{ClientReport, ClientRequest};

#[derive(Args)]
pub struct ClientArgs {
    /// Program directory, relative to the workspace
    pub project: Option<PathBuf>,

    /// Sub-directory of the workspace root to resolve paths against
    #[arg(long)]
    pub path: Option<PathBuf>,

    /// Directory to write the client into, relative to the workspace
    #[arg(short, long, default_value = DEFAULT_CLIENT_DIR)]
    pub out_dir: PathBuf,
}

impl From<&ClientArgs> for ClientRequest {
    fn from(args: &ClientArgs) -> Self {
        ClientRequest {
            workspace_path: args.path.clone(),
            project_path: args.project.clone(),
            out_dir: args.out_dir.clone(),
        }
    }
}

pub fn run(args: &ClientArgs, session: &Session) -> Result<()> {
    let report = session
        .toolchain()?
        .scaffold_client(ClientRequest::from(args))?;

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

fn print_report(report: &ClientReport) {
    if !report.success {
        return;
    }

    println!("Client written to {}", report.out_dir.display());
    println!();
    println!("Files:");
    for file in &report.created_files {
        println!("  {}", file);
    }
    println!();
    println!("Next steps:");
    for step in &report.next_steps {
        println!("  {}", step);
    }
}
