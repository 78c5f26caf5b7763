use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use super::Session;
use crate::toolchain::TestRequest;

#[derive(Args)]
pub struct TestArgs {
    /// Only run tests whose name contains this string
    pub filter: Option<String>,

    /// Project directory, relative to the workspace
    #[arg(short, long)]
    pub project: Option<PathBuf>,

    /// Sub-directory of the workspace root to resolve the project against
    #[arg(long)]
    pub path: Option<PathBuf>,

    /// Pass -v to cargo
    #[arg(long)]
    pub cargo_verbose: bool,
}

impl From<&TestArgs> for TestRequest {
    fn from(args: &TestArgs) -> Self {
        TestRequest {
            workspace_path: args.path.clone(),
            project_path: args.project.clone(),
            verbose: args.cargo_verbose,
            filter: args.filter.clone(),
        }
    }
}

pub async fn run(args: &TestArgs, session: &Session) -> Result<()> {
    let report = session
        .toolchain()?
        .test(TestRequest::from(args))
        .await?;

    if session.json {
        super::print_json(&report)?;
    } else {
        if !report.stdout.is_empty() {
            print!("{}", report.stdout);
        }
        if !report.stderr.is_empty() {
            eprint!("{}", report.stderr);
        }
        println!();
        println!("{}", report.summary);
    }

    match report.error {
        Some(error) if !report.success => anyhow::bail!(error),
        _ => Ok(()),
    }
}
