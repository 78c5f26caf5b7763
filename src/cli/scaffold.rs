use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use super::Session;
use crate::toolchain::template::{planned_files, project_vars};
use crate::toolchain::{
    ScaffoldMethod, ScaffoldReport, ScaffoldRequest, TemplateKind, validate_project_name,
};

#[derive(Args)]
pub struct ScaffoldArgs {
    /// Project name (must be a valid Rust crate name)
    pub name: String,

    /// Template to use when the Sails CLI is unavailable
    #[arg(short, long, value_enum, default_value_t = TemplateKind::Counter)]
    pub template: TemplateKind,

    /// Directory under the workspace root to create the project in
    #[arg(long)]
    pub path: Option<PathBuf>,

    /// Overwrite an existing project directory
    #[arg(short, long)]
    pub force: bool,

    /// Print the files the embedded template would create, then exit
    #[arg(long)]
    pub dry_run: bool,
}

impl From<&ScaffoldArgs> for ScaffoldRequest {
    fn from(args: &ScaffoldArgs) -> Self {
        ScaffoldRequest {
            name: args.name.clone(),
            template: args.template,
            workspace_path: args.path.clone(),
            force: args.force,
        }
    }
}

pub async fn run(args: &ScaffoldArgs, session: &Session) -> Result<()> {
    if args.dry_run {
        return dry_run(args);
    }

    let report = session
        .toolchain()?
        .scaffold(ScaffoldRequest::from(args))
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

fn dry_run(args: &ScaffoldArgs) -> Result<()> {
    validate_project_name(&args.name)?;

    let template = args.template.template();
    println!("{} ({})", template.display_name, template.kind);
    for file in planned_files(template, &project_vars(&args.name)) {
        println!("  {}/{}", args.name, file);
    }
    Ok(())
}

fn print_report(report: &ScaffoldReport) {
    if !report.success {
        return;
    }

    let method = match report.method {
        ScaffoldMethod::SailsCli => "cargo sails",
        ScaffoldMethod::EmbeddedTemplate => "embedded template",
    };
    println!(
        "Created {} (via {})",
        report.project_path.display(),
        method
    );
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
