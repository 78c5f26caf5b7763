//! CLI subcommand: `varaforge paths`
//!
//! Prints all resolved XDG-compliant paths for debugging and scripting.

use anyhow::Result;

use crate::paths::Paths;

pub fn run() -> Result<()> {
    let paths = Paths::resolve()?;

    println!("Varaforge Paths (XDG Base Directory)");
    println!("====================================");
    println!();
    println!("Config:     {}", paths.config_dir.display());
    println!("  config.toml:    {}", paths.config_file().display());
    println!();
    println!("State:      {}", paths.state_dir.display());
    println!("  logs:           {}", paths.logs_dir().display());
    println!();
    match paths.runtime_dir {
        Some(ref dir) => println!("Runtime:    {}", dir.display()),
        None => println!("Runtime:    (not available)"),
    }
    println!("  build lock:     {}", paths.build_lock().display());
    println!();
    match paths.workspace {
        Some(ref dir) => println!("Workspace:  {} (VARAFORGE_WORKSPACE)", dir.display()),
        None => println!("Workspace:  (from config or current directory)"),
    }

    Ok(())
}
