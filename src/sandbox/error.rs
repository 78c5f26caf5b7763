//! Error taxonomy for the sandbox.
//!
//! Only policy violations are errors. Operational failures of a spawned tool
//! (binary missing, bad working directory, timeout, non-zero exit) are encoded
//! in [`ExecutionResult`](super::ExecutionResult) instead.

use std::path::PathBuf;
use thiserror::Error;

/// A request that must not proceed.
///
/// Always raised synchronously, before any process is created or any file is
/// touched. Callers translate it into a user-facing failure and never retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SecurityError {
    /// A path resolved outside the sandbox root.
    #[error("Path \"{}\" is outside allowed root \"{}\"", path.display(), root.display())]
    PathViolation { path: PathBuf, root: PathBuf },

    /// The executable, or its subcommand, is not in the allowlist.
    #[error("Command not allowed: {}", format_invocation(command, args))]
    CommandNotAllowed { command: String, args: Vec<String> },

    /// An argument matched one of the dangerous patterns.
    #[error("Argument contains dangerous pattern ({pattern}): \"{argument}\"")]
    DangerousArgument {
        argument: String,
        pattern: &'static str,
    },
}

impl SecurityError {
    pub fn is_path_violation(&self) -> bool {
        matches!(self, Self::PathViolation { .. })
    }

    pub fn is_command_not_allowed(&self) -> bool {
        matches!(self, Self::CommandNotAllowed { .. })
    }

    pub fn is_dangerous_argument(&self) -> bool {
        matches!(self, Self::DangerousArgument { .. })
    }
}

/// Errors from helpers that touch the filesystem after the containment check.
#[derive(Debug, Error)]
pub enum SandboxError {
    #[error(transparent)]
    Security(#[from] SecurityError),

    #[error("Path exists but is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn format_invocation(command: &str, args: &[String]) -> String {
    if args.is_empty() {
        command.to_string()
    } else {
        format!("{} {}", command, args.join(" "))
    }
}
