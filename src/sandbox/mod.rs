//! Sandboxed execution of developer tools.
//!
//! Every external process goes through [`ProcessRunner`]: the command and its
//! arguments are checked against a fixed allowlist and a dangerous-pattern
//! list, the executable is resolved without a shell, and the child runs under
//! a timeout with capped output. Filesystem paths supplied by callers are
//! confined to a root with [`path_guard`].
//!
//! Containment here is lexical. It does not follow symlinks and is not an OS
//! jail.

pub mod allowlist;
pub mod error;
pub mod path_guard;
pub mod patterns;
pub mod runner;
pub mod which;

pub use allowlist::{ALLOWED_COMMANDS, AllowedCommand, CommandAllowlist, validate_command};
pub use error::{SandboxError, SecurityError};
pub use path_guard::{
    SandboxRoot, assert_within_root, ensure_directory_within_root, is_within_root, join_safe,
    resolve_within_root, safe_path,
};
pub use patterns::{DANGEROUS_PATTERNS, DangerousPattern, PATTERN_SET_VERSION};
pub use runner::{
    ExecutionRequest, ExecutionResult, ProcessRunner, RunnerLimits, SpawnOptions, Termination,
    command_exists, safe_spawn,
};
pub use which::{which, which_in};
