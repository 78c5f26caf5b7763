//! Command allowlist.
//!
//! The only executables the sandbox will ever start. Most build tools have
//! subcommands that publish, uninstall or fetch arbitrary code, so trusting
//! the binary is not enough: entries that require a subcommand only accept
//! the listed first arguments.
//!
//! The table lives in code and is not read from configuration.

use tracing::warn;

use super::error::SecurityError;
use super::patterns;

/// One allowlisted executable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllowedCommand {
    command: &'static str,
    allowed_subcommands: Option<&'static [&'static str]>,
    require_subcommand: bool,
}

impl AllowedCommand {
    /// An executable whose first argument must be one of `subcommands`.
    ///
    /// Panics on an empty list; in a `const` table this fails the build.
    pub const fn with_subcommands(
        command: &'static str,
        subcommands: &'static [&'static str],
    ) -> Self {
        assert!(
            !subcommands.is_empty(),
            "an entry that requires a subcommand needs at least one"
        );
        Self {
            command,
            allowed_subcommands: Some(subcommands),
            require_subcommand: true,
        }
    }

    /// An executable that accepts any (pattern-clean) arguments.
    pub const fn any_args(command: &'static str) -> Self {
        Self {
            command,
            allowed_subcommands: None,
            require_subcommand: false,
        }
    }

    pub fn command(&self) -> &'static str {
        self.command
    }

    pub fn allowed_subcommands(&self) -> &'static [&'static str] {
        self.allowed_subcommands.unwrap_or(&[])
    }

    pub fn require_subcommand(&self) -> bool {
        self.require_subcommand
    }

    fn permits_subcommand(&self, first_arg: Option<&str>) -> bool {
        if !self.require_subcommand {
            return true;
        }
        match first_arg {
            Some(sub) => self.allowed_subcommands().contains(&sub),
            None => false,
        }
    }
}

/// The production allowlist.
pub const ALLOWED_COMMANDS: &[AllowedCommand] = &[
    AllowedCommand::with_subcommands(
        "cargo",
        &["build", "test", "check", "sails", "clean", "fmt", "clippy"],
    ),
    AllowedCommand::any_args("node"),
    AllowedCommand::with_subcommands("npm", &["init", "install", "run", "test", "pack"]),
    AllowedCommand::with_subcommands("pnpm", &["init", "install", "add", "run", "test", "pack"]),
    AllowedCommand::with_subcommands("yarn", &["init", "install", "add", "run", "test", "pack"]),
    AllowedCommand::with_subcommands("rustup", &["target", "show", "update"]),
];

/// A read-only view over an allowlist table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandAllowlist {
    entries: &'static [AllowedCommand],
}

impl Default for CommandAllowlist {
    fn default() -> Self {
        Self::builtin()
    }
}

impl CommandAllowlist {
    pub const fn new(entries: &'static [AllowedCommand]) -> Self {
        Self { entries }
    }

    pub const fn builtin() -> Self {
        Self::new(ALLOWED_COMMANDS)
    }

    pub fn entries(&self) -> &'static [AllowedCommand] {
        self.entries
    }

    /// Exact, case-sensitive lookup.
    pub fn find(&self, command: &str) -> Option<&'static AllowedCommand> {
        self.entries.iter().find(|entry| entry.command == command)
    }

    /// The security gate every invocation passes before a process is spawned.
    ///
    /// Both layers always run. If both reject, the allowlist verdict is
    /// returned and the pattern hit is logged.
    pub fn validate<S: AsRef<str>>(&self, command: &str, args: &[S]) -> Result<(), SecurityError> {
        let allowlisted = self.find(command).is_some_and(|entry| {
            entry.permits_subcommand(args.first().map(|arg| arg.as_ref()))
        });
        let pattern_check = patterns::check_arguments(args);

        if !allowlisted {
            if let Err(e) = &pattern_check {
                warn!("{} (also rejected by allowlist)", e);
            }
            return Err(SecurityError::CommandNotAllowed {
                command: command.to_string(),
                args: args.iter().map(|a| a.as_ref().to_string()).collect(),
            });
        }

        pattern_check
    }
}

/// Validate against the built-in table.
pub fn validate_command<S: AsRef<str>>(command: &str, args: &[S]) -> Result<(), SecurityError> {
    CommandAllowlist::builtin().validate(command, args)
}
