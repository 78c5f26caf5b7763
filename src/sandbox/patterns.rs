//! Dangerous argument patterns.
//!
//! A second, independent layer behind the command allowlist. Processes are
//! never started through a shell, so these patterns are not needed for
//! correctness of argument passing; they reject arguments that look like
//! injection attempts before anything reaches the OS.
//!
//! The list is data. Bump [`PATTERN_SET_VERSION`] whenever an entry is added,
//! removed or changed so that logs can tell which rule set produced a verdict.

use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use super::error::SecurityError;

/// Version of [`DANGEROUS_PATTERNS`].
pub const PATTERN_SET_VERSION: u32 = 1;

/// One entry in the dangerous pattern list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DangerousPattern {
    /// Stable identifier, reported in [`SecurityError::DangerousArgument`].
    pub name: &'static str,
    pub description: &'static str,
    /// Regular expression matched anywhere in a single argument.
    pub regex: &'static str,
}

pub const DANGEROUS_PATTERNS: &[DangerousPattern] = &[
    DangerousPattern {
        name: "shell-metacharacter",
        description: "Shell metacharacters (; & | ` $)",
        regex: r"[;&|`$]",
    },
    DangerousPattern {
        name: "command-substitution",
        description: "Command substitution with $(...)",
        regex: r"\$\(",
    },
    DangerousPattern {
        name: "backtick-substitution",
        description: "Command substitution with backticks",
        regex: r"`",
    },
    DangerousPattern {
        name: "parent-traversal",
        description: "Parent directory traversal (../ or ..\\)",
        regex: r"\.\.[/\\]",
    },
    DangerousPattern {
        name: "redirect-to-root",
        description: "Output redirection into the filesystem root",
        regex: r">\s*/",
    },
    DangerousPattern {
        name: "read-from-root",
        description: "Input redirection from the filesystem root",
        regex: r"<\s*/",
    },
];

static COMPILED: LazyLock<Vec<(&'static DangerousPattern, Regex)>> = LazyLock::new(|| {
    DANGEROUS_PATTERNS
        .iter()
        .map(|pattern| (pattern, compile_regex(pattern.regex)))
        .collect()
});

/// Compile a built-in expression. Only for literals covered by a test.
pub(crate) fn compile_regex(pattern: &str) -> Regex {
    match Regex::new(pattern) {
        Ok(regex) => regex,
        Err(err) => panic!("invalid built-in pattern `{pattern}`: {err}"),
    }
}

/// Return the first pattern that matches `arg`, if any.
pub fn scan_argument(arg: &str) -> Option<&'static DangerousPattern> {
    COMPILED
        .iter()
        .find(|(_, regex)| regex.is_match(arg))
        .map(|(pattern, _)| *pattern)
}

/// Check every argument against the pattern list.
pub fn check_arguments<S: AsRef<str>>(args: &[S]) -> Result<(), SecurityError> {
    for arg in args {
        let arg = arg.as_ref();
        if let Some(pattern) = scan_argument(arg) {
            debug!(
                pattern = pattern.name,
                version = PATTERN_SET_VERSION,
                "rejected argument {:?}",
                arg
            );
            return Err(SecurityError::DangerousArgument {
                argument: arg.to_string(),
                pattern: pattern.name,
            });
        }
    }
    Ok(())
}
