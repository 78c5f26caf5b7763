//! Executable lookup on the search path, without a shell.
//!
//! A miss is a normal outcome ("tool not installed") and is reported as
//! `None`, never as an error.

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

#[cfg(windows)]
const EXTENSIONS: &[&str] = &["", ".exe", ".cmd", ".bat", ".com"];

#[cfg(not(windows))]
const EXTENSIONS: &[&str] = &[""];

/// Locate `command` using the process `PATH`.
pub fn which(command: &str) -> Option<PathBuf> {
    let search_path = std::env::var_os("PATH");
    which_in(command, search_path.as_deref())
}

/// Locate `command` in an explicit search path value.
///
/// Absolute commands are checked directly. Empty search path entries are
/// skipped rather than treated as the current directory.
pub fn which_in(command: &str, search_path: Option<&OsStr>) -> Option<PathBuf> {
    if command.is_empty() {
        return None;
    }

    let direct = Path::new(command);
    if direct.is_absolute() || direct.has_root() {
        return is_executable(direct).then(|| direct.to_path_buf());
    }

    for dir in std::env::split_paths(search_path?) {
        if dir.as_os_str().is_empty() {
            continue;
        }
        for ext in EXTENSIONS {
            let candidate = dir.join(format!("{command}{ext}"));
            if is_executable(&candidate) {
                return Some(candidate);
            }
        }
    }

    None
}

/// Unix: a regular file with an execute bit that applies to this process
/// (owner bit if we own it, group bit if we share its group, or other bit).
#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;

    let Ok(meta) = fs::metadata(path) else {
        return false;
    };
    if !meta.is_file() {
        return false;
    }

    let mode = meta.mode();
    let uid = nix::unistd::getuid().as_raw();
    let gid = nix::unistd::getgid().as_raw();

    (meta.uid() == uid && mode & 0o100 != 0)
        || (meta.gid() == gid && mode & 0o010 != 0)
        || mode & 0o001 != 0
}

/// Windows: existence with one of the expected suffixes is enough.
#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.is_file()).unwrap_or(false)
}
