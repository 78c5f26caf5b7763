//! Workspace path containment.
//!
//! Every path a toolchain operation writes to, or uses as a working
//! directory, goes through [`resolve_within_root`] first.
//!
//! Containment is purely lexical: `.` and `..` segments and duplicate
//! separators are collapsed, then the result is compared against the root.
//! Symbolic links on disk are not re-resolved, so a link inside the root
//! that points outside of it is not caught here. The guard stops traversal
//! in caller-supplied path strings; it is not a filesystem jail.

use path_clean::PathClean;
use std::fs;
use std::io;
use std::path::{Component, MAIN_SEPARATOR, Path, PathBuf};

use super::error::{SandboxError, SecurityError};

/// Lexically normalize a path. An empty path normalizes to `.`.
pub fn normalize(path: impl AsRef<Path>) -> PathBuf {
    path.as_ref().clean()
}

/// Resolve `input` against `root` and reject anything that lands outside it.
///
/// Relative inputs are joined under the root; absolute inputs are accepted
/// only if they already point inside the root. The returned path is
/// absolute and normalized.
pub fn resolve_within_root(
    root: impl AsRef<Path>,
    input: impl AsRef<Path>,
) -> Result<PathBuf, SecurityError> {
    let root = absolute_normalized(root.as_ref());
    let input = input.as_ref();

    let resolved = if input.is_absolute() {
        input.clean()
    } else {
        root.join(input).clean()
    };

    assert_within_root(&root, &resolved)?;
    Ok(resolved)
}

/// Fail with [`SecurityError::PathViolation`] unless `target` is `root` or
/// nested under it.
///
/// Two checks, both required:
/// 1. the lexical path from root to target neither starts with `..` nor is
///    absolute;
/// 2. the target string equals the root string, or starts with the root
///    string followed by a separator.
pub fn assert_within_root(
    root: impl AsRef<Path>,
    target: impl AsRef<Path>,
) -> Result<(), SecurityError> {
    let root = absolute_normalized(root.as_ref());
    let target = absolute_normalized(target.as_ref());

    let violation = || SecurityError::PathViolation {
        path: target.clone(),
        root: root.clone(),
    };

    let relative = lexical_relative(&root, &target);
    if relative.is_absolute()
        || relative.has_root()
        || matches!(relative.components().next(), Some(Component::ParentDir))
    {
        return Err(violation());
    }

    if !has_root_prefix(&root, &target) {
        return Err(violation());
    }

    Ok(())
}

/// Non-failing form of [`assert_within_root`].
pub fn is_within_root(root: impl AsRef<Path>, target: impl AsRef<Path>) -> bool {
    assert_within_root(root, target).is_ok()
}

/// Resolve `dir` within `root` and create it (and its parents) if missing.
pub fn ensure_directory_within_root(
    root: impl AsRef<Path>,
    dir: impl AsRef<Path>,
) -> Result<PathBuf, SandboxError> {
    let resolved = resolve_within_root(root, dir)?;

    match fs::metadata(&resolved) {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => return Err(SandboxError::NotADirectory(resolved)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            fs::create_dir_all(&resolved).map_err(|source| SandboxError::Io {
                path: resolved.clone(),
                source,
            })?;
        }
        Err(source) => {
            return Err(SandboxError::Io {
                path: resolved,
                source,
            });
        }
    }

    Ok(resolved)
}

/// Join `segments` with `/` and resolve within `root`.
///
/// Returns `None` exactly when [`resolve_within_root`] would fail. Use this
/// where escaping the root is an expected outcome rather than a caller bug.
pub fn safe_path<I, S>(root: impl AsRef<Path>, segments: I) -> Option<PathBuf>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let combined = join_segments(segments);
    resolve_within_root(root, combined).ok()
}

/// Join `segments` with `/` and normalize, without any root check.
pub fn join_safe<I, S>(segments: I) -> PathBuf
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    normalize(join_segments(segments))
}

/// A workspace root with the guard operations bound to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxRoot {
    root: PathBuf,
}

impl SandboxRoot {
    /// Relative roots are made absolute against the current directory.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: absolute_normalized(root.as_ref()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn resolve(&self, input: impl AsRef<Path>) -> Result<PathBuf, SecurityError> {
        resolve_within_root(&self.root, input)
    }

    pub fn contains(&self, target: impl AsRef<Path>) -> bool {
        is_within_root(&self.root, target)
    }

    pub fn ensure_dir(&self, dir: impl AsRef<Path>) -> Result<PathBuf, SandboxError> {
        ensure_directory_within_root(&self.root, dir)
    }

    pub fn safe_path<I, S>(&self, segments: I) -> Option<PathBuf>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        safe_path(&self.root, segments)
    }

    /// Narrow the sandbox to a sub-directory of this root.
    pub fn narrow(&self, input: impl AsRef<Path>) -> Result<SandboxRoot, SecurityError> {
        Ok(Self {
            root: self.resolve(input)?,
        })
    }

    /// Lexical path from `from` to `to`, both resolved inside the root.
    pub fn relative_between(
        &self,
        from: impl AsRef<Path>,
        to: impl AsRef<Path>,
    ) -> Result<PathBuf, SecurityError> {
        Ok(lexical_relative(&self.resolve(from)?, &self.resolve(to)?))
    }
}

fn absolute_normalized(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.clean();
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path).clean(),
        Err(_) => path.clean(),
    }
}

fn join_segments<I, S>(segments: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    segments
        .into_iter()
        .map(|s| s.as_ref().to_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Lexical path from `root` to `target`. Both must already be normalized.
///
/// When the two share no leading component (different drive on Windows)
/// the target itself is returned, which is absolute.
fn lexical_relative(root: &Path, target: &Path) -> PathBuf {
    let root_parts: Vec<Component<'_>> = root.components().collect();
    let target_parts: Vec<Component<'_>> = target.components().collect();

    let common = root_parts
        .iter()
        .zip(target_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    if common == 0 {
        return target.to_path_buf();
    }

    let mut relative = PathBuf::new();
    for part in &root_parts[common..] {
        match part {
            Component::Normal(_) => relative.push(".."),
            _ => return target.to_path_buf(),
        }
    }
    for part in &target_parts[common..] {
        relative.push(part.as_os_str());
    }
    relative
}

fn has_root_prefix(root: &Path, target: &Path) -> bool {
    let root_str = root.to_string_lossy();
    let target_str = target.to_string_lossy();

    if target_str == root_str {
        return true;
    }

    let mut prefix = root_str.into_owned();
    if !prefix.ends_with(MAIN_SEPARATOR) {
        prefix.push(MAIN_SEPARATOR);
    }
    target_str.starts_with(&prefix)
}
