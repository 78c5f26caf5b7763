//! Embedded project templates.
//!
//! Template files are compiled into the binary. Paths and contents may
//! contain `{{KEY}}` placeholders; every file is written through
//! [`SandboxRoot`] so a rendered path can never leave the project directory.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;

use crate::sandbox::SandboxRoot;

/// Placeholder every template receives.
pub const PROJECT_NAME: &str = "PROJECT_NAME";

pub type TemplateVars = BTreeMap<String, String>;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum TemplateKind {
    /// Counter program with a single Sails service
    #[default]
    Counter,
}

impl TemplateKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TemplateKind::Counter => "counter",
        }
    }

    pub fn template(self) -> &'static Template {
        match self {
            TemplateKind::Counter => &COUNTER,
        }
    }
}

impl fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TemplateFile {
    /// Path relative to the project directory, may contain placeholders.
    pub path: &'static str,
    pub contents: &'static str,
}

#[derive(Debug)]
pub struct Template {
    pub kind: TemplateKind,
    pub display_name: &'static str,
    pub description: &'static str,
    pub files: &'static [TemplateFile],
    pub placeholders: &'static [&'static str],
}

const COUNTER_FILES: &[TemplateFile] = &[
    TemplateFile {
        path: "Cargo.toml",
        contents: include_str!("../../templates/counter/Cargo.toml.tmpl"),
    },
    TemplateFile {
        path: "build.rs",
        contents: include_str!("../../templates/counter/build.rs.tmpl"),
    },
    TemplateFile {
        path: "idl/{{PROJECT_NAME}}.idl",
        contents: include_str!("../../templates/counter/counter.idl.tmpl"),
    },
    TemplateFile {
        path: "src/lib.rs",
        contents: include_str!("../../templates/counter/lib.rs.tmpl"),
    },
    TemplateFile {
        path: "tests/counter_test.rs",
        contents: include_str!("../../templates/counter/counter_test.rs.tmpl"),
    },
    TemplateFile {
        path: "README.md",
        contents: include_str!("../../templates/counter/README.md.tmpl"),
    },
    TemplateFile {
        path: ".gitignore",
        contents: include_str!("../../templates/counter/gitignore.tmpl"),
    },
    TemplateFile {
        path: "rust-toolchain.toml",
        contents: include_str!("../../templates/counter/rust-toolchain.toml.tmpl"),
    },
];

pub static COUNTER: Template = Template {
    kind: TemplateKind::Counter,
    display_name: "Counter Program",
    description: "A simple counter smart program demonstrating basic Sails patterns",
    files: COUNTER_FILES,
    placeholders: &[PROJECT_NAME],
};

pub static TEMPLATES: &[&Template] = &[&COUNTER];

/// Variables for a freshly named project.
pub fn project_vars(name: &str) -> TemplateVars {
    TemplateVars::from([(PROJECT_NAME.to_string(), name.to_string())])
}

/// Replace every `{{KEY}}` in `text`. Unknown placeholders are left as is.
pub fn render(text: &str, vars: &TemplateVars) -> String {
    vars.iter().fold(text.to_string(), |acc, (key, value)| {
        acc.replace(&format!("{{{{{key}}}}}"), value)
    })
}

impl Template {
    /// Write every file under `project`, returning the rendered relative paths.
    pub fn render_into(&self, project: &SandboxRoot, vars: &TemplateVars) -> Result<Vec<String>> {
        for required in self.placeholders {
            if !vars.contains_key(*required) {
                anyhow::bail!("Template {} requires variable {}", self.kind, required);
            }
        }

        write_files(self.files, project, vars)
    }

    pub fn next_steps(&self, project_name: &str, target: &str) -> Vec<String> {
        match self.kind {
            TemplateKind::Counter => vec![
                format!("cd {}", project_name),
                format!("Add target: rustup target add {}", target),
                "Build: cargo build --release".to_string(),
                format!("Output: target/{}/release/", target),
                "  - *.opt.wasm (deploy this)".to_string(),
                "  - *.idl (interface)".to_string(),
                "Test: cargo test".to_string(),
            ],
        }
    }

    pub fn file_paths(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.files.iter().map(|f| f.path)
    }
}

/// Render `files` into `dest`, returning the rendered relative paths.
pub(crate) fn write_files(
    files: &[TemplateFile],
    dest: &SandboxRoot,
    vars: &TemplateVars,
) -> Result<Vec<String>> {
    fs::create_dir_all(dest.path())
        .with_context(|| format!("Failed to create {}", dest.path().display()))?;

    let mut created = Vec::with_capacity(files.len());
    for file in files {
        let relative = render(file.path, vars);
        write_file(dest, &relative, &render(file.contents, vars))?;
        created.push(relative);
    }
    Ok(created)
}

/// Write `contents` to `relative` under `dest`, creating parent directories.
fn write_file(dest: &SandboxRoot, relative: &str, contents: &str) -> Result<()> {
    let target = dest.resolve(relative)?;
    if let Some(parent) = target.parent() {
        dest.ensure_dir(parent)?;
    }
    fs::write(&target, contents)
        .with_context(|| format!("Failed to write {}", target.display()))
}

const RUST_KEYWORDS: &[&str] = &[
    "as", "break", "const", "continue", "crate", "else", "enum", "extern", "false", "fn", "for",
    "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub", "ref", "return",
    "self", "Self", "static", "struct", "super", "trait", "true", "type", "unsafe", "use", "where",
    "while", "async", "await", "dyn", "abstract", "become", "box", "do", "final", "macro",
    "override", "priv", "typeof", "unsized", "virtual", "yield", "try", "gen",
];

const MAX_PROJECT_NAME_LEN: usize = 64;

/// Project names must be valid crate names and usable as a single directory.
pub fn validate_project_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        anyhow::bail!("Project name cannot be empty");
    }
    if name.len() > MAX_PROJECT_NAME_LEN {
        anyhow::bail!(
            "Project name must be at most {} characters",
            MAX_PROJECT_NAME_LEN
        );
    }

    let mut chars = name.chars();
    let starts_with_letter = chars.next().is_some_and(|c| c.is_ascii_lowercase());
    let rest_valid =
        chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-');
    if !starts_with_letter || !rest_valid {
        anyhow::bail!(
            "Project name must start with a letter and contain only lowercase letters, numbers, underscores, or hyphens"
        );
    }

    if RUST_KEYWORDS.contains(&name) {
        anyhow::bail!("\"{}\" is a Rust reserved keyword", name);
    }

    Ok(())
}

/// Rendered relative paths of `template` for `vars`, without touching disk.
pub fn planned_files(template: &Template, vars: &TemplateVars) -> Vec<String> {
    template.file_paths().map(|p| render(p, vars)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_substitutes_every_occurrence() {
        let vars = project_vars("my_counter");
        assert_eq!(
            render("{{PROJECT_NAME}}/{{PROJECT_NAME}}.idl", &vars),
            "my_counter/my_counter.idl"
        );
        assert_eq!(render("{{OTHER}} stays", &vars), "{{OTHER}} stays");
        assert_eq!(render("no placeholders", &vars), "no placeholders");
    }

    #[test]
    fn counter_template_mentions_project_name() {
        let cargo = COUNTER
            .files
            .iter()
            .find(|f| f.path == "Cargo.toml")
            .unwrap();
        let rendered = render(cargo.contents, &project_vars("demo"));
        assert!(rendered.contains("name = \"demo\""));
        assert!(!rendered.contains("{{"));
    }

    #[test]
    fn planned_files_render_paths() {
        let files = planned_files(&COUNTER, &project_vars("demo"));
        assert!(files.contains(&"idl/demo.idl".to_string()));
        assert!(files.contains(&"src/lib.rs".to_string()));
        assert_eq!(files.len(), COUNTER.files.len());
    }

    #[test]
    fn render_into_writes_all_files() {
        let tmp = tempfile::tempdir().unwrap();
        let project = SandboxRoot::new(tmp.path().join("demo"));

        let created = COUNTER
            .render_into(&project, &project_vars("demo"))
            .unwrap();

        assert_eq!(created.len(), COUNTER.files.len());
        for rel in &created {
            assert!(project.path().join(rel).is_file(), "{rel} missing");
        }
        let manifest = fs::read_to_string(project.path().join("Cargo.toml")).unwrap();
        assert!(manifest.contains("name = \"demo\""));
        assert!(project.path().join("idl/demo.idl").is_file());
    }

    #[test]
    fn render_into_rejects_escaping_paths() {
        static EVIL_FILES: &[TemplateFile] = &[TemplateFile {
            path: "{{PROJECT_NAME}}/../../escape.txt",
            contents: "x",
        }];
        static EVIL: Template = Template {
            kind: TemplateKind::Counter,
            display_name: "evil",
            description: "",
            files: EVIL_FILES,
            placeholders: &[PROJECT_NAME],
        };

        let tmp = tempfile::tempdir().unwrap();
        let project = SandboxRoot::new(tmp.path().join("demo"));
        let err = EVIL
            .render_into(&project, &project_vars("demo"))
            .unwrap_err();

        assert!(
            err.downcast_ref::<crate::sandbox::SecurityError>()
                .is_some_and(|e| e.is_path_violation())
        );
        assert!(!tmp.path().join("escape.txt").exists());
    }

    #[test]
    fn render_into_requires_placeholders() {
        let tmp = tempfile::tempdir().unwrap();
        let project = SandboxRoot::new(tmp.path().join("demo"));
        assert!(COUNTER.render_into(&project, &TemplateVars::new()).is_err());
    }

    #[test]
    fn project_name_validation() {
        for ok in ["counter", "my-program", "my_program2", "a"] {
            assert!(validate_project_name(ok).is_ok(), "{ok}");
        }
        for bad in [
            "",
            "   ",
            "MyProgram",
            "1program",
            "_program",
            "my program",
            "../escape",
            "a/b",
            "fn",
            "self",
            "async",
        ] {
            assert!(validate_project_name(bad).is_err(), "{bad:?}");
        }
        assert!(validate_project_name(&"a".repeat(65)).is_err());
        assert!(validate_project_name(&"a".repeat(64)).is_ok());
    }

    #[test]
    fn keyword_error_names_the_keyword() {
        let err = validate_project_name("struct").unwrap_err();
        assert!(err.to_string().contains("reserved keyword"));
    }

    #[test]
    fn template_kind_round_trip() {
        assert_eq!(TemplateKind::default().to_string(), "counter");
        assert_eq!(TemplateKind::Counter.template().display_name, "Counter Program");
        assert_eq!(TEMPLATES.len(), 1);
    }
}
