//! The optional `queryscope.toml` project manifest.
//!
//! Controls CLI source discovery only; the library core never reads it.

use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub const MANIFEST_FILE: &str = "queryscope.toml";

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ProjectManifest {
    #[serde(default)]
    pub project: ProjectSection,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProjectSection {
    /// Directories to scan, relative to the project root
    #[serde(default = "default_roots")]
    pub roots: Vec<String>,
    /// Directory names skipped during discovery
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,
}

impl Default for ProjectSection {
    fn default() -> Self {
        Self {
            roots: default_roots(),
            exclude: default_exclude(),
        }
    }
}

fn default_roots() -> Vec<String> {
    vec![".".to_string()]
}

fn default_exclude() -> Vec<String> {
    ["node_modules", ".git", "dist", "build", "out"]
        .iter()
        .map(|name| name.to_string())
        .collect()
}

impl ProjectManifest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.project.roots.is_empty() {
            issues.push(ValidationIssue::EmptyRoots);
        }
        for root in &self.project.roots {
            if root.trim().is_empty() {
                issues.push(ValidationIssue::BlankEntry { field: "roots" });
            } else if Path::new(root).is_absolute() {
                issues.push(ValidationIssue::AbsoluteRoot { root: root.clone() });
            }
        }
        for name in &self.project.exclude {
            if name.trim().is_empty() {
                issues.push(ValidationIssue::BlankEntry { field: "exclude" });
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

#[derive(Debug)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

#[derive(Debug)]
pub enum ValidationIssue {
    EmptyRoots,
    BlankEntry { field: &'static str },
    AbsoluteRoot { root: String },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, issue) in self.issues.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            match issue {
                ValidationIssue::EmptyRoots => write!(f, "project.roots must not be empty")?,
                ValidationIssue::BlankEntry { field } => {
                    write!(f, "project.{field} contains a blank entry")?
                }
                ValidationIssue::AbsoluteRoot { root } => {
                    write!(f, "project root '{root}' must be relative")?
                }
            }
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Toml {
        path: Option<PathBuf>,
        source: toml_edit::de::Error,
    },
    Validation {
        path: Option<PathBuf>,
        source: ValidationError,
    },
}

impl ConfigError {
    fn with_path(self, path: &Path) -> Self {
        let path = path.to_path_buf();
        match self {
            ConfigError::Toml { path: None, source } => ConfigError::Toml {
                path: Some(path),
                source,
            },
            ConfigError::Validation { path: None, source } => ConfigError::Validation {
                path: Some(path),
                source,
            },
            other => other,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "failed to read manifest from {}: {}", path.display(), source)
            }
            ConfigError::Toml { path, source } => match path {
                Some(path) => {
                    write!(f, "failed to parse manifest TOML ({}): {}", path.display(), source)
                }
                None => write!(f, "failed to parse manifest TOML: {}", source),
            },
            ConfigError::Validation { path, source } => match path {
                Some(path) => write!(f, "invalid manifest ({}): {}", path.display(), source),
                None => write!(f, "invalid manifest: {}", source),
            },
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Toml { source, .. } => Some(source),
            ConfigError::Validation { source, .. } => Some(source),
        }
    }
}

pub fn load_from_str(input: &str) -> Result<ProjectManifest, ConfigError> {
    let manifest: ProjectManifest =
        toml_edit::de::from_str(input).map_err(|source| ConfigError::Toml { path: None, source })?;
    manifest
        .validate()
        .map_err(|source| ConfigError::Validation { path: None, source })?;
    Ok(manifest)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<ProjectManifest, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_from_str(&contents).map_err(|error| error.with_path(path))
}

/// Load `<project_root>/queryscope.toml` when present, defaults otherwise.
pub fn load_or_default(project_root: &Path) -> Result<ProjectManifest, ConfigError> {
    let path = project_root.join(MANIFEST_FILE);
    if path.exists() {
        load_from_path(path)
    } else {
        Ok(ProjectManifest::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_scan_everything_but_noise() {
        let manifest = ProjectManifest::default();
        assert_eq!(manifest.project.roots, vec![".".to_string()]);
        assert!(manifest
            .project
            .exclude
            .contains(&"node_modules".to_string()));
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn parses_roots_and_exclude() {
        let manifest = load_from_str(
            r#"
[project]
roots = ["src", "app"]
exclude = ["node_modules", "generated"]
"#,
        )
        .unwrap();
        assert_eq!(manifest.project.roots, vec!["src", "app"]);
        assert_eq!(manifest.project.exclude, vec!["node_modules", "generated"]);
    }

    #[test]
    fn missing_sections_get_defaults() {
        let manifest = load_from_str("").unwrap();
        assert_eq!(manifest.project.roots, vec!["."]);
    }

    #[test]
    fn empty_roots_rejected() {
        let result = load_from_str("[project]\nroots = []\n");
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn absolute_root_rejected() {
        let result = load_from_str("[project]\nroots = [\"/etc\"]\n");
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn malformed_toml_rejected() {
        let result = load_from_str("[project\nroots = [");
        assert!(matches!(result, Err(ConfigError::Toml { .. })));
    }

    #[test]
    fn load_or_default_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = load_or_default(dir.path()).unwrap();
        assert_eq!(manifest.project.roots, vec!["."]);
    }

    #[test]
    fn load_or_default_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(MANIFEST_FILE),
            "[project]\nroots = [\"web/src\"]\n",
        )
        .unwrap();

        let manifest = load_or_default(dir.path()).unwrap();
        assert_eq!(manifest.project.roots, vec!["web/src"]);
    }
}
