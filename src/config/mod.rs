pub mod env;
pub mod manifest;

pub use env::Credentials;
pub use manifest::{
    load_from_path, load_from_str, load_or_default, ConfigError, ProjectManifest, ProjectSection,
    ValidationError, ValidationIssue, MANIFEST_FILE,
};
