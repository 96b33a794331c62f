use thiserror::Error;

/// Structural errors raised while building or querying a form pack.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("form pack must contain at least one version")]
    NoVersions,

    #[error("duplicate version id: {id}")]
    DuplicateVersion { id: String },

    #[error("duplicate field name '{name}' in section '{section}'")]
    DuplicateField { section: String, name: String },

    #[error("unknown version: {selector}")]
    UnknownVersion { selector: String },

    #[error("version index {index} out of range ({len} versions)")]
    VersionIndexOutOfRange { index: usize, len: usize },
}

pub type Result<T> = std::result::Result<T, ModelError>;
