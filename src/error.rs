//! Error types for the script engine

use thiserror::Error;

use crate::script::ScriptId;

/// Result type for script engine operations
pub type Result<T> = std::result::Result<T, ScriptError>;

/// Script engine errors
#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("Malformed content: {0}")]
    MalformedContent(String),

    #[error("Homebrew character '{id}' belongs to script {owner}, cannot be redefined by script {claimant}")]
    HomebrewIdConflict {
        id: String,
        owner: ScriptId,
        claimant: ScriptId,
    },

    #[error("Script {script} is owned by '{owner}'")]
    OwnershipViolation { script: ScriptId, owner: String },

    #[error("Version not found: script {script} version {version}")]
    VersionNotFound { script: ScriptId, version: String },

    #[error("Script not found: {0}")]
    ScriptNotFound(String),

    #[error("Version {version} of script {script} already exists with different content")]
    InvalidVersionOrdering { script: ScriptId, version: String },

    #[error("Version {version} of script {script} already stored")]
    DuplicateVersion { script: ScriptId, version: String },

    #[error("Invalid version: {0}")]
    InvalidVersion(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Semver error: {0}")]
    Semver(#[from] semver::Error),
}

impl ScriptError {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        ScriptError::MalformedContent(message.into())
    }
}
