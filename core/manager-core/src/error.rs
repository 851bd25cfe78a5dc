//! Error types for tomcat-manager-core operations.
//!
//! Subprocess failures are never represented here: a non-zero exit is data
//! carried by [`crate::runner::ShellResponse`]. These variants cover the
//! operations that can genuinely fail (configuration I/O, descriptor parsing,
//! lookups by name).

use std::path::PathBuf;

/// All errors that can occur in tomcat-manager-core operations.
#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    // ─────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Home directory not found")]
    HomeDirNotFound,

    #[error("Configuration write failed: {path}: {source}")]
    ConfigWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unknown preference: {0}")]
    UnknownPreference(String),

    #[error("Invalid value for {key}: {value}")]
    InvalidPreferenceValue { key: String, value: String },

    // ─────────────────────────────────────────────────────────────────────
    // Descriptor Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Build descriptor unreadable: {path}: {source}")]
    DescriptorRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Build descriptor malformed: {path}: {details}")]
    DescriptorMalformed { path: PathBuf, details: String },

    // ─────────────────────────────────────────────────────────────────────
    // Application Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Application not found: {0}")]
    AppNotFound(String),

    #[error("Environment not found: {0}")]
    EnvironmentNotFound(String),

    // ─────────────────────────────────────────────────────────────────────
    // I/O Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Manager control loop is no longer running")]
    ManagerStopped,
}

/// Convenience type alias for Results using ManagerError.
pub type Result<T> = std::result::Result<T, ManagerError>;

impl From<ManagerError> for String {
    fn from(err: ManagerError) -> String {
        err.to_string()
    }
}
