//! ---
//! cm_section: "07-fault-injection"
//! cm_subsection: "module"
//! cm_type: "source"
//! cm_scope: "code"
//! cm_description: "Error taxonomy for settings validation and injected failures."
//! cm_version: "v0.0.0-prealpha"
//! cm_owner: "tbd"
//! ---
use std::path::PathBuf;

use thiserror::Error;

/// Rejection raised while loading or replacing [`Settings`](crate::Settings).
///
/// A rejected payload never reaches the running engine; the previous settings stay active.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("level must be between 1 and {max}, got {level}")]
    InvalidLevel { level: u32, max: u32 },
    #[error("latency range start ({start} ms) must not exceed range end ({end} ms)")]
    InvalidLatencyRange { start: u64, end: u64 },
    #[error("chaos monkey is enabled but no assault is chosen")]
    NoAssaultChosen,
    #[error("unknown assault kind '{0}'")]
    UnknownAssault(String),
    #[error("unknown boundary kind '{0}'")]
    UnknownBoundary(String),
    #[error("custom assault '{0}' is chosen but has no properties")]
    MissingCustomAssault(String),
    #[error("exception assault requires a non-empty error type")]
    EmptyErrorType,
    #[error("unable to read settings {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Failure injected into the host call path.
///
/// This is the product working as intended: hosts surface it through their own
/// error handling exactly like any other failure of the intercepted call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssaultError {
    #[error("{error_type}: {message}")]
    Injected { error_type: String, message: String },
    #[error("custom assault '{assault}' failed: {message}")]
    Custom { assault: String, message: String },
}

impl AssaultError {
    /// Error type reported to the host (`RuntimeError`, custom assault name, ...).
    pub fn error_type(&self) -> &str {
        match self {
            AssaultError::Injected { error_type, .. } => error_type,
            AssaultError::Custom { assault, .. } => assault,
        }
    }
}
