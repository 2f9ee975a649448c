//! Error taxonomy for PEMU tooling.

use std::path::PathBuf;

use crate::version::VersionError;

/// Errors that abort a command before or while the engine runs.
#[derive(Debug, thiserror::Error)]
pub enum PemuError {
    #[error("Java couldn't be found, please set its path in the Extension's Settings.")]
    InterpreterNotFound,

    #[error("PEMU Jar path isn't valid, please set it in the Extension's Settings.")]
    InvalidEnginePath(PathBuf),

    #[error("Please open the file you want to perform the command on.")]
    NoActiveFile,

    #[error("File's URI can only be of type \"file\". (got \"{0}\")")]
    UnsupportedScheme(String),

    #[error("command cancelled")]
    Cancelled,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to start engine: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("invalid version: {0}")]
    Version(#[from] VersionError),

    #[error("config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl PemuError {
    /// Whether this error comes from unresolved or invalid settings.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InterpreterNotFound | Self::InvalidEnginePath(_) | Self::Config(_) | Self::Toml(_)
        )
    }

    /// Whether this error comes from missing or unusable user input.
    pub fn is_input(&self) -> bool {
        matches!(
            self,
            Self::NoActiveFile | Self::UnsupportedScheme(_) | Self::Cancelled
        )
    }
}

/// Result type for PEMU operations.
pub type Result<T> = std::result::Result<T, PemuError>;
