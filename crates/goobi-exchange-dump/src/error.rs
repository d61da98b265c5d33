//! Error types for goobi-exchange-dump

use thiserror::Error;

/// Result type alias using goobi-exchange-dump's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while loading configuration or while running an export/import.
///
/// Configuration variants surface from [`crate::config::DumpConfig::load`].
/// Run variants never escape [`crate::Exporter::run`] or [`crate::Importer::run`];
/// they are turned into ERROR messages on the run's message log.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Invalid configuration content
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Exclude rule with an unparsable regular expression
    #[error("Invalid exclude pattern '{pattern}' for rule '{label}': {source}")]
    InvalidExcludePattern {
        label: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Zip container error
    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Directory traversal error
    #[error("Failed to walk directory: {0}")]
    Walk(#[from] walkdir::Error),

    /// A command template resolved to an empty argument vector
    #[error("Command template is empty")]
    EmptyCommand,

    /// The external command exited with a non-zero status
    #[error("{kind} command failed with exit code {code}")]
    CommandFailed { kind: String, code: i32 },

    /// The external command could not be started
    #[error("Failed to start '{program}': {source}")]
    CommandSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Create a config not found error
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    /// Create an invalid config error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Returns true for errors that belong to configuration loading
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigNotFound { .. }
                | Self::InvalidConfig { .. }
                | Self::InvalidExcludePattern { .. }
                | Self::YamlParse(_)
        )
    }
}
