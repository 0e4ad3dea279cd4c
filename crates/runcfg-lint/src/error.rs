//! Error types for runcfg-lint.
//!
//! Problems found *in* a linted document are [`Diagnostic`](crate::Diagnostic)s,
//! not errors. `Error` covers I/O and linter misconfiguration.

use std::path::{Path, PathBuf};

/// Errors raised by the linter itself.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Error from runcfg-core
    #[error(transparent)]
    Core(#[from] runcfg_core::Error),

    /// Error from runcfg-schema
    #[error(transparent)]
    Schema(#[from] runcfg_schema::Error),

    /// Linter settings are invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// What is wrong
        message: String,
    },

    /// A rule id in the settings does not name a registered rule.
    #[error("Unknown rule '{id}'{}", suggestion_suffix(.suggestion))]
    UnknownRule {
        /// The id as written
        id: String,
        /// Closest registered id
        suggestion: Option<String>,
    },

    /// I/O failure tied to a file.
    #[error("I/O error ({}): {source}", .path.display())]
    Io {
        /// File being read or written
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A report could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Convenience `Result` alias for runcfg-lint operations.
pub type Result<T> = std::result::Result<T, Error>;

fn suggestion_suffix(suggestion: &Option<String>) -> String {
    suggestion
        .as_deref()
        .map(|s| format!(" (did you mean '{s}'?)"))
        .unwrap_or_default()
}

impl Error {
    /// Creates a configuration error.
    pub fn config<S: Into<String>>(message: S) -> Self {
        Error::Config {
            message: message.into(),
        }
    }

    /// Wraps an I/O error together with the file it concerns.
    pub fn io_with_path(source: std::io::Error, path: impl AsRef<Path>) -> Self {
        Error::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::config(err.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
