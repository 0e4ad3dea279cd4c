//! Error types for runcfg-core.

use std::path::{Path, PathBuf};

use crate::document::KeyPath;

/// Errors raised while loading, navigating or resolving a run document.
///
/// All variants are `#[non_exhaustive]` so new failure modes can be added
/// without breaking downstream matches.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The text is not well-formed YAML.
    #[error("Parse error{}: {message}", location_suffix(.line, .column))]
    Parse {
        /// What the YAML parser reported
        message: String,
        /// 1-based line, when the parser knows it
        line: Option<usize>,
        /// 1-based column, when the parser knows it
        column: Option<usize>,
    },

    /// A mapping repeats a key.
    #[error("Duplicate key '{key}' in mapping at {path}")]
    DuplicateKey {
        /// Path of the mapping that holds the duplicate
        path: KeyPath,
        /// The repeated key
        key: String,
    },

    /// The document is empty or `null`.
    #[error("Document is empty")]
    EmptyDocument,

    /// The document root is a scalar or sequence.
    #[error("Document root must be a mapping, found {found}")]
    NotAMapping {
        /// Kind of node found at the root
        found: &'static str,
    },

    /// A `${variables.X}` reference names a variable that is not defined.
    #[error("Undefined variable '{name}' referenced at {path}{}", suggestion_suffix(.suggestion))]
    UndefinedVariable {
        /// Dotted variable name (without the `variables.` prefix)
        name: String,
        /// Where the reference appears
        path: KeyPath,
        /// Closest defined variable name, if any is similar enough
        suggestion: Option<String>,
    },

    /// Variables reference each other in a loop.
    #[error("Variable cycle: {}", .chain.join(" -> "))]
    VariableCycle {
        /// Variable names in reference order, first name repeated at the end
        chain: Vec<String>,
    },

    /// A mapping or sequence was referenced from inside a longer string.
    #[error("Variable '{name}' at {path} is not a scalar and cannot be embedded in text")]
    NonScalarEmbed {
        /// Variable name
        name: String,
        /// Where the reference appears
        path: KeyPath,
    },

    /// A value is not a valid duration literal.
    #[error("Invalid duration '{value}': {reason}")]
    InvalidDuration {
        /// Offending text
        value: String,
        /// What is wrong with it
        reason: String,
    },

    /// A dotted key path could not be parsed.
    #[error("Invalid key path '{0}'")]
    InvalidKeyPath(String),

    /// I/O failure, optionally tied to a file.
    #[error("I/O error{}: {source}", path_suffix(.path))]
    Io {
        /// File being read or written
        path: Option<PathBuf>,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Convenience `Result` alias for runcfg-core operations.
pub type Result<T> = std::result::Result<T, Error>;

fn location_suffix(line: &Option<usize>, column: &Option<usize>) -> String {
    match (line, column) {
        (Some(l), Some(c)) => format!(" at line {l}, column {c}"),
        (Some(l), None) => format!(" at line {l}"),
        _ => String::new(),
    }
}

fn suggestion_suffix(suggestion: &Option<String>) -> String {
    suggestion
        .as_deref()
        .map(|s| format!(" (did you mean '{s}'?)"))
        .unwrap_or_default()
}

fn path_suffix(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| format!(" ({})", p.display()))
        .unwrap_or_default()
}

impl Error {
    /// Creates a parse error without location.
    pub fn parse<S: Into<String>>(message: S) -> Self {
        Error::Parse {
            message: message.into(),
            line: None,
            column: None,
        }
    }

    /// Creates an invalid-duration error.
    pub fn invalid_duration<V, R>(value: V, reason: R) -> Self
    where
        V: Into<String>,
        R: Into<String>,
    {
        Error::InvalidDuration {
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Wraps an I/O error together with the file it concerns.
    pub fn io_with_path(source: std::io::Error, path: impl AsRef<Path>) -> Self {
        Error::Io {
            path: Some(path.as_ref().to_path_buf()),
            source,
        }
    }

    /// Short machine-readable name for the variant, used as a lint rule id.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Parse { .. } => "parse",
            Error::DuplicateKey { .. } => "duplicate-key",
            Error::EmptyDocument => "parse",
            Error::NotAMapping { .. } => "parse",
            Error::UndefinedVariable { .. } => "undefined-variable",
            Error::VariableCycle { .. } => "variable-cycle",
            Error::NonScalarEmbed { .. } => "undefined-variable",
            Error::InvalidDuration { .. } => "duration-literal",
            Error::InvalidKeyPath(_) => "parse",
            Error::Io { .. } => "io",
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Error::Io { path: None, source }
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        let location = err.location();
        Error::Parse {
            message: err.to_string(),
            line: location.as_ref().map(|l| l.line()),
            column: location.as_ref().map(|l| l.column()),
        }
    }
}
