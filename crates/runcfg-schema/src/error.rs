//! Error types for runcfg-schema.

/// Errors raised while projecting a document onto the typed schema.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Error from runcfg-core
    #[error(transparent)]
    Core(#[from] runcfg_core::Error),

    /// A value has the wrong shape for its field.
    #[error("Schema error at {section}: {message}")]
    Schema {
        /// Top-level section being projected (`<root>` for the whole run)
        section: String,
        /// What serde reported
        message: String,
    },

    /// A manifest file does not have the expected top-level shape.
    #[error("Manifest error: {message}")]
    Manifest {
        /// What is wrong with it
        message: String,
    },
}

/// Convenience `Result` alias for runcfg-schema operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Creates a schema error for `section`.
    pub fn schema<S, M>(section: S, message: M) -> Self
    where
        S: Into<String>,
        M: Into<String>,
    {
        Error::Schema {
            section: section.into(),
            message: message.into(),
        }
    }

    /// Creates a manifest error.
    pub fn manifest<S: Into<String>>(message: S) -> Self {
        Error::Manifest {
            message: message.into(),
        }
    }
}
