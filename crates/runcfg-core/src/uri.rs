//! Storage locations named in run documents.
//!
//! Datasets, checkpoints and task files are addressed either by a local
//! path (`./my_data`, `/mnt/ckpt`) or by an object-store URI (`s3://`,
//! `gs://`, `oci://`, `hf://`, `dbfs:/`, ...). runcfg only classifies these
//! strings; nothing is ever fetched.

use std::fmt;
use std::path::PathBuf;

/// URI schemes the training framework knows how to read.
pub const KNOWN_SCHEMES: &[&str] = &[
    "s3", "gs", "oci", "azure", "wasbs", "hf", "dbfs", "http", "https", "sftp", "uc",
];

/// A classified storage location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageUri {
    /// Filesystem path on the training host.
    Local(PathBuf),
    /// Object-store or remote location.
    Remote {
        /// Scheme, lowercase, without `://`
        scheme: String,
        /// Everything after the scheme separator
        location: String,
        /// Whether the scheme is in [`KNOWN_SCHEMES`] or an allowed extra
        known: bool,
    },
}

impl StorageUri {
    /// Classify `text` against the built-in schemes.
    pub fn parse(text: &str) -> Self {
        Self::parse_with(text, &[])
    }

    /// Classify `text`, also accepting the `extra` schemes as known.
    pub fn parse_with(text: &str, extra: &[String]) -> Self {
        let text = text.trim();
        match split_scheme(text) {
            Some((scheme, location)) => {
                let scheme = scheme.to_ascii_lowercase();
                let known = KNOWN_SCHEMES.contains(&scheme.as_str())
                    || extra.iter().any(|e| e.eq_ignore_ascii_case(&scheme));
                StorageUri::Remote {
                    scheme,
                    location: location.to_string(),
                    known,
                }
            }
            None => StorageUri::Local(PathBuf::from(text)),
        }
    }

    /// Whether the location is not on the local filesystem.
    pub fn is_remote(&self) -> bool {
        matches!(self, StorageUri::Remote { .. })
    }

    /// Scheme for remote locations.
    pub fn scheme(&self) -> Option<&str> {
        match self {
            StorageUri::Remote { scheme, .. } => Some(scheme),
            StorageUri::Local(_) => None,
        }
    }

    /// Whether runcfg recognizes this location's scheme. Local paths are
    /// always recognized.
    pub fn is_known(&self) -> bool {
        match self {
            StorageUri::Remote { known, .. } => *known,
            StorageUri::Local(_) => true,
        }
    }
}

impl fmt::Display for StorageUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageUri::Local(path) => write!(f, "{}", path.display()),
            StorageUri::Remote {
                scheme, location, ..
            } if scheme == "dbfs" => write!(f, "dbfs:/{location}"),
            StorageUri::Remote {
                scheme, location, ..
            } => write!(f, "{scheme}://{location}"),
        }
    }
}

/// Split `scheme://rest` (or Databricks' `dbfs:/rest`).
///
/// Windows drive letters (`C:\data`) are a single character before the
/// colon and stay local.
fn split_scheme(text: &str) -> Option<(&str, &str)> {
    if let Some(pos) = text.find("://") {
        let scheme = &text[..pos];
        if is_scheme(scheme) {
            return Some((scheme, &text[pos + 3..]));
        }
        return None;
    }
    let pos = text.find(":/")?;
    let scheme = &text[..pos];
    if scheme.len() > 1 && is_scheme(scheme) {
        return Some((scheme, text[pos + 2..].trim_start_matches('/')));
    }
    None
}

fn is_scheme(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}
