//! Diagnostics produced by lint rules.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use runcfg_core::KeyPath;
use serde::{Deserialize, Serialize};

/// How serious a diagnostic is. Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational.
    Info,
    /// Likely mistake; does not fail a check unless warnings are denied.
    Warning,
    /// The document will not run as written.
    Error,
}

impl Severity {
    /// Lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "info" => Ok(Severity::Info),
            "warning" | "warn" => Ok(Severity::Warning),
            "error" => Ok(Severity::Error),
            other => Err(format!("unknown severity '{other}'")),
        }
    }
}

/// One finding: which rule, how bad, where, and what.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    /// Id of the rule that produced it.
    pub rule: &'static str,
    /// Severity after settings are applied.
    pub severity: Severity,
    /// Location inside the document.
    pub path: KeyPath,
    /// What is wrong.
    pub message: String,
    /// How to fix it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
    /// Followed manifest the finding is in, when not the run document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Diagnostic {
    /// Create a diagnostic.
    pub fn new(
        rule: &'static str,
        severity: Severity,
        path: KeyPath,
        message: impl Into<String>,
    ) -> Self {
        Self {
            rule,
            severity,
            path,
            message: message.into(),
            help: None,
            file: None,
        }
    }

    /// Attach a fix-it hint.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Attribute the diagnostic to a followed manifest file.
    pub fn in_file(mut self, file: Option<&Path>) -> Self {
        self.file = file.map(Path::to_path_buf);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(file) = &self.file {
            write!(f, "{}: ", file.display())?;
        }
        write!(
            f,
            "{}: {}[{}]: {}",
            self.path, self.severity, self.rule, self.message
        )
    }
}
