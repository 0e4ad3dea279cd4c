//! Lint reports and their text / JSON renderings.

use std::fmt;
use std::fmt::Write as _;

use serde::Serialize;

use crate::diagnostic::{Diagnostic, Severity};
use crate::error::Result;

/// Findings for one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    source: String,
    diagnostics: Vec<Diagnostic>,
}

impl Report {
    /// Empty report for `source`.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            diagnostics: Vec::new(),
        }
    }

    /// File (or `<string>`) the report is about.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Findings in the order rules produced them.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Add one finding.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Whether nothing was found.
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Number of findings at `severity`.
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    /// Whether any finding is an error.
    pub fn has_errors(&self) -> bool {
        self.count(Severity::Error) > 0
    }

    /// Whether this report fails a check.
    pub fn fails(&self, deny_warnings: bool) -> bool {
        self.has_errors() || (deny_warnings && self.count(Severity::Warning) > 0)
    }

    /// Findings from one rule.
    pub fn by_rule<'a>(&'a self, rule: &'a str) -> impl Iterator<Item = &'a Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.rule == rule)
    }

    /// One line per finding, a `help:` line where there is a hint, and a
    /// closing summary line.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for d in &self.diagnostics {
            if d.file.is_some() {
                let _ = writeln!(out, "{d}");
            } else {
                let _ = writeln!(out, "{}: {d}", self.source);
            }
            if let Some(help) = &d.help {
                let _ = writeln!(out, "  help: {help}");
            }
        }
        if self.is_empty() {
            let _ = writeln!(out, "{}: ok", self.source);
        } else {
            let _ = writeln!(
                out,
                "{}: {}",
                self.source,
                counts(
                    self.count(Severity::Error),
                    self.count(Severity::Warning),
                    self.count(Severity::Info)
                )
            );
        }
        out
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl Extend<Diagnostic> for Report {
    fn extend<I: IntoIterator<Item = Diagnostic>>(&mut self, iter: I) {
        self.diagnostics.extend(iter);
    }
}

/// Totals over several reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Documents checked.
    pub files: usize,
    /// Error findings.
    pub errors: usize,
    /// Warning findings.
    pub warnings: usize,
    /// Info findings.
    pub infos: usize,
}

impl Summary {
    /// Add up `reports`.
    pub fn from_reports(reports: &[Report]) -> Self {
        reports.iter().fold(Self::default(), |acc, r| Self {
            files: acc.files + 1,
            errors: acc.errors + r.count(Severity::Error),
            warnings: acc.warnings + r.count(Severity::Warning),
            infos: acc.infos + r.count(Severity::Info),
        })
    }

    /// Whether the totals fail a check.
    pub fn fails(&self, deny_warnings: bool) -> bool {
        self.errors > 0 || (deny_warnings && self.warnings > 0)
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} checked: {}",
            plural(self.files, "file"),
            counts(self.errors, self.warnings, self.infos)
        )
    }
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    reports: &'a [Report],
    summary: Summary,
}

/// Render several reports and their summary as one JSON object.
pub fn render_json(reports: &[Report]) -> Result<String> {
    let output = JsonOutput {
        reports,
        summary: Summary::from_reports(reports),
    };
    Ok(serde_json::to_string_pretty(&output)?)
}

fn counts(errors: usize, warnings: usize, infos: usize) -> String {
    let mut parts = vec![plural(errors, "error"), plural(warnings, "warning")];
    if infos > 0 {
        parts.push(plural(infos, "info"));
    }
    parts.join(", ")
}

fn plural(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("1 {noun}")
    } else {
        format!("{n} {noun}s")
    }
}
