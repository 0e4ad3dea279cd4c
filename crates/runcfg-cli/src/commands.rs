//! Handlers for `check`, `resolve`, `get` and `rules`.
//!
//! Handlers write to the given output so they can be tested without a
//! terminal; logging goes to stderr through the subscriber set up in
//! `main`.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use runcfg_core::{Document, KeyPath, Node, load_file, resolve};
use runcfg_lint::{LintSettings, Linter, Report, Summary, render_json};

use crate::cli::Format;

/// Extensions picked up when a directory is checked.
const YAML_EXTENSIONS: &[&str] = &["yaml", "yml"];

// ============================================================================
// check
// ============================================================================

/// Options for `check` beyond the settings file.
#[derive(Debug, Clone, Copy)]
pub struct CheckOptions {
    /// Output format.
    pub format: Format,
    /// Skip following manifest references.
    pub no_follow: bool,
    /// Fail on warnings.
    pub deny_warnings: bool,
}

/// Lint every document named by `inputs`.
///
/// Returns whether the check failed.
pub fn cmd_check(
    inputs: &[String],
    mut settings: LintSettings,
    options: CheckOptions,
    out: &mut dyn Write,
) -> Result<bool> {
    if options.no_follow {
        settings.follow_refs = false;
    }
    let deny_warnings = settings.deny_warnings || options.deny_warnings;
    let linter = Linter::new(settings).context("Invalid linter settings")?;

    let files = expand_inputs(inputs)?;
    log::info!("Checking {} file(s)", files.len());

    let reports = files
        .iter()
        .map(|file| {
            linter
                .lint_file(file)
                .with_context(|| format!("Failed to lint {}", file.display()))
        })
        .collect::<Result<Vec<Report>>>()?;

    let summary = Summary::from_reports(&reports);
    match options.format {
        Format::Text => {
            for report in &reports {
                write!(out, "{}", report.render_text())?;
            }
            if reports.len() > 1 {
                writeln!(out, "{summary}")?;
            }
        }
        Format::Json => writeln!(out, "{}", render_json(&reports)?)?,
    }
    Ok(summary.fails(deny_warnings))
}

/// Turn files, directories and glob patterns into a sorted file list.
pub fn expand_inputs(inputs: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        let path = Path::new(input);
        if path.is_dir() {
            files.extend(yaml_files_under(path)?);
        } else if is_pattern(input) {
            let matched = glob::glob(input)
                .with_context(|| format!("Invalid glob pattern '{input}'"))?
                .collect::<std::result::Result<Vec<_>, _>>()
                .with_context(|| format!("Failed to expand '{input}'"))?;
            if matched.is_empty() {
                bail!("No files match '{input}'");
            }
            files.extend(matched.into_iter().filter(|p| p.is_file()));
        } else {
            files.push(path.to_path_buf());
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

fn is_pattern(input: &str) -> bool {
    input.contains(['*', '?', '['])
}

fn yaml_files_under(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for ext in YAML_EXTENSIONS {
        let pattern = dir.join("**").join(format!("*.{ext}"));
        let pattern = pattern.to_string_lossy();
        for entry in glob::glob(&pattern).with_context(|| format!("Invalid directory {}", dir.display()))? {
            files.push(entry.with_context(|| format!("Failed to read {}", dir.display()))?);
        }
    }
    Ok(files)
}

// ============================================================================
// resolve / get
// ============================================================================

fn load_resolved(file: &Path) -> Result<Document> {
    let doc = load_file(file).with_context(|| format!("Failed to load {}", file.display()))?;
    let resolved =
        resolve(&doc).with_context(|| format!("Failed to resolve variables in {}", file.display()))?;
    Ok(resolved.into_document())
}

/// Print `file` with every `${variables.*}` substituted and the
/// `variables` block removed.
pub fn cmd_resolve(file: &Path, out: &mut dyn Write) -> Result<()> {
    let doc = load_resolved(file)?;
    write!(out, "{}", doc.to_yaml_string()?)?;
    Ok(())
}

/// Print the value at `key`.
///
/// Scalars print as plain text; mappings and sequences as YAML.
pub fn cmd_get(file: &Path, key: &str, raw: bool, out: &mut dyn Write) -> Result<()> {
    let path: KeyPath = key
        .parse()
        .with_context(|| format!("'{key}' is not a valid key"))?;
    let doc = if raw {
        load_file(file).with_context(|| format!("Failed to load {}", file.display()))?
    } else {
        load_resolved(file)?
    };
    let Some(node) = doc.lookup(&path) else {
        bail!("Key '{key}' not found in {}", file.display());
    };
    writeln!(out, "{}", format_node(node)?.trim_end())?;
    Ok(())
}

/// Render a node for display on stdout.
pub fn format_node(node: &Node) -> Result<String> {
    match node.scalar_text() {
        Some(text) => Ok(text),
        None => Ok(serde_yaml::to_string(node)?),
    }
}

// ============================================================================
// rules
// ============================================================================

/// Print every rule with the level it reports at under `settings`.
pub fn cmd_rules(settings: LintSettings, out: &mut dyn Write) -> Result<()> {
    let linter = Linter::new(settings).context("Invalid linter settings")?;
    let rules = linter.rules();
    let width = rules.rules().map(|r| r.id().len()).max().unwrap_or(0);
    for rule in rules.rules() {
        let level = rules
            .severity(rule.id())
            .map(|s| s.as_str())
            .unwrap_or("off");
        writeln!(out, "{:<width$}  {:<7}  {}", rule.id(), level, rule.description())?;
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
