//! Everything a rule can look at for one run document.

use std::path::Path;

use runcfg_core::interpolate::{Resolved, resolve};
use runcfg_core::{Document, KeyPath, Node};
use runcfg_schema::eval::{EVAL_GAUNTLET_KEY, ICL_TASKS_KEY};
use runcfg_schema::{EvalGauntlet, GauntletField, IclTask, IclTasksField, RunConfig};

use crate::refs::FollowedRefs;
use crate::settings::LintSettings;

/// ICL tasks from wherever they were declared.
#[derive(Debug, Clone, Copy)]
pub struct TaskSource<'a> {
    /// The tasks.
    pub tasks: &'a [IclTask],
    /// Manifest file, or `None` for tasks inline in the run document.
    pub file: Option<&'a Path>,
    /// Path of the task list inside its document.
    pub base: &'a KeyPath,
}

/// The eval gauntlet from wherever it was declared.
#[derive(Debug, Clone, Copy)]
pub struct GauntletSource<'a> {
    /// The gauntlet.
    pub gauntlet: &'a EvalGauntlet,
    /// Gauntlet file, or `None` when inline.
    pub file: Option<&'a Path>,
    /// Path of the gauntlet body inside its document.
    pub base: &'a KeyPath,
}

/// Lint input for one document.
///
/// Built once per document: interpolation is attempted, the resolved tree
/// is projected onto [`RunConfig`], and file references are followed.
/// Rules read from it and never mutate it.
#[derive(Debug)]
pub struct LintContext<'a> {
    document: &'a Document,
    settings: &'a LintSettings,
    resolved: Option<Resolved>,
    resolve_error: Option<runcfg_core::Error>,
    config: Option<RunConfig>,
    schema_error: Option<runcfg_schema::Error>,
    refs: FollowedRefs,
    inline_tasks_base: KeyPath,
    inline_gauntlet_base: KeyPath,
}

impl<'a> LintContext<'a> {
    /// Resolve, project and follow references for `document`.
    ///
    /// Projection only runs on a resolved tree; when interpolation fails
    /// the typed view is absent and rules fall back to the raw tree.
    pub fn new(document: &'a Document, settings: &'a LintSettings) -> Self {
        let (resolved, resolve_error) = match resolve(document) {
            Ok(resolved) => (Some(resolved), None),
            Err(e) => {
                log::debug!("Interpolation failed for {}: {e}", document.label());
                (None, Some(e))
            }
        };

        let (config, schema_error) = match &resolved {
            Some(r) => match RunConfig::from_document(r.document()) {
                Ok(config) => (Some(config), None),
                Err(e) => (None, Some(e)),
            },
            None => (None, None),
        };

        let refs = match (&config, settings.follow_refs) {
            (Some(config), true) => {
                FollowedRefs::follow(document, config, &settings.extra_uri_schemes)
            }
            _ => FollowedRefs::default(),
        };

        Self {
            document,
            settings,
            resolved,
            resolve_error,
            config,
            schema_error,
            refs,
            inline_tasks_base: KeyPath::root().key(ICL_TASKS_KEY),
            inline_gauntlet_base: KeyPath::root().key(EVAL_GAUNTLET_KEY),
        }
    }

    /// The document as loaded.
    pub fn document(&self) -> &Document {
        self.document
    }

    /// Settings in effect.
    pub fn settings(&self) -> &LintSettings {
        self.settings
    }

    /// Interpolation result, if it succeeded.
    pub fn resolved(&self) -> Option<&Resolved> {
        self.resolved.as_ref()
    }

    /// Why interpolation failed, if it did.
    pub fn resolve_error(&self) -> Option<&runcfg_core::Error> {
        self.resolve_error.as_ref()
    }

    /// Tree rules should inspect: resolved when possible, raw otherwise.
    pub fn tree(&self) -> &Node {
        self.resolved
            .as_ref()
            .map(|r| r.document().root())
            .unwrap_or_else(|| self.document.root())
    }

    /// Typed view, if projection succeeded.
    pub fn config(&self) -> Option<&RunConfig> {
        self.config.as_ref()
    }

    /// Why projection failed, if it did.
    pub fn schema_error(&self) -> Option<&runcfg_schema::Error> {
        self.schema_error.as_ref()
    }

    /// Followed manifest references.
    pub fn refs(&self) -> &FollowedRefs {
        &self.refs
    }

    /// ICL tasks, inline or from a followed manifest.
    pub fn icl_tasks(&self) -> Option<TaskSource<'_>> {
        match self.config()?.icl_tasks.as_ref()? {
            IclTasksField::Inline(tasks) => Some(TaskSource {
                tasks,
                file: None,
                base: &self.inline_tasks_base,
            }),
            IclTasksField::Path(_) => self.refs.icl_tasks.as_ref().map(|f| TaskSource {
                tasks: &f.value.icl_tasks,
                file: Some(&f.file),
                base: &f.base,
            }),
        }
    }

    /// Eval gauntlet, inline or from a followed file.
    pub fn gauntlet(&self) -> Option<GauntletSource<'_>> {
        match self.config()?.eval_gauntlet.as_ref()? {
            GauntletField::Inline(gauntlet) => Some(GauntletSource {
                gauntlet,
                file: None,
                base: &self.inline_gauntlet_base,
            }),
            GauntletField::Path(_) => self.refs.gauntlet.as_ref().map(|f| GauntletSource {
                gauntlet: &f.value,
                file: Some(&f.file),
                base: &f.base,
            }),
        }
    }
}
