//! Following `icl_tasks` / `eval_gauntlet` file references.
//!
//! A relative reference is looked up from the run document's directory and
//! then from each ancestor directory, since task files are usually named
//! relative to a scripts root rather than to the document. Remote
//! references are never fetched.
//!
//! A target that cannot be found or read is a [`RefProblem`]. A target that
//! is found but does not load or project is a [`RefFailure`], reported under
//! the same rule as the failure would be in a run document.

use std::path::{Path, PathBuf};

use runcfg_core::{Document, KeyPath, Node, StorageUri, load_file};
use runcfg_schema::eval::{EVAL_GAUNTLET_KEY, ICL_TASKS_KEY};
use runcfg_schema::{EvalGauntlet, GauntletField, IclTaskManifest, IclTasksField, RunConfig};

/// A manifest file that was found, loaded and projected.
#[derive(Debug, Clone)]
pub struct Followed<T> {
    /// File on disk.
    pub file: PathBuf,
    /// Path of the manifest body inside the file (`icl_tasks`, or the
    /// root for the bare form).
    pub base: KeyPath,
    /// Projected content.
    pub value: T,
}

/// A reference that could not be followed.
#[derive(Debug, Clone, PartialEq)]
pub struct RefProblem {
    /// Key holding the reference in the run document.
    pub path: KeyPath,
    /// The reference as written.
    pub target: String,
    /// File that was found, when the failure happened after locating it.
    pub file: Option<PathBuf>,
    /// What went wrong.
    pub message: String,
}

/// A followed file that was found but failed to load or project.
#[derive(Debug, Clone, PartialEq)]
pub struct RefFailure {
    /// Key holding the reference in the run document.
    pub from: KeyPath,
    /// File on disk.
    pub file: PathBuf,
    /// Rule the failure belongs to (`parse`, `duplicate-key`, `schema`, ...).
    pub rule: &'static str,
    /// Location inside `file`.
    pub path: KeyPath,
    /// What went wrong.
    pub message: String,
}

impl RefFailure {
    fn load(from: &KeyPath, file: PathBuf, err: &runcfg_core::Error) -> Self {
        let path = match err {
            runcfg_core::Error::DuplicateKey { path, key } => path.key(key.as_str()),
            _ => KeyPath::root(),
        };
        Self {
            from: from.clone(),
            file,
            rule: err.kind(),
            path,
            message: err.to_string(),
        }
    }

    fn project(from: &KeyPath, file: PathBuf, root: &Node, err: &runcfg_schema::Error) -> Self {
        match err {
            runcfg_schema::Error::Core(e) => Self::load(from, file, e),
            runcfg_schema::Error::Schema { section, message } => Self {
                from: from.clone(),
                path: body_base(root, section),
                file,
                rule: SCHEMA_RULE,
                message: message.clone(),
            },
            other => Self {
                from: from.clone(),
                file,
                rule: SCHEMA_RULE,
                path: KeyPath::root(),
                message: other.to_string(),
            },
        }
    }
}

const SCHEMA_RULE: &str = "schema";

/// Everything reached from one run document.
#[derive(Debug, Clone, Default)]
pub struct FollowedRefs {
    /// ICL task manifest named by `icl_tasks`.
    pub icl_tasks: Option<Followed<IclTaskManifest>>,
    /// Gauntlet named by `eval_gauntlet`.
    pub gauntlet: Option<Followed<EvalGauntlet>>,
    /// References that could not be followed.
    pub problems: Vec<RefProblem>,
    /// Referenced files that failed to load or project.
    pub failures: Vec<RefFailure>,
}

impl FollowedRefs {
    /// Follow the path-valued `icl_tasks` and `eval_gauntlet` of `config`.
    pub fn follow(doc: &Document, config: &RunConfig, extra_schemes: &[String]) -> Self {
        let mut refs = FollowedRefs::default();
        let base_dir = doc.base_dir();

        if let Some(IclTasksField::Path(target)) = &config.icl_tasks {
            let key = KeyPath::root().key(ICL_TASKS_KEY);
            refs.icl_tasks = refs.follow_one(base_dir, &key, target, extra_schemes, |doc| {
                let base = body_base(doc.root(), ICL_TASKS_KEY);
                IclTaskManifest::from_document(doc).map(|value| (base, value))
            });
        }

        if let Some(GauntletField::Path(target)) = &config.eval_gauntlet {
            let key = KeyPath::root().key(EVAL_GAUNTLET_KEY);
            refs.gauntlet = refs.follow_one(base_dir, &key, target, extra_schemes, |doc| {
                let base = body_base(doc.root(), EVAL_GAUNTLET_KEY);
                EvalGauntlet::from_document(doc).map(|value| (base, value))
            });
        }

        refs
    }

    fn follow_one<T, F>(
        &mut self,
        base_dir: Option<&Path>,
        key: &KeyPath,
        target: &str,
        extra_schemes: &[String],
        project: F,
    ) -> Option<Followed<T>>
    where
        F: FnOnce(&Document) -> runcfg_schema::Result<(KeyPath, T)>,
    {
        if StorageUri::parse_with(target, extra_schemes).is_remote() {
            log::debug!("Not following remote reference {key} = {target}");
            return None;
        }

        let Some(file) = locate(base_dir, Path::new(target.trim())) else {
            let searched = base_dir
                .map(|d| format!(" (searched upward from {})", d.display()))
                .unwrap_or_default();
            self.problem(key, target, None, format!("file not found{searched}"));
            return None;
        };

        let doc = match load_file(&file) {
            Ok(doc) => doc,
            Err(e @ runcfg_core::Error::Io { .. }) => {
                self.problem(key, target, Some(file), e.to_string());
                return None;
            }
            Err(e) => {
                self.failure(RefFailure::load(key, file, &e));
                return None;
            }
        };

        match project(&doc) {
            Ok((base, value)) => {
                log::debug!("Followed {key} to {}", file.display());
                Some(Followed { file, base, value })
            }
            Err(e) => {
                self.failure(RefFailure::project(key, file, doc.root(), &e));
                None
            }
        }
    }

    fn failure(&mut self, failure: RefFailure) {
        log::warn!(
            "{} names {}: {}",
            failure.from,
            failure.file.display(),
            failure.message
        );
        self.failures.push(failure);
    }

    fn problem(&mut self, key: &KeyPath, target: &str, file: Option<PathBuf>, message: String) {
        log::warn!("Cannot follow {key} = {target}: {message}");
        self.problems.push(RefProblem {
            path: key.clone(),
            target: target.to_string(),
            file,
            message,
        });
    }
}

/// Find `target` relative to `base_dir` or one of its ancestors.
pub fn locate(base_dir: Option<&Path>, target: &Path) -> Option<PathBuf> {
    if target.is_absolute() {
        return target.is_file().then(|| target.to_path_buf());
    }
    match base_dir {
        Some(dir) => dir
            .ancestors()
            .map(|d| d.join(target))
            .find(|candidate| candidate.is_file()),
        None => target.is_file().then(|| target.to_path_buf()),
    }
}

fn body_base(root: &Node, wrapper: &str) -> KeyPath {
    if root.get(wrapper).is_some() {
        KeyPath::root().key(wrapper)
    } else {
        KeyPath::root()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, text: &str) -> PathBuf {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, text).unwrap();
        path
    }

    fn follow(run: &Path) -> FollowedRefs {
        let doc = load_file(run).unwrap();
        let config = RunConfig::from_document(&doc).unwrap();
        FollowedRefs::follow(&doc, &config, &[])
    }

    // ------------------------------------------------------------------------
    // locate
    // ------------------------------------------------------------------------

    #[test]
    fn test_locate_walks_up() {
        let dir = TempDir::new().unwrap();
        let tasks = write(dir.path(), "scripts/eval/yamls/tasks.yaml", "icl_tasks: []\n");
        let base = dir.path().join("scripts/train/yamls/pretrain");
        fs::create_dir_all(&base).unwrap();
        let found = locate(Some(&base), Path::new("eval/yamls/tasks.yaml")).unwrap();
        assert_eq!(found, tasks);
    }

    #[test]
    fn test_locate_missing() {
        let dir = TempDir::new().unwrap();
        assert!(locate(Some(dir.path()), Path::new("nope.yaml")).is_none());
    }

    // ------------------------------------------------------------------------
    // follow
    // ------------------------------------------------------------------------

    #[test]
    fn test_follow_tasks_and_gauntlet() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "eval/tasks.yaml",
            "icl_tasks:\n- label: piqa\n  dataset_uri: piqa.jsonl\n  num_fewshot: [0]\n  icl_task_type: multiple_choice\n",
        );
        write(
            dir.path(),
            "eval/gauntlet.yaml",
            "categories:\n- name: cs\n  benchmarks:\n  - name: piqa\n    num_fewshot: 0\n    random_baseline: 0.5\n",
        );
        let run = write(
            dir.path(),
            "run.yaml",
            "icl_tasks: eval/tasks.yaml\neval_gauntlet: eval/gauntlet.yaml\n",
        );

        let refs = follow(&run);
        assert!(refs.problems.is_empty(), "{:?}", refs.problems);
        let tasks = refs.icl_tasks.unwrap();
        assert_eq!(tasks.base.to_string(), "icl_tasks");
        assert_eq!(tasks.value.icl_tasks.len(), 1);
        let gauntlet = refs.gauntlet.unwrap();
        assert!(gauntlet.base.is_root());
        assert_eq!(gauntlet.value.categories.len(), 1);
    }

    #[test]
    fn test_missing_file_is_problem() {
        let dir = TempDir::new().unwrap();
        let run = write(dir.path(), "run.yaml", "icl_tasks: eval/missing.yaml\n");
        let refs = follow(&run);
        assert!(refs.icl_tasks.is_none());
        assert_eq!(refs.problems.len(), 1);
        assert_eq!(refs.problems[0].path.to_string(), "icl_tasks");
        assert!(refs.problems[0].message.contains("file not found"));
    }

    #[test]
    fn test_duplicate_key_in_manifest_is_failure() {
        let dir = TempDir::new().unwrap();
        let tasks = write(
            dir.path(),
            "tasks.yaml",
            "icl_tasks:\n- label: a\n  label: b\n",
        );
        let run = write(dir.path(), "run.yaml", "icl_tasks: tasks.yaml\n");
        let refs = follow(&run);
        assert!(refs.problems.is_empty());
        assert_eq!(refs.failures.len(), 1);
        let failure = &refs.failures[0];
        assert_eq!(failure.rule, "duplicate-key");
        assert_eq!(failure.path.to_string(), "icl_tasks[0].label");
        assert_eq!(failure.file, tasks);
    }

    #[test]
    fn test_manifest_of_wrong_shape_is_schema_failure() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "tasks.yaml", "icl_tasks:\n- label: [a]\n");
        let run = write(dir.path(), "run.yaml", "icl_tasks: tasks.yaml\n");
        let refs = follow(&run);
        assert_eq!(refs.failures.len(), 1);
        assert_eq!(refs.failures[0].rule, "schema");
        assert_eq!(refs.failures[0].path.to_string(), "icl_tasks");
    }

    #[test]
    fn test_remote_reference_skipped() {
        let dir = TempDir::new().unwrap();
        let run = write(dir.path(), "run.yaml", "icl_tasks: s3://bucket/tasks.yaml\n");
        let refs = follow(&run);
        assert!(refs.icl_tasks.is_none());
        assert!(refs.problems.is_empty());
    }

    #[test]
    fn test_inline_tasks_not_followed() {
        let dir = TempDir::new().unwrap();
        let run = write(dir.path(), "run.yaml", "icl_tasks:\n- label: a\n");
        let refs = follow(&run);
        assert!(refs.icl_tasks.is_none());
        assert!(refs.problems.is_empty());
    }
}
