//! ICL task, gauntlet and manifest reference rules.

use std::collections::BTreeMap;

use runcfg_core::KeyPath;
use runcfg_schema::eval::{EVAL_GAUNTLET_KEY, ICL_TASKS_KEY};
use runcfg_schema::{IclTask, IclTaskType};
use serde_yaml::Value;

use crate::context::{LintContext, TaskSource};
use crate::diagnostic::{Diagnostic, Severity};
use crate::rule::Rule;

fn task_type_names() -> String {
    IclTaskType::ALL
        .iter()
        .map(|t| t.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Every ICL task is complete and uniquely labelled.
pub struct IclTaskCheck;

impl Rule for IclTaskCheck {
    fn id(&self) -> &'static str {
        "icl-task"
    }

    fn description(&self) -> &'static str {
        "ICL tasks have a unique label, a dataset_uri, a known icl_task_type and num_fewshot"
    }

    fn default_severity(&self) -> Severity {
        Severity::Error
    }

    fn check(&self, ctx: &LintContext<'_>, out: &mut Vec<Diagnostic>) {
        let Some(source) = ctx.icl_tasks() else {
            return;
        };
        let mut first_seen: BTreeMap<&str, usize> = BTreeMap::new();

        for (i, task) in source.tasks.iter().enumerate() {
            let path = source.base.index(i);
            let mut report = |path: KeyPath, message: String, help: Option<&str>| {
                let mut d = self.diagnostic(path, message).in_file(source.file);
                if let Some(help) = help {
                    d = d.with_help(help);
                }
                out.push(d);
            };

            match task.label.as_deref() {
                None => report(path.clone(), "task has no label".into(), None),
                Some(label) => match first_seen.get(label) {
                    Some(first) => report(
                        path.key("label"),
                        format!("label '{label}' is already used by task {first}"),
                        None,
                    ),
                    None => {
                        first_seen.insert(label, i);
                    }
                },
            }

            if task.dataset_uri.is_none() {
                report(path.clone(), "task has no dataset_uri".into(), None);
            }

            match task.task_type() {
                None => report(path.clone(), "task has no icl_task_type".into(), None),
                Some(Err(message)) => report(
                    path.key("icl_task_type"),
                    message,
                    Some(&format!("expected one of {}", task_type_names())),
                ),
                Some(Ok(_)) => {}
            }

            if let Some(message) = fewshot_problem(task) {
                report(
                    path.key("num_fewshot"),
                    message,
                    Some("use a list of non-negative shot counts, e.g. [0, 5]"),
                );
            }
        }
    }
}

fn fewshot_problem(task: &IclTask) -> Option<String> {
    let non_negative = |v: &Value| v.as_i64().is_some_and(|n| n >= 0);
    match &task.num_fewshot {
        None => Some("task has no num_fewshot".into()),
        Some(Value::Sequence(items)) if items.is_empty() => Some("num_fewshot is empty".into()),
        Some(Value::Sequence(items)) if items.iter().all(non_negative) => None,
        Some(v) if non_negative(v) => None,
        Some(_) => Some("num_fewshot must list non-negative integers".into()),
    }
}

/// Gauntlet benchmarks are named, baselined and backed by ICL tasks.
pub struct Gauntlet;

impl Rule for Gauntlet {
    fn id(&self) -> &'static str {
        "gauntlet"
    }

    fn description(&self) -> &'static str {
        "gauntlet benchmarks are named, have a random_baseline in [0, 1) and match an ICL task"
    }

    fn default_severity(&self) -> Severity {
        Severity::Error
    }

    fn check(&self, ctx: &LintContext<'_>, out: &mut Vec<Diagnostic>) {
        let Some(source) = ctx.gauntlet() else {
            return;
        };
        let gauntlet = source.gauntlet;
        let tasks = ctx.icl_tasks();
        let needs_baseline = gauntlet.subtract_random_baseline == Some(true);

        let has_task_field = ctx.config().is_some_and(|c| c.icl_tasks.is_some());
        if !has_task_field && is_run_document(ctx) {
            out.push(
                self.diagnostic(
                    KeyPath::root().key(EVAL_GAUNTLET_KEY),
                    "eval_gauntlet is set but icl_tasks is not".to_string(),
                )
                .with_help(format!("benchmarks are scored from the tasks listed under {ICL_TASKS_KEY}")),
            );
        }

        for (ci, category) in gauntlet.categories.iter().enumerate() {
            let cat_path = source.base.key("categories").index(ci);
            let mut report = |path: KeyPath, message: String| {
                out.push(self.diagnostic(path, message).in_file(source.file));
            };

            if category.name.is_none() {
                report(cat_path.clone(), "category has no name".into());
            }
            if category.benchmarks.is_empty() {
                report(cat_path.clone(), "category has no benchmarks".into());
            }

            for (bi, bench) in category.benchmarks.iter().enumerate() {
                let path = cat_path.key("benchmarks").index(bi);

                match bench.random_baseline {
                    Some(b) if !(0.0..1.0).contains(&b) => report(
                        path.key("random_baseline"),
                        format!("random_baseline must be in [0, 1), found {b}"),
                    ),
                    None if needs_baseline => report(
                        path.clone(),
                        "benchmark has no random_baseline but subtract_random_baseline is set"
                            .into(),
                    ),
                    _ => {}
                }

                let Some(name) = bench.name.as_deref() else {
                    report(path, "benchmark has no name".into());
                    continue;
                };
                let Some(shots) = bench.num_fewshot else {
                    report(path, format!("benchmark '{name}' has no num_fewshot"));
                    continue;
                };
                if let Some(tasks) = &tasks
                    && let Some(message) = cross_check(tasks, name, shots)
                {
                    report(path, message);
                }
            }
        }
    }
}

/// Keys that only appear in run documents; a gauntlet manifest has none.
const RUN_KEYS: &[&str] = &[
    "model",
    "models",
    "train_loader",
    "eval_loader",
    "max_seq_len",
    "max_duration",
    "run_name",
];

fn is_run_document(ctx: &LintContext<'_>) -> bool {
    let root = ctx.document().root();
    RUN_KEYS.iter().any(|key| root.get(key).is_some())
}

fn cross_check(source: &TaskSource<'_>, name: &str, shots: i64) -> Option<String> {
    let task = source
        .tasks
        .iter()
        .find(|t| t.label.as_deref() == Some(name));
    match task {
        None => Some(format!("benchmark '{name}' has no ICL task with that label")),
        Some(task) => {
            let evaluated = task.fewshots();
            (!evaluated.contains(&shots)).then(|| {
                format!(
                    "task '{name}' is not evaluated at {shots} shots (num_fewshot: {evaluated:?})"
                )
            })
        }
    }
}

/// File references in `icl_tasks` / `eval_gauntlet` can be followed.
pub struct ManifestRef;

impl Rule for ManifestRef {
    fn id(&self) -> &'static str {
        "manifest-ref"
    }

    fn description(&self) -> &'static str {
        "icl_tasks and eval_gauntlet file references can be followed"
    }

    fn default_severity(&self) -> Severity {
        Severity::Warning
    }

    fn check(&self, ctx: &LintContext<'_>, out: &mut Vec<Diagnostic>) {
        for problem in &ctx.refs().problems {
            let message = match &problem.file {
                Some(file) => format!(
                    "cannot follow '{}' ({}): {}",
                    problem.target,
                    file.display(),
                    problem.message
                ),
                None => format!("cannot follow '{}': {}", problem.target, problem.message),
            };
            out.push(self.diagnostic(problem.path.clone(), message));
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::rules::{paths, run_rule};
    use crate::settings::LintSettings;
    use runcfg_core::load_file;
    use std::fs;
    use tempfile::TempDir;

    const TASKS: &str = "\
icl_tasks:
- label: jeopardy
  dataset_uri: eval/local_data/jeopardy_all.jsonl
  num_fewshot: [10]
  icl_task_type: language_modeling
- label: piqa
  dataset_uri: eval/local_data/piqa.jsonl
  num_fewshot: [0, 5]
  icl_task_type: multiple_choice
";

    // ------------------------------------------------------------------------
    // icl-task
    // ------------------------------------------------------------------------

    #[test]
    fn test_valid_inline_tasks() {
        assert!(run_rule(&IclTaskCheck, TASKS).is_empty());
    }

    #[test]
    fn test_task_problems() {
        let text = "\
icl_tasks:
- label: a
  dataset_uri: a.jsonl
  num_fewshot: [0, -1]
  icl_task_type: question_answering
- dataset_uri: b.jsonl
  icl_task_type: schema
  num_fewshot: 3
- label: a
  num_fewshot: []
  icl_task_type: schema
";
        let found = run_rule(&IclTaskCheck, text);
        assert_eq!(
            paths(&found),
            vec![
                "icl_tasks[0].icl_task_type",
                "icl_tasks[0].num_fewshot",
                "icl_tasks[1]",
                "icl_tasks[2].label",
                "icl_tasks[2]",
                "icl_tasks[2].num_fewshot",
            ]
        );
        assert!(found[0].help.as_deref().unwrap_or_default().contains("multiple_choice"));
        assert!(found[3].message.contains("task 0"));
    }

    // ------------------------------------------------------------------------
    // gauntlet
    // ------------------------------------------------------------------------

    #[test]
    fn test_gauntlet_cross_check() {
        let text = format!(
            "{TASKS}\
eval_gauntlet:
  subtract_random_baseline: true
  categories:
  - name: world_knowledge
    benchmarks:
    - name: jeopardy
      num_fewshot: 10
      random_baseline: 0
    - name: triviaqa
      num_fewshot: 0
      random_baseline: 0
  - name: commonsense
    benchmarks:
    - name: piqa
      num_fewshot: 3
      random_baseline: 1.5
    - name: piqa
      num_fewshot: 5
"
        );
        let found = run_rule(&Gauntlet, &text);
        assert_eq!(
            paths(&found),
            vec![
                "eval_gauntlet.categories[0].benchmarks[1]",
                "eval_gauntlet.categories[1].benchmarks[0].random_baseline",
                "eval_gauntlet.categories[1].benchmarks[0]",
                "eval_gauntlet.categories[1].benchmarks[1]",
            ]
        );
        assert!(found[0].message.contains("no ICL task"));
        assert!(found[2].message.contains("not evaluated at 3 shots"));
        assert!(found[3].message.contains("no random_baseline"));
    }

    #[test]
    fn test_gauntlet_without_tasks() {
        let text = "max_seq_len: 2048\neval_gauntlet:\n  categories:\n  - name: x\n    benchmarks:\n    - name: a\n      num_fewshot: 0\n";
        let found = run_rule(&Gauntlet, text);
        assert_eq!(paths(&found), vec!["eval_gauntlet"]);
    }

    #[test]
    fn test_standalone_gauntlet_manifest() {
        let text = "eval_gauntlet:\n  weighting: EQUAL\n  categories:\n  - name: x\n    benchmarks:\n    - name: a\n      num_fewshot: 0\n      random_baseline: 0.25\n";
        assert!(run_rule(&Gauntlet, text).is_empty());
    }

    #[test]
    fn test_gauntlet_unnamed() {
        let text = format!("{TASKS}eval_gauntlet:\n  categories:\n  - benchmarks: []\n");
        let found = run_rule(&Gauntlet, &text);
        assert_eq!(
            paths(&found),
            vec!["eval_gauntlet.categories[0]", "eval_gauntlet.categories[0]"]
        );
    }

    // ------------------------------------------------------------------------
    // Followed files
    // ------------------------------------------------------------------------

    fn run_file(rule: &dyn Rule, path: &std::path::Path) -> Vec<Diagnostic> {
        let doc = load_file(path).unwrap();
        let settings = LintSettings::default();
        let ctx = LintContext::new(&doc, &settings);
        let mut out = Vec::new();
        rule.check(&ctx, &mut out);
        out
    }

    #[test]
    fn test_followed_manifest_findings_carry_file() {
        let dir = TempDir::new().unwrap();
        let tasks = dir.path().join("tasks.yaml");
        fs::write(&tasks, "icl_tasks:\n- label: a\n  num_fewshot: [0]\n  icl_task_type: schema\n").unwrap();
        let run = dir.path().join("run.yaml");
        fs::write(&run, "icl_tasks: tasks.yaml\n").unwrap();

        let found = run_file(&IclTaskCheck, &run);
        assert_eq!(paths(&found), vec!["icl_tasks[0]"]);
        assert_eq!(found[0].file.as_deref(), Some(tasks.as_path()));
    }

    #[test]
    fn test_followed_gauntlet_checked_against_followed_tasks() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("tasks.yaml"), TASKS).unwrap();
        fs::write(
            dir.path().join("gauntlet.yaml"),
            "eval_gauntlet:\n  categories:\n  - name: wk\n    benchmarks:\n    - name: jeopardy\n      num_fewshot: 0\n",
        )
        .unwrap();
        let run = dir.path().join("run.yaml");
        fs::write(&run, "icl_tasks: tasks.yaml\neval_gauntlet: gauntlet.yaml\n").unwrap();

        let found = run_file(&Gauntlet, &run);
        assert_eq!(paths(&found), vec!["eval_gauntlet.categories[0].benchmarks[0]"]);
        assert!(found[0].file.is_some());
    }

    #[test]
    fn test_manifest_ref_missing() {
        let dir = TempDir::new().unwrap();
        let run = dir.path().join("run.yaml");
        fs::write(&run, "icl_tasks: eval/nope.yaml\n").unwrap();
        let found = run_file(&ManifestRef, &run);
        assert_eq!(paths(&found), vec!["icl_tasks"]);
        assert!(found[0].message.contains("cannot follow 'eval/nope.yaml'"));
    }
}
