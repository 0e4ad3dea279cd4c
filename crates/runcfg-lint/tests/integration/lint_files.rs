//! Integration tests for linting fixture documents.

use std::fs;

use runcfg_lint::{LintSettings, RuleLevel, Severity};
use tempfile::TempDir;

use crate::common::{broken, findings, fixtures, lint, lint_with, pretrain_yaml};

#[test]
fn test_pretrain_document_is_clean() {
    let report = lint(&pretrain_yaml());
    assert!(report.is_empty(), "{}", report.render_text());
}

#[test]
fn test_gauntlet_manifest_is_clean() {
    let report = lint(&fixtures().join("scripts/eval/yamls/gauntlet.yaml"));
    assert!(!report.has_errors(), "{}", report.render_text());
}

#[test]
fn test_every_script_is_clean() {
    let mut pending = vec![fixtures().join("scripts")];
    let mut checked = 0;
    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                pending.push(path);
            } else if path.extension().is_some_and(|ext| ext == "yaml") {
                let report = lint(&path);
                assert!(!report.has_errors(), "{}", report.render_text());
                checked += 1;
            }
        }
    }
    assert_eq!(checked, 3);
}

#[test]
fn test_followed_gauntlet_is_checked() {
    let dir = TempDir::new().unwrap();
    let scripts = dir.path().join("scripts");
    let run = scripts.join("train/yamls/pretrain/mpt-125m.yaml");
    let eval = scripts.join("eval/yamls");
    fs::create_dir_all(run.parent().unwrap()).unwrap();
    fs::create_dir_all(&eval).unwrap();
    fs::copy(pretrain_yaml(), &run).unwrap();
    fs::copy(
        fixtures().join("scripts/eval/yamls/tasks.yaml"),
        eval.join("tasks.yaml"),
    )
    .unwrap();
    let gauntlet = fs::read_to_string(fixtures().join("scripts/eval/yamls/gauntlet.yaml"))
        .unwrap()
        .replace("name: piqa\n      num_fewshot: 10", "name: piqa\n      num_fewshot: 5");
    fs::write(eval.join("gauntlet.yaml"), gauntlet).unwrap();

    let report = lint(&run);
    assert_eq!(
        findings(&report),
        vec!["gauntlet@eval_gauntlet.categories[1].benchmarks[0]"]
    );
    let d = &report.diagnostics()[0];
    assert_eq!(d.file.as_deref(), Some(eval.join("gauntlet.yaml").as_path()));
    assert!(d.message.contains("not evaluated at 5 shots"));
}

#[test]
fn test_pretrain_without_following() {
    let settings = LintSettings {
        follow_refs: false,
        ..LintSettings::default()
    };
    let report = lint_with(&pretrain_yaml(), settings);
    assert!(report.is_empty(), "{}", report.render_text());
}

#[test]
fn test_fsdp_with_8bit_model() {
    let report = lint(&broken("fsdp-8bit.yaml"));
    assert_eq!(findings(&report), vec!["fsdp-8bit@model.load_in_8bit"]);
    assert!(report.has_errors());
}

#[test]
fn test_undefined_variable_with_suggestion() {
    let report = lint(&broken("undefined-variable.yaml"));
    assert_eq!(
        findings(&report),
        vec!["undefined-variable@train_loader.dataset.local"]
    );
    let d = &report.diagnostics()[0];
    assert_eq!(d.help.as_deref(), Some("did you mean 'data_local'?"));
}

#[test]
fn test_duplicate_key() {
    let report = lint(&broken("duplicate-key.yaml"));
    assert_eq!(findings(&report), vec!["duplicate-key@optimizer.lr"]);
}

#[test]
fn test_missing_task_file() {
    let report = lint(&broken("missing-tasks.yaml"));
    assert_eq!(findings(&report), vec!["manifest-ref@icl_tasks"]);
    assert_eq!(report.diagnostics()[0].severity, Severity::Warning);
    assert!(!report.fails(false));
    assert!(report.fails(true));
}

#[test]
fn test_duplicate_key_in_followed_task_file() {
    let dir = TempDir::new().unwrap();
    let tasks = dir.path().join("tasks.yaml");
    fs::write(
        &tasks,
        "icl_tasks:\n- label: piqa\n  label: piqa_v2\n  dataset_uri: piqa.jsonl\n  num_fewshot: [0]\n  icl_task_type: multiple_choice\n",
    )
    .unwrap();
    let run = dir.path().join("run.yaml");
    fs::write(&run, "max_seq_len: 2048\nicl_tasks: tasks.yaml\n").unwrap();

    let report = lint(&run);
    assert_eq!(findings(&report), vec!["duplicate-key@icl_tasks[0].label"]);
    assert!(report.has_errors());
    let d = &report.diagnostics()[0];
    assert_eq!(d.file.as_deref(), Some(tasks.as_path()));
    assert!(d.to_string().contains("tasks.yaml"));

    let mut settings = LintSettings::default();
    settings.set_level("duplicate-key", RuleLevel::Warning);
    let report = lint_with(&run, settings);
    assert_eq!(report.diagnostics()[0].severity, Severity::Warning);
    assert!(!report.has_errors());
}

#[test]
fn test_several_findings_in_rule_order() {
    let report = lint(&broken("mixed.yaml"));
    assert_eq!(
        findings(&report),
        vec![
            "duration-literal@max_duration",
            "batch-size@device_train_microbatch_size",
            "storage-uri@save_folder",
        ]
    );
    assert_eq!(report.count(Severity::Error), 2);
    assert_eq!(report.count(Severity::Warning), 1);
}
