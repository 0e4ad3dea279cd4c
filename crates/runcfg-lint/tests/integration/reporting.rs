//! Integration tests for text and JSON output over several files.

use runcfg_lint::{Summary, render_json};

use crate::common::{broken, lint, pretrain_yaml};

#[test]
fn test_text_output_names_file() {
    let path = broken("fsdp-8bit.yaml");
    let text = lint(&path).render_text();
    let first = text.lines().next().unwrap();
    assert!(first.starts_with(&format!("{}: model.load_in_8bit: error[fsdp-8bit]", path.display())));
    assert!(text.contains("  help: remove load_in_8bit"));
    assert!(text.ends_with("1 error, 0 warnings\n"));
}

#[test]
fn test_summary_over_files() {
    let reports = vec![
        lint(&pretrain_yaml()),
        lint(&broken("mixed.yaml")),
        lint(&broken("missing-tasks.yaml")),
    ];
    let summary = Summary::from_reports(&reports);
    assert_eq!(summary.files, 3);
    assert_eq!(summary.errors, 2);
    assert_eq!(summary.warnings, 2);
    assert_eq!(summary.to_string(), "3 files checked: 2 errors, 2 warnings");
}

#[test]
fn test_json_output() {
    let reports = vec![lint(&broken("duplicate-key.yaml"))];
    let json: serde_json::Value = serde_json::from_str(&render_json(&reports).unwrap()).unwrap();
    let d = &json["reports"][0]["diagnostics"][0];
    assert_eq!(d["rule"], "duplicate-key");
    assert_eq!(d["severity"], "error");
    assert_eq!(d["path"], "optimizer.lr");
    assert_eq!(json["summary"]["files"], 1);
}
