//! In-context-learning task manifests and the eval gauntlet.
//!
//! Both may appear inline in a run document or live in their own YAML file
//! referenced by path:
//!
//! ```yaml
//! icl_tasks: eval/yamls/tasks.yaml
//! eval_gauntlet: eval/yamls/eval_gauntlet.yaml
//! ```
//!
//! A referenced task file wraps its list in `icl_tasks:`; a referenced
//! gauntlet file wraps its mapping in `eval_gauntlet:`. The bare forms are
//! accepted too.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use runcfg_core::{Document, Node};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::error::{Error, Result};

/// Top-level key of a task manifest file.
pub const ICL_TASKS_KEY: &str = "icl_tasks";

/// Top-level key of a gauntlet file.
pub const EVAL_GAUNTLET_KEY: &str = "eval_gauntlet";

/// Kind of in-context-learning evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IclTaskType {
    /// Pick the most likely continuation among choices.
    MultipleChoice,
    /// Pick the most likely context for a fixed continuation.
    Schema,
    /// Score the gold continuation directly.
    LanguageModeling,
    /// Generate an answer and compare against aliases.
    GenerationTaskWithAnswers,
    /// Generate code and run it against test cases.
    CodeEvaluation,
}

impl IclTaskType {
    /// All task types.
    pub const ALL: [IclTaskType; 5] = [
        IclTaskType::MultipleChoice,
        IclTaskType::Schema,
        IclTaskType::LanguageModeling,
        IclTaskType::GenerationTaskWithAnswers,
        IclTaskType::CodeEvaluation,
    ];

    /// Spelling used in manifests.
    pub fn as_str(self) -> &'static str {
        match self {
            IclTaskType::MultipleChoice => "multiple_choice",
            IclTaskType::Schema => "schema",
            IclTaskType::LanguageModeling => "language_modeling",
            IclTaskType::GenerationTaskWithAnswers => "generation_task_with_answers",
            IclTaskType::CodeEvaluation => "code_evaluation",
        }
    }
}

impl FromStr for IclTaskType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        IclTaskType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown icl_task_type '{s}'"))
    }
}

impl fmt::Display for IclTaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One in-context-learning task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IclTask {
    /// Task label; gauntlet benchmarks refer to tasks by it.
    pub label: Option<String>,

    /// Local path, object-store URI or `hf://` dataset.
    pub dataset_uri: Option<String>,

    /// Task kind. Checked by lint rules.
    pub icl_task_type: Option<String>,

    /// Shot counts to evaluate. Checked by lint rules.
    pub num_fewshot: Option<Value>,

    /// Eval batch size override.
    pub batch_size: Option<u32>,

    /// Inserted between context and continuation.
    pub continuation_delimiter: Option<String>,

    /// Inserted between few-shot examples.
    pub example_delimiter: Option<String>,

    /// Prepended to every prompt.
    pub prompt_string: Option<String>,

    /// Partition the dataset by its `category` column.
    pub has_categories: Option<bool>,

    /// Metrics to compute.
    #[serde(default)]
    pub metric_names: Vec<String>,

    /// Task-specific keys.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl IclTask {
    /// Parsed task type, if set.
    pub fn task_type(&self) -> Option<std::result::Result<IclTaskType, String>> {
        self.icl_task_type.as_deref().map(str::parse)
    }

    /// Shot counts as integers; a bare integer counts as a one-item list.
    /// Non-integer entries are skipped.
    pub fn fewshots(&self) -> Vec<i64> {
        match &self.num_fewshot {
            Some(Value::Sequence(items)) => items.iter().filter_map(Value::as_i64).collect(),
            Some(Value::Number(n)) => n.as_i64().into_iter().collect(),
            _ => Vec::new(),
        }
    }
}

/// The task list of a manifest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IclTaskManifest {
    /// Tasks in file order.
    pub icl_tasks: Vec<IclTask>,
}

impl IclTaskManifest {
    /// Project a manifest document (wrapped or bare list).
    pub fn from_node(node: &Node) -> Result<Self> {
        let tasks = match node {
            Node::Map(m) => m.get(ICL_TASKS_KEY).ok_or_else(|| {
                Error::manifest(format!("task manifest has no '{ICL_TASKS_KEY}' key"))
            })?,
            Node::Seq(_) => node,
            other => {
                return Err(Error::manifest(format!(
                    "task manifest must be a list or mapping, found {}",
                    other.kind()
                )));
            }
        };
        let icl_tasks: Vec<IclTask> = serde_yaml::from_value(tasks.to_yaml_value())
            .map_err(|e| Error::schema(ICL_TASKS_KEY, e.to_string()))?;
        Ok(Self { icl_tasks })
    }

    /// Project a loaded manifest file.
    pub fn from_document(doc: &Document) -> Result<Self> {
        Self::from_node(doc.root())
    }

    /// Task with the given label.
    pub fn task(&self, label: &str) -> Option<&IclTask> {
        self.icl_tasks
            .iter()
            .find(|t| t.label.as_deref() == Some(label))
    }
}

/// `icl_tasks:` in a run document: a manifest path or an inline list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IclTasksField {
    /// Path or URI of a manifest file.
    Path(String),
    /// Tasks written inline.
    Inline(Vec<IclTask>),
}

/// How benchmark scores are weighted inside a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Weighting {
    /// Every benchmark counts the same.
    Equal,
    /// Weighted by number of samples.
    SampleSz,
    /// Weighted by log of the number of samples.
    LogSampleSz,
}

/// The eval gauntlet: benchmarks grouped into scored categories.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvalGauntlet {
    /// Benchmark weighting inside categories.
    pub weighting: Option<Weighting>,

    /// Subtract each benchmark's random baseline before averaging.
    pub subtract_random_baseline: Option<bool>,

    /// Rescale accuracies after baseline subtraction.
    pub rescale_accuracy: Option<bool>,

    /// Scored categories.
    #[serde(default)]
    pub categories: Vec<GauntletCategory>,

    /// Named averages over categories.
    pub averages: Option<BTreeMap<String, Vec<String>>>,

    /// Remaining keys.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl EvalGauntlet {
    /// Project a gauntlet document (wrapped or bare mapping).
    pub fn from_node(node: &Node) -> Result<Self> {
        let body = match node {
            Node::Map(m) => m.get(EVAL_GAUNTLET_KEY).unwrap_or(node),
            other => {
                return Err(Error::manifest(format!(
                    "eval gauntlet must be a mapping, found {}",
                    other.kind()
                )));
            }
        };
        serde_yaml::from_value(body.to_yaml_value())
            .map_err(|e| Error::schema(EVAL_GAUNTLET_KEY, e.to_string()))
    }

    /// Project a loaded gauntlet file.
    pub fn from_document(doc: &Document) -> Result<Self> {
        Self::from_node(doc.root())
    }

    /// Every benchmark with its category and benchmark indices.
    pub fn benchmarks(&self) -> impl Iterator<Item = (usize, usize, &GauntletBenchmark)> {
        self.categories.iter().enumerate().flat_map(|(ci, c)| {
            c.benchmarks
                .iter()
                .enumerate()
                .map(move |(bi, b)| (ci, bi, b))
        })
    }
}

/// One gauntlet category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GauntletCategory {
    /// Category name.
    pub name: Option<String>,

    /// Benchmarks scored in this category.
    #[serde(default)]
    pub benchmarks: Vec<GauntletBenchmark>,
}

/// One gauntlet benchmark; `name` matches an ICL task label.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GauntletBenchmark {
    /// ICL task label.
    pub name: Option<String>,

    /// Shot count whose score is used.
    pub num_fewshot: Option<i64>,

    /// Accuracy of random guessing.
    pub random_baseline: Option<f64>,
}

/// `eval_gauntlet:` in a run document: a file path or an inline mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GauntletField {
    /// Path of a gauntlet file.
    Path(String),
    /// Gauntlet written inline.
    Inline(EvalGauntlet),
}
