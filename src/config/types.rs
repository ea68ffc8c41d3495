//! Core task file types
//!
//! This module defines the data structures that represent a kiln.yml task file.

use serde::de::{DeserializeOwned, Error};
use serde::{Deserialize, Deserializer};
use serde_yaml::Value;

/// Top-level task file structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskFile {
    /// Project name (optional)
    #[serde(default)]
    pub name: Option<String>,

    /// Project usage description (optional)
    #[serde(default)]
    pub usage: Option<String>,

    /// Task to run when no target is given on the command line
    #[serde(default)]
    pub default: Option<String>,

    /// Interpreter used for commands (e.g., ["sh", "-c"])
    #[serde(default)]
    pub interpreter: Option<Vec<String>>,

    /// Extra options on top of the built-in ones, in file order
    #[serde(default, deserialize_with = "deserialize_ordered")]
    pub options: Vec<(String, OptionDef)>,

    /// Tasks in file order; file order is the registration order
    #[serde(default, deserialize_with = "deserialize_ordered")]
    pub tasks: Vec<(String, Task)>,
}

impl TaskFile {
    /// Look up a task by name
    pub fn task(&self, name: &str) -> Option<&Task> {
        self.tasks
            .iter()
            .find(|(task_name, _)| task_name == name)
            .map(|(_, task)| task)
    }
}

/// A task definition
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Task {
    /// Usage description shown by `--list`
    #[serde(default)]
    pub usage: Option<String>,

    /// Prerequisite tasks, run before this one
    #[serde(default, deserialize_with = "deserialize_strings")]
    pub needs: Vec<String>,

    /// Guard conditions; all must hold for `run` to execute
    #[serde(default)]
    pub when: Vec<When>,

    /// Notice emitted instead of `run` when the guard does not hold
    #[serde(default)]
    pub otherwise: Option<Notice>,

    /// Log a failing command as a warning and keep going
    #[serde(default)]
    pub continue_on_error: bool,

    /// Skip the body once it has succeeded for the current build root
    #[serde(default)]
    pub sentinel: bool,

    /// Hide the task from `--list`
    #[serde(default)]
    pub private: bool,

    /// Steps to execute
    #[serde(default, deserialize_with = "deserialize_steps")]
    pub run: Vec<Step>,
}

/// A step - either a plain shell command or a detailed step
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Step {
    /// Simple string command
    Shell(String),

    /// Detailed step with extra settings
    Detail(StepDetail),
}

/// Detailed step specification
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StepDetail {
    /// The command to execute
    #[serde(default)]
    pub exec: Option<String>,

    /// What to print when running (defaults to exec)
    #[serde(default)]
    pub print: Option<String>,

    /// Capture output and only relay it when the command fails
    #[serde(default)]
    pub quiet: bool,

    /// Working directory for the command, relative to the project
    #[serde(default)]
    pub dir: Option<String>,

    /// Glob patterns to delete instead of running a command
    #[serde(default, deserialize_with = "deserialize_strings")]
    pub remove: Vec<String>,
}

/// A guard condition
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct When {
    /// Boolean option must be true
    #[serde(default)]
    pub enabled: Option<String>,

    /// Boolean option must be false
    #[serde(default)]
    pub disabled: Option<String>,

    /// Check if values are equal
    #[serde(default)]
    pub equal: Option<WhenComparison>,

    /// Check if values are not equal
    #[serde(rename = "not-equal", default)]
    pub not_equal: Option<WhenComparison>,

    /// Check if a path exists
    #[serde(default)]
    pub exists: Option<String>,
}

impl When {
    /// Number of condition keys set on this entry
    pub fn condition_count(&self) -> usize {
        [
            self.enabled.is_some(),
            self.disabled.is_some(),
            self.equal.is_some(),
            self.not_equal.is_some(),
            self.exists.is_some(),
        ]
        .into_iter()
        .filter(|set| *set)
        .count()
    }
}

/// A comparison for when conditions
#[derive(Debug, Clone, Deserialize)]
pub struct WhenComparison {
    /// Left-hand side of comparison
    pub left: String,

    /// Right-hand side of comparison
    pub right: String,
}

/// Message emitted when a task's guard does not hold
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Notice {
    /// Bare message, reported as a warning
    Message(String),

    /// Message with an explicit level
    Detail {
        #[serde(default)]
        level: NoticeLevel,
        message: String,
    },
}

/// Level of a skip notice
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    #[default]
    Warn,
}

/// An option declared by the task file
#[derive(Debug, Clone, Deserialize)]
pub struct OptionDef {
    /// Usage description
    #[serde(default)]
    pub usage: Option<String>,

    /// Option type (bool, string, list)
    #[serde(rename = "type", default = "default_option_type")]
    pub option_type: String,

    /// Default value; may reference other options with ${NAME}
    #[serde(default, deserialize_with = "deserialize_scalar")]
    pub default: Option<String>,

    /// Environment variable to read instead of the option name
    #[serde(default)]
    pub environment: Option<String>,

    /// Fail when no value can be resolved
    #[serde(default)]
    pub required: bool,
}

impl Default for OptionDef {
    fn default() -> Self {
        OptionDef {
            usage: None,
            option_type: default_option_type(),
            default: None,
            environment: None,
            required: false,
        }
    }
}

fn default_option_type() -> String {
    "string".to_string()
}

/// Deserialize a mapping into name/value pairs, keeping file order
fn deserialize_ordered<'de, D, T>(deserializer: D) -> Result<Vec<(String, T)>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;

    match value {
        Value::Mapping(map) => {
            let mut entries = Vec::with_capacity(map.len());
            for (key, item) in map {
                let name = match key {
                    Value::String(s) => s,
                    other => {
                        return Err(D::Error::custom(format!(
                            "expected a string key, found {:?}",
                            other
                        )))
                    }
                };
                let parsed = match item {
                    Value::Null => T::default(),
                    item => serde_yaml::from_value(item)
                        .map_err(|e| D::Error::custom(format!("{}: {}", name, e)))?,
                };
                entries.push((name, parsed));
            }
            Ok(entries)
        }
        Value::Null => Ok(Vec::new()),
        _ => Err(D::Error::custom("expected a mapping")),
    }
}

/// Custom deserializer for steps that handles both single values and arrays
fn deserialize_steps<'de, D>(deserializer: D) -> Result<Vec<Step>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;

    match value {
        // Single string command
        Value::String(s) => Ok(vec![Step::Shell(s)]),
        Value::Mapping(_) => {
            let step = Step::deserialize(value).map_err(D::Error::custom)?;
            Ok(vec![step])
        }
        // Array of steps
        Value::Sequence(seq) => seq
            .into_iter()
            .map(|item| Step::deserialize(item).map_err(D::Error::custom))
            .collect(),
        // Null or not present
        Value::Null => Ok(Vec::new()),
        _ => Err(D::Error::custom("run must be a string, object, or array")),
    }
}

/// Accept either a single string or a list of strings
fn deserialize_strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;

    match value {
        Value::String(s) => Ok(vec![s]),
        Value::Sequence(seq) => seq
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Ok(s),
                other => Err(D::Error::custom(format!(
                    "expected a string, found {:?}",
                    other
                ))),
            })
            .collect(),
        Value::Null => Ok(Vec::new()),
        _ => Err(D::Error::custom("expected a string or array of strings")),
    }
}

/// Option defaults are written as YAML scalars (`1`, `true`, `sdist`) or lists
fn deserialize_scalar<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    scalar_to_string(value).map_err(D::Error::custom)
}

fn scalar_to_string(value: Value) -> Result<Option<String>, String> {
    match value {
        Value::Null => Ok(None),
        Value::Bool(b) => Ok(Some(if b { "1" } else { "0" }.to_string())),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::String(s) => Ok(Some(s)),
        Value::Sequence(seq) => {
            let mut parts = Vec::with_capacity(seq.len());
            for item in seq {
                if let Some(part) = scalar_to_string(item)? {
                    parts.push(part);
                }
            }
            Ok(Some(parts.join(" ")))
        }
        other => Err(format!("expected a scalar default, found {:?}", other)),
    }
}
