//! Task execution types
//!
//! This module contains the runtime representation of tasks. A [`TaskNode`]
//! is a stateless template: running it produces a separate `TaskResult`.

use crate::config::{self, schema};
use crate::config::NoticeLevel;
use crate::error::{ConfigError, ConfigResult};

/// What happens when a task's command exits non-zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Policy {
    /// Abort the run
    #[default]
    Strict,
    /// Log a warning and continue with the next task
    Tolerant,
}

/// Runtime task representation
#[derive(Debug, Clone)]
pub struct TaskNode {
    /// Task name
    pub name: String,

    /// Usage description
    pub usage: Option<String>,

    /// Prerequisite task names, in declaration order
    pub needs: Vec<String>,

    /// Guard conditions; all must hold for `steps` to run
    pub guard: Vec<Condition>,

    /// Emitted instead of running `steps` when the guard does not hold
    pub otherwise: Option<Notice>,

    /// Steps of the enabled body
    pub steps: Vec<Step>,

    /// Failure policy
    pub policy: Policy,

    /// Body is skipped once the build root's sentinel exists
    pub sentinel: bool,

    /// Hidden from listings
    pub private: bool,
}

impl TaskNode {
    /// Create an empty task
    pub fn new(name: impl Into<String>) -> Self {
        TaskNode {
            name: name.into(),
            usage: None,
            needs: Vec::new(),
            guard: Vec::new(),
            otherwise: None,
            steps: Vec::new(),
            policy: Policy::Strict,
            sentinel: false,
            private: false,
        }
    }

    /// Create a new task from configuration
    pub fn from_config(name: String, config: config::Task) -> ConfigResult<Self> {
        let steps = config
            .run
            .into_iter()
            .enumerate()
            .map(|(index, step)| Step::from_config(&name, index, step))
            .collect::<ConfigResult<Vec<_>>>()?;
        let guard = config
            .when
            .into_iter()
            .map(|when| Condition::from_config(&name, when))
            .collect::<ConfigResult<Vec<_>>>()?;

        Ok(TaskNode {
            usage: config.usage,
            needs: config.needs,
            guard,
            otherwise: config.otherwise.map(Notice::from_config),
            steps,
            policy: if config.continue_on_error {
                Policy::Tolerant
            } else {
                Policy::Strict
            },
            sentinel: config.sentinel,
            private: config.private,
            name,
        })
    }

    /// Add a prerequisite
    pub fn needs(mut self, name: impl Into<String>) -> Self {
        self.needs.push(name.into());
        self
    }

    /// Add a shell command step
    pub fn run(mut self, command: impl Into<String>) -> Self {
        self.steps.push(Step::Command(Command::new(command)));
        self
    }

    /// Add a guard condition
    pub fn when(mut self, condition: Condition) -> Self {
        self.guard.push(condition);
        self
    }

    /// Set the notice for the disabled body
    pub fn otherwise(mut self, level: NoticeLevel, message: impl Into<String>) -> Self {
        self.otherwise = Some(Notice {
            level,
            message: message.into(),
        });
        self
    }

    /// Keep going when this task's commands fail
    pub fn tolerant(mut self) -> Self {
        self.policy = Policy::Tolerant;
        self
    }

    /// Guard the body with the build root sentinel
    pub fn bootstrap(mut self) -> Self {
        self.sentinel = true;
        self
    }

    /// Set the usage text
    pub fn usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = Some(usage.into());
        self
    }
}

/// One element of a task body
#[derive(Debug, Clone)]
pub enum Step {
    /// External command
    Command(Command),

    /// Delete files and directories matching glob patterns
    Remove(Vec<String>),
}

impl Step {
    fn from_config(task: &str, index: usize, config: config::Step) -> ConfigResult<Self> {
        match config {
            config::Step::Shell(cmd) => Ok(Step::Command(Command::new(cmd))),
            config::Step::Detail(detail) => match (detail.exec, detail.remove.is_empty()) {
                (Some(exec), true) => Ok(Step::Command(Command {
                    exec,
                    print: detail.print,
                    quiet: detail.quiet,
                    dir: detail.dir,
                })),
                (None, false) => Ok(Step::Remove(detail.remove)),
                _ => Err(ConfigError::InvalidStep {
                    task: task.to_string(),
                    index: index + 1,
                }),
            },
        }
    }
}

/// Runtime representation of a command
#[derive(Debug, Clone)]
pub struct Command {
    /// Command text, before interpolation
    pub exec: String,

    /// What to echo instead of `exec`
    pub print: Option<String>,

    /// Capture output; relay it only on failure
    pub quiet: bool,

    /// Working directory relative to the project
    pub dir: Option<String>,
}

impl Command {
    pub fn new(exec: impl Into<String>) -> Self {
        Command {
            exec: exec.into(),
            print: None,
            quiet: false,
            dir: None,
        }
    }

    /// Get what to print
    pub fn print(&self) -> &str {
        self.print.as_deref().unwrap_or(&self.exec)
    }
}

/// A guard condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Enabled(String),
    Disabled(String),
    Equal { left: String, right: String },
    NotEqual { left: String, right: String },
    Exists(String),
}

impl Condition {
    /// Convert one `when` entry, which must set exactly one condition key
    pub fn from_config(task: &str, config: config::When) -> ConfigResult<Self> {
        let mut conditions = [
            config.enabled.map(Condition::Enabled),
            config.disabled.map(Condition::Disabled),
            config.equal.map(|eq| Condition::Equal {
                left: eq.left,
                right: eq.right,
            }),
            config.not_equal.map(|ne| Condition::NotEqual {
                left: ne.left,
                right: ne.right,
            }),
            config.exists.map(Condition::Exists),
        ]
        .into_iter()
        .flatten();

        match (conditions.next(), conditions.next()) {
            (Some(condition), None) => Ok(condition),
            _ => Err(schema::invalid_guard(task)),
        }
    }
}

/// Message for a task whose guard does not hold
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn from_config(config: config::Notice) -> Self {
        match config {
            config::Notice::Message(message) => Notice {
                level: NoticeLevel::Warn,
                message,
            },
            config::Notice::Detail { level, message } => Notice { level, message },
        }
    }
}
