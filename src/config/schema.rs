//! Task file validation
//!
//! Structural checks that need the whole file: option types, references
//! between tasks and the default target. Cycles are detected when the task
//! graph is built.

use crate::config::options::option_specs;
use crate::config::types::{Step, TaskFile};
use crate::error::{ConfigError, ConfigResult};
use std::collections::HashSet;

/// Validate a complete task file
pub fn validate_task_file(file: &TaskFile) -> ConfigResult<()> {
    option_specs(&file.options)?;

    let names: HashSet<&str> = file.tasks.iter().map(|(name, _)| name.as_str()).collect();
    if names.len() != file.tasks.len() {
        let mut seen = HashSet::new();
        for (name, _) in &file.tasks {
            if !seen.insert(name.as_str()) {
                return Err(ConfigError::DuplicateTask(name.clone()));
            }
        }
    }

    for (name, task) in &file.tasks {
        if name.trim().is_empty() {
            return Err(ConfigError::Invalid("task names must not be empty".to_string()));
        }

        for prerequisite in &task.needs {
            if !names.contains(prerequisite.as_str()) {
                return Err(ConfigError::UnknownPrerequisite {
                    task: name.clone(),
                    prerequisite: prerequisite.clone(),
                });
            }
        }

        if task.when.iter().any(|when| when.condition_count() != 1) {
            return Err(invalid_guard(name));
        }

        for (i, step) in task.run.iter().enumerate() {
            validate_step(name, i + 1, step)?;
        }
    }

    if let Some(default) = &file.default {
        if !names.contains(default.as_str()) {
            return Err(ConfigError::TaskNotFound(default.clone()));
        }
    }

    Ok(())
}

/// A `when` entry sets zero or several condition keys
pub(crate) fn invalid_guard(task: &str) -> ConfigError {
    ConfigError::Invalid(format!(
        "task '{}': each when entry needs exactly one of enabled, disabled, equal, not-equal, exists",
        task
    ))
}

/// A detailed step must either run a command or remove paths, not both
fn validate_step(task: &str, index: usize, step: &Step) -> ConfigResult<()> {
    match step {
        Step::Shell(_) => Ok(()),
        Step::Detail(detail) => match (&detail.exec, detail.remove.is_empty()) {
            (Some(_), true) | (None, false) => Ok(()),
            _ => Err(ConfigError::InvalidStep {
                task: task.to_string(),
                index,
            }),
        },
    }
}
