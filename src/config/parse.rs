//! Task file parsing and discovery

use crate::config::types::TaskFile;
use crate::error::{ConfigError, ConfigResult, KilnError};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Default task file names to search for
pub const CONFIG_FILE_NAMES: &[&str] = &["kiln.yml", "kiln.yaml"];

/// Optional file next to the task file holding environment overrides
pub const ENV_FILE_NAME: &str = ".env";

/// Pipeline used when no task file is found
const BUILTIN_PIPELINE: &str = include_str!("pipeline.yml");

/// Find the task file by searching current and parent directories
pub fn find_config_file() -> ConfigResult<PathBuf> {
    find_config_file_from(env::current_dir().map_err(|e| {
        ConfigError::Invalid(format!("Failed to get current directory: {}", e))
    })?)
}

/// Find the task file starting from a specific directory
pub fn find_config_file_from(start_dir: PathBuf) -> ConfigResult<PathBuf> {
    let mut current_dir = start_dir;
    let mut searched_paths = Vec::new();

    loop {
        for file_name in CONFIG_FILE_NAMES {
            let config_path = current_dir.join(file_name);
            searched_paths.push(config_path.display().to_string());

            if config_path.is_file() {
                return Ok(config_path);
            }
        }

        match current_dir.parent() {
            Some(parent) => current_dir = parent.to_path_buf(),
            None => return Err(ConfigError::NotFound(searched_paths.join(", "))),
        }
    }
}

/// Parse a task file from a path
pub fn parse_config_file(path: &Path) -> Result<TaskFile, KilnError> {
    let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        error: e.to_string(),
    })?;

    parse_config(&contents)
}

/// Parse a task file from a string
pub fn parse_config(yaml: &str) -> Result<TaskFile, KilnError> {
    Ok(serde_yaml::from_str(yaml)?)
}

/// The built-in build/test/release pipeline
pub fn builtin_task_file() -> Result<TaskFile, KilnError> {
    parse_config(BUILTIN_PIPELINE)
}

/// Environment overrides: the process environment layered over an optional
/// `.env` file in `dir`. Process variables win.
pub fn load_environment(dir: Option<&Path>) -> ConfigResult<HashMap<String, String>> {
    let mut environment = HashMap::new();

    if let Some(path) = dir.map(|d| d.join(ENV_FILE_NAME)).filter(|p| p.is_file()) {
        let entries = dotenvy::from_path_iter(&path).map_err(|e| ConfigError::ReadFile {
            path: path.clone(),
            error: e.to_string(),
        })?;
        for entry in entries {
            let (key, value) = entry.map_err(|e| ConfigError::ReadFile {
                path: path.clone(),
                error: e.to_string(),
            })?;
            environment.insert(key, value);
        }
    }

    // Variables that are not valid UTF-8 cannot name or hold an option value
    environment.extend(env::vars_os().filter_map(|(key, value)| {
        Some((key.into_string().ok()?, value.into_string().ok()?))
    }));
    Ok(environment)
}
