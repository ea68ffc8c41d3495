//! Error types for Kiln

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Kiln operations
pub type Result<T> = std::result::Result<T, KilnError>;

/// Main error type for Kiln
#[derive(Error, Debug)]
pub enum KilnError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Task execution errors
    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    /// Variable interpolation errors
    #[error("Interpolation error: {0}")]
    Interpolation(#[from] InterpolationError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// YAML parsing errors
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Task file, option and graph errors. All of them abort a run before any
/// external command executes.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to find task file (searched: {0})")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Task '{0}' is not defined")]
    TaskNotFound(String),

    #[error("Task '{0}' is defined more than once")]
    DuplicateTask(String),

    #[error("Task '{task}' needs unknown task '{prerequisite}'")]
    UnknownPrerequisite { task: String, prerequisite: String },

    #[error("Circular dependency detected: {0}")]
    CircularDependency(String),

    #[error("Option '{0}' is required but not provided")]
    MissingOption(String),

    #[error("Invalid option value for '{name}': {error}")]
    InvalidOption { name: String, error: String },

    #[error("Step {index} of task '{task}' must set exactly one of 'exec' or 'remove'")]
    InvalidStep { task: String, index: usize },

    #[error("Failed to read task file '{path}': {error}")]
    ReadFile { path: PathBuf, error: String },
}

/// Task execution errors
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Failed to start '{command}': {error}")]
    Spawn { command: String, error: String },

    #[error("Failed to remove '{path}': {error}")]
    Remove { path: PathBuf, error: String },

    #[error("Rejected removal pattern '{pattern}': {error}")]
    Pattern { pattern: String, error: String },

    #[error("Failed to mark environment ready: {0}")]
    Sentinel(String),

    #[error(transparent)]
    Interpolation(#[from] InterpolationError),
}

/// Variable interpolation errors
#[derive(Error, Debug)]
pub enum InterpolationError {
    #[error("Variable '{0}' is not defined")]
    UndefinedVariable(String),

    #[error("Recursive interpolation detected in '{0}'")]
    RecursiveInterpolation(String),
}

/// Specialized result type for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Specialized result type for execution operations
pub type ExecutionResult<T> = std::result::Result<T, ExecutionError>;

/// Specialized result type for interpolation operations
pub type InterpolationResult<T> = std::result::Result<T, InterpolationError>;

impl KilnError {
    /// Whether this error was raised while loading or validating
    /// configuration, as opposed to an unexpected runtime fault.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            KilnError::Config(_) | KilnError::Yaml(_) | KilnError::Interpolation(_)
        )
    }
}
