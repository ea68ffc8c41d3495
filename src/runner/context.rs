//! Execution context for task running
//!
//! The context carries everything a run needs besides the graph and the
//! resolved options: where to run, how to invoke commands, where to report.

use crate::ui::{Reporter, Verbosity};
use std::env;
use std::path::PathBuf;

/// Interpreter used when the task file does not name one
pub fn default_interpreter() -> Vec<String> {
    if cfg!(windows) {
        vec!["cmd".to_string(), "/C".to_string()]
    } else {
        vec!["sh".to_string(), "-c".to_string()]
    }
}

/// Execution context shared by every task in a run
#[derive(Debug, Clone)]
pub struct Context {
    /// Project directory; commands, globs and the build root are relative to it
    pub working_dir: PathBuf,

    /// Task file path, if one was loaded from disk
    pub config_path: Option<PathBuf>,

    /// Interpreter (e.g., ["bash", "-c"])
    pub interpreter: Vec<String>,

    /// Status sink
    pub reporter: Reporter,

    /// Echo commands without running them
    pub dry_run: bool,
}

impl Context {
    /// Create a new context with default settings
    pub fn new() -> Self {
        Context {
            working_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_path: None,
            interpreter: default_interpreter(),
            reporter: Reporter::default(),
            dry_run: false,
        }
    }

    /// Create a context with a specific working directory
    pub fn with_working_dir(mut self, dir: PathBuf) -> Self {
        self.working_dir = dir;
        self
    }

    /// Set the task file path
    pub fn with_config_path(mut self, path: PathBuf) -> Self {
        self.config_path = Some(path);
        self
    }

    /// Set the interpreter
    pub fn with_interpreter(mut self, interpreter: Vec<String>) -> Self {
        if !interpreter.is_empty() {
            self.interpreter = interpreter;
        }
        self
    }

    /// Set the reporter
    pub fn with_reporter(mut self, reporter: Reporter) -> Self {
        self.reporter = reporter;
        self
    }

    /// Echo commands instead of running them
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn verbosity(&self) -> Verbosity {
        self.reporter.verbosity()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_new() {
        let ctx = Context::new();
        assert_eq!(ctx.verbosity(), Verbosity::Normal);
        assert_eq!(ctx.interpreter, default_interpreter());
        assert!(!ctx.dry_run);
        assert!(ctx.config_path.is_none());
    }

    #[test]
    fn test_with_interpreter() {
        let ctx = Context::new().with_interpreter(vec!["bash".to_string(), "-c".to_string()]);
        assert_eq!(ctx.interpreter, vec!["bash", "-c"]);
    }

    #[test]
    fn test_empty_interpreter_keeps_default() {
        let ctx = Context::new().with_interpreter(Vec::new());
        assert_eq!(ctx.interpreter, default_interpreter());
    }

    #[test]
    fn test_with_reporter() {
        let (reporter, _) = Reporter::memory();
        let ctx = Context::new().with_reporter(reporter);
        assert_eq!(ctx.verbosity(), Verbosity::Verbose);
    }
}
