//! Common test utilities
#![allow(dead_code)]

use kiln::config::{builtin_options, resolve, Configuration, NoticeLevel};
use kiln::error::ExecutionResult;
use kiln::runner::{
    CommandLine, CommandOutput, CommandRunner, Condition, Context, TaskGraph, TaskNode,
};
use kiln::ui::{Captured, Reporter};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Create a temporary directory with a kiln.yml file
pub fn create_test_config(content: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("kiln.yml");
    fs::write(&config_path, content).unwrap();
    (temp_dir, config_path)
}

/// Runner that records every command and never spawns anything.
/// Commands containing a scripted fragment exit with its code.
#[derive(Clone, Default)]
pub struct FakeRunner {
    pub calls: Arc<Mutex<Vec<String>>>,
    exit_codes: Vec<(String, i32)>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands containing `fragment` exit with `code`
    pub fn failing(mut self, fragment: &str, code: i32) -> Self {
        self.exit_codes.push((fragment.to_string(), code));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, line: &CommandLine) -> ExecutionResult<CommandOutput> {
        self.calls.lock().unwrap().push(line.command.clone());
        let code = self
            .exit_codes
            .iter()
            .find(|(fragment, _)| line.command.contains(fragment.as_str()))
            .map(|(_, code)| *code)
            .unwrap_or(0);
        Ok(CommandOutput::exited(code))
    }
}

/// Context rooted at `dir` with an in-memory reporter
pub fn context_in(dir: &Path) -> (Context, Captured) {
    let (reporter, lines) = Reporter::memory();
    let ctx = Context::new()
        .with_working_dir(dir.to_path_buf())
        .with_reporter(reporter);
    (ctx, lines)
}

/// Built-in options resolved with the given overrides and no environment
pub fn configuration(overrides: &[(&str, &str)]) -> Configuration {
    let overrides: HashMap<String, String> = overrides
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    resolve(&builtin_options(), &HashMap::new(), &overrides).unwrap()
}

/// The pipeline `clean, bootstrap, dependencies -> bootstrap,
/// build -> dependencies, test -> build, package -> test`
pub fn pipeline_graph() -> TaskGraph {
    let mut graph = TaskGraph::new();
    let nodes = vec![
        TaskNode::new("clean").run("rm -rf build"),
        TaskNode::new("bootstrap")
            .bootstrap()
            .when(Condition::Enabled("VIRTUALENV".to_string()))
            .otherwise(NoticeLevel::Info, "virtualenv disabled")
            .run("virtualenv ${ENVPATH}"),
        TaskNode::new("dependencies")
            .needs("bootstrap")
            .when(Condition::Enabled("DEPS".to_string()))
            .run("${BINPATH}pip install -r requirements.txt"),
        TaskNode::new("build")
            .needs("dependencies")
            .run("${BINPATH}python setup.py build"),
        TaskNode::new("test")
            .needs("build")
            .when(Condition::Enabled("TESTS".to_string()))
            .otherwise(NoticeLevel::Warn, "Tests disabled")
            .run("${BINPATH}nosetests ${TEST_FLAGS}"),
        TaskNode::new("package")
            .needs("test")
            .run("${BINPATH}python setup.py ${DISTRIBUTIONS}"),
    ];
    for node in nodes {
        graph.register(node).unwrap();
    }
    graph
}

/// Captured reporter lines
pub fn lines(captured: &Captured) -> Vec<String> {
    captured.lock().unwrap().clone()
}
