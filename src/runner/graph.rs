//! Task dependency graph
//!
//! Tasks are registered once and never change afterwards. A run resolves the
//! transitive prerequisites of the requested targets, orders them so every
//! prerequisite comes before its dependents (ties broken by registration
//! order), and executes each task at most once.
//!
//! Dependencies are ordering-only: a dependent runs after its prerequisite
//! was attempted, whether it succeeded, was skipped or failed under a
//! tolerant policy. Only a fatal failure stops the run.

use crate::config::{validate_task_file, Configuration, NoticeLevel, TaskFile};
use crate::error::{ConfigError, ConfigResult, ExecutionError};
use crate::runner::{
    evaluate_guard, execute_step, format_duration, CommandRunner, Context, Outcome, RunReport,
    SentinelStore, StepReport, TaskNode, TaskResult,
};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

/// Registry of tasks plus the engine that runs them
#[derive(Debug, Clone, Default)]
pub struct TaskGraph {
    nodes: Vec<TaskNode>,
    index: HashMap<String, usize>,
    sentinel: SentinelStore,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build and validate a graph from a task file
    pub fn from_config(file: &TaskFile) -> ConfigResult<Self> {
        validate_task_file(file)?;

        let mut graph = TaskGraph::new();
        for (name, task) in &file.tasks {
            graph.register(TaskNode::from_config(name.clone(), task.clone())?)?;
        }
        graph.validate()?;
        Ok(graph)
    }

    /// Use a different sentinel store
    pub fn with_sentinel(mut self, sentinel: SentinelStore) -> Self {
        self.sentinel = sentinel;
        self
    }

    /// Add a task. Names must be unique.
    pub fn register(&mut self, node: TaskNode) -> ConfigResult<()> {
        if self.index.contains_key(&node.name) {
            return Err(ConfigError::DuplicateTask(node.name));
        }
        self.index.insert(node.name.clone(), self.nodes.len());
        self.nodes.push(node);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&TaskNode> {
        self.index.get(name).map(|&i| &self.nodes[i])
    }

    /// Tasks in registration order
    pub fn nodes(&self) -> impl Iterator<Item = &TaskNode> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Check every prerequisite exists and the whole graph is acyclic
    pub fn validate(&self) -> ConfigResult<()> {
        let mut marks = vec![None; self.nodes.len()];
        let mut stack = Vec::new();
        for i in 0..self.nodes.len() {
            self.visit(i, &mut marks, &mut stack)?;
        }
        Ok(())
    }

    /// Execution order for `targets`: each transitive prerequisite exactly
    /// once, after everything it needs.
    pub fn plan<S: AsRef<str>>(&self, targets: &[S]) -> ConfigResult<Vec<&TaskNode>> {
        let mut marks = vec![None; self.nodes.len()];
        let mut stack = Vec::new();

        for target in targets {
            let target = target.as_ref();
            let &i = self
                .index
                .get(target)
                .ok_or_else(|| ConfigError::TaskNotFound(target.to_string()))?;
            self.visit(i, &mut marks, &mut stack)?;
        }

        let members: Vec<usize> = (0..self.nodes.len())
            .filter(|&i| marks[i] == Some(Mark::Done))
            .collect();

        Ok(self
            .topological_order(&members)
            .into_iter()
            .map(|i| &self.nodes[i])
            .collect())
    }

    /// Depth-first walk marking the prerequisite closure of `i`
    fn visit(
        &self,
        i: usize,
        marks: &mut [Option<Mark>],
        stack: &mut Vec<usize>,
    ) -> ConfigResult<()> {
        match marks[i] {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Visiting) => {
                let start = stack.iter().position(|&s| s == i).unwrap_or(0);
                let mut cycle: Vec<&str> = stack[start..]
                    .iter()
                    .map(|&s| self.nodes[s].name.as_str())
                    .collect();
                cycle.push(&self.nodes[i].name);
                return Err(ConfigError::CircularDependency(cycle.join(" -> ")));
            }
            None => {}
        }

        marks[i] = Some(Mark::Visiting);
        stack.push(i);

        let node = &self.nodes[i];
        for prerequisite in &node.needs {
            let &p = self.index.get(prerequisite).ok_or_else(|| {
                ConfigError::UnknownPrerequisite {
                    task: node.name.clone(),
                    prerequisite: prerequisite.clone(),
                }
            })?;
            self.visit(p, marks, stack)?;
        }

        stack.pop();
        marks[i] = Some(Mark::Done);
        Ok(())
    }

    /// Kahn's algorithm over `members`, always taking the ready task that
    /// was registered first
    fn topological_order(&self, members: &[usize]) -> Vec<usize> {
        let mut pending: HashMap<usize, usize> = HashMap::new();
        let mut dependents: HashMap<usize, Vec<usize>> = HashMap::new();

        for &i in members {
            let mut prerequisites: Vec<usize> = self.nodes[i]
                .needs
                .iter()
                .filter_map(|name| self.index.get(name).copied())
                .collect();
            prerequisites.sort_unstable();
            prerequisites.dedup();

            pending.insert(i, prerequisites.len());
            for p in prerequisites {
                dependents.entry(p).or_default().push(i);
            }
        }

        let mut ready: BinaryHeap<Reverse<usize>> = pending
            .iter()
            .filter(|(_, &count)| count == 0)
            .map(|(&i, _)| Reverse(i))
            .collect();

        let mut order = Vec::with_capacity(members.len());
        while let Some(Reverse(i)) = ready.pop() {
            order.push(i);
            for &d in dependents.get(&i).map(Vec::as_slice).unwrap_or(&[]) {
                if let Some(count) = pending.get_mut(&d) {
                    *count -= 1;
                    if *count == 0 {
                        ready.push(Reverse(d));
                    }
                }
            }
        }

        order
    }

    /// Run `targets` and their prerequisites.
    ///
    /// Configuration problems (unknown task, cycle) are returned as errors
    /// before anything executes. Task failures are reported in the
    /// [`RunReport`]; after a fatal failure no further task runs and the
    /// fatal result is the last one in the report.
    pub fn run<S: AsRef<str>>(
        &self,
        targets: &[S],
        cfg: &Configuration,
        ctx: &Context,
        runner: &dyn CommandRunner,
    ) -> ConfigResult<RunReport> {
        let plan = self.plan(targets)?;
        ctx.reporter.debug(&format!(
            "plan: {}",
            plan.iter()
                .map(|n| n.name.as_str())
                .collect::<Vec<_>>()
                .join(" -> ")
        ));

        let mut report = RunReport::default();
        for node in plan {
            let result = self.execute_node(node, cfg, ctx, runner);
            announce(ctx, &result);

            let fatal = result.outcome == Outcome::Fatal;
            report.push(result);
            if fatal {
                break;
            }
        }

        Ok(report)
    }

    /// Run one task: guard, sentinel, then body
    fn execute_node(
        &self,
        node: &TaskNode,
        cfg: &Configuration,
        ctx: &Context,
        runner: &dyn CommandRunner,
    ) -> TaskResult {
        let started = Instant::now();

        if !evaluate_guard(&node.guard, cfg, ctx) {
            let (level, reason) = match &node.otherwise {
                Some(notice) => (notice.level, notice.message.clone()),
                None => (NoticeLevel::Info, "disabled".to_string()),
            };
            let message = format!("{} skipped: {}", node.name, reason);
            match level {
                NoticeLevel::Info => ctx.reporter.info(&message),
                NoticeLevel::Warn => ctx.reporter.warn(&message),
            }
            return TaskResult::new(&node.name, Outcome::Skipped)
                .with_reason(reason)
                .with_duration(started.elapsed());
        }

        let build_root = cfg.build_root_in(&ctx.working_dir);
        if node.sentinel && self.sentinel.exists(&build_root) {
            ctx.reporter
                .info(&format!("{} skipped: environment already ready", node.name));
            return TaskResult::new(&node.name, Outcome::Skipped)
                .with_reason("environment already ready")
                .with_duration(started.elapsed());
        }

        let mut last = StepReport::succeeded(None);
        for step in &node.steps {
            last = execute_step(step, node.policy, ctx, cfg.vars(), runner);
            if last.outcome != Outcome::Succeeded {
                break;
            }
        }

        if last.outcome == Outcome::Succeeded && node.sentinel && !ctx.dry_run {
            if let Err(e) = self.sentinel.mark(&build_root) {
                let error = ExecutionError::Sentinel(format!(
                    "{}: {}",
                    self.sentinel.marker(&build_root).display(),
                    e
                ));
                last = StepReport::fatal(error.to_string());
            }
        }

        let mut result = TaskResult::new(&node.name, last.outcome)
            .with_exit_code(last.exit_code)
            .with_duration(started.elapsed());
        result.reason = last.reason;
        result
    }
}

/// Status line for a task whose body ran. Skips announce themselves.
fn announce(ctx: &Context, result: &TaskResult) {
    let reason = result.reason.as_deref().unwrap_or_default();

    match result.outcome {
        Outcome::Succeeded => ctx.reporter.ok(&format!(
            "{} ({})",
            result.name,
            format_duration(result.duration)
        )),
        Outcome::Skipped => {}
        Outcome::Tolerated => ctx.reporter.warn(&format!(
            "{} failed, continuing: {}",
            result.name, reason
        )),
        Outcome::Fatal => ctx
            .reporter
            .error(&format!("{} failed: {}", result.name, reason)),
    }
}
