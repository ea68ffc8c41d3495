//! Command execution
//!
//! External processes run synchronously through a [`CommandRunner`]. A
//! non-zero exit is never an error at this level: it comes back as an exit
//! code and the task's [`Policy`] decides whether it is fatal. Only a process
//! that cannot be started at all is an error, and it is always fatal.

use crate::error::{ExecutionError, ExecutionResult};
use crate::runner::{execute_remove, interpolate, Command, Context, Outcome, Policy, Step};
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::{Command as StdCommand, Stdio};

/// A fully resolved command invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    /// Interpreter argv, e.g. ["sh", "-c"]
    pub interpreter: Vec<String>,

    /// Command text after interpolation
    pub command: String,

    /// Directory the process starts in
    pub working_dir: PathBuf,

    /// Capture stdout/stderr instead of inheriting them
    pub capture: bool,
}

impl CommandLine {
    pub fn new(interpreter: &[String], command: impl Into<String>, working_dir: PathBuf) -> Self {
        CommandLine {
            interpreter: interpreter.to_vec(),
            command: command.into(),
            working_dir,
            capture: false,
        }
    }

    pub fn captured(mut self, capture: bool) -> Self {
        self.capture = capture;
        self
    }
}

/// What a finished process reported
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` when the process was killed by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Output of a process that exited with `code` and printed nothing
    pub fn exited(code: i32) -> Self {
        CommandOutput {
            exit_code: Some(code),
            ..CommandOutput::default()
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Executes one external process and waits for it
pub trait CommandRunner {
    fn run(&self, line: &CommandLine) -> ExecutionResult<CommandOutput>;
}

/// Runs commands through the configured interpreter with `std::process`
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellRunner;

impl CommandRunner for ShellRunner {
    fn run(&self, line: &CommandLine) -> ExecutionResult<CommandOutput> {
        let spawn_error = |error: String| ExecutionError::Spawn {
            command: line.command.clone(),
            error,
        };

        let (program, args) = line
            .interpreter
            .split_first()
            .ok_or_else(|| spawn_error("no interpreter configured".to_string()))?;

        let mut command = StdCommand::new(program);
        command.args(args).arg(&line.command).current_dir(&line.working_dir);

        if line.capture {
            let output = command
                .stdin(Stdio::null())
                .output()
                .map_err(|e| spawn_error(e.to_string()))?;

            Ok(CommandOutput {
                exit_code: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        } else {
            let status = command
                .stdin(Stdio::inherit())
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit())
                .status()
                .map_err(|e| spawn_error(e.to_string()))?;

            Ok(CommandOutput {
                exit_code: status.code(),
                ..CommandOutput::default()
            })
        }
    }
}

/// Result of one step of a task body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    /// `Succeeded`, `Tolerated` or `Fatal`
    pub outcome: Outcome,
    pub exit_code: Option<i32>,
    pub reason: Option<String>,
}

impl StepReport {
    pub fn succeeded(exit_code: Option<i32>) -> Self {
        StepReport {
            outcome: Outcome::Succeeded,
            exit_code,
            reason: None,
        }
    }

    /// Failure that aborts the run regardless of policy
    pub fn fatal(reason: impl Into<String>) -> Self {
        StepReport {
            outcome: Outcome::Fatal,
            exit_code: None,
            reason: Some(reason.into()),
        }
    }

    /// Failure subject to the task's policy
    pub fn failed(policy: Policy, exit_code: Option<i32>, reason: impl Into<String>) -> Self {
        StepReport {
            outcome: match policy {
                Policy::Strict => Outcome::Fatal,
                Policy::Tolerant => Outcome::Tolerated,
            },
            exit_code,
            reason: Some(reason.into()),
        }
    }
}

/// Run one step of a task body
pub fn execute_step(
    step: &Step,
    policy: Policy,
    ctx: &Context,
    vars: &HashMap<String, String>,
    runner: &dyn CommandRunner,
) -> StepReport {
    match step {
        Step::Command(cmd) => execute_command(cmd, policy, ctx, vars, runner),
        Step::Remove(patterns) => execute_remove(patterns, policy, ctx, vars),
    }
}

/// Run one command step and apply the failure policy
pub fn execute_command(
    cmd: &Command,
    policy: Policy,
    ctx: &Context,
    vars: &HashMap<String, String>,
    runner: &dyn CommandRunner,
) -> StepReport {
    let exec = match interpolate(&cmd.exec, vars) {
        Ok(exec) => exec,
        Err(e) => return StepReport::fatal(e.to_string()),
    };

    let working_dir = match &cmd.dir {
        Some(dir) => match interpolate(dir, vars) {
            Ok(dir) => ctx.working_dir.join(dir),
            Err(e) => return StepReport::fatal(e.to_string()),
        },
        None => ctx.working_dir.clone(),
    };

    if !cmd.quiet || ctx.dry_run {
        let print = interpolate(cmd.print(), vars).unwrap_or_else(|_| cmd.print().to_string());
        ctx.reporter.command(&print);
    }

    if ctx.dry_run {
        return StepReport::succeeded(None);
    }

    let line = CommandLine::new(&ctx.interpreter, exec, working_dir).captured(cmd.quiet);

    match runner.run(&line) {
        Ok(output) if output.success() => StepReport::succeeded(output.exit_code),
        Ok(output) => {
            ctx.reporter.relay(&output.stdout);
            ctx.reporter.relay(&output.stderr);

            let reason = match output.exit_code {
                Some(code) => format!("command exited with code {}", code),
                None => "command was terminated by a signal".to_string(),
            };
            StepReport::failed(policy, output.exit_code, reason)
        }
        Err(e) => StepReport::fatal(e.to_string()),
    }
}
