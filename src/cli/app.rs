//! Main CLI application

use crate::config::{
    builtin_task_file, find_config_file, load_environment, option_specs, parse_config_file,
    resolve, OptionSpec, TaskFile,
};
use crate::error::{ConfigError, KilnError};
use crate::runner::{
    format_duration, CommandRunner, Context, Outcome, RunReport, RunStatus, ShellRunner,
    TaskGraph, EXIT_CONFIG, EXIT_FAILED, EXIT_SUCCESS,
};
use crate::ui::{Reporter, Verbosity};
use anyhow::{bail, Context as _};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use clap_complete::Shell;
use std::collections::HashMap;
use std::env;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

/// CLI application
pub struct App {
    /// The clap command
    command: Command,
    /// Loaded task file, or the built-in pipeline
    file: TaskFile,
    /// Task file path; `None` for the built-in pipeline
    config_path: Option<PathBuf>,
}

impl App {
    /// Load the task file: `path` when given, else discovery, else the
    /// built-in pipeline
    pub fn load(path: Option<PathBuf>) -> anyhow::Result<Self> {
        let config_path = match path {
            Some(path) => Some(path),
            None => match find_config_file() {
                Ok(found) => Some(found),
                Err(ConfigError::NotFound(_)) => None,
                Err(e) => return Err(e.into()),
            },
        };

        let file = match &config_path {
            Some(path) => parse_config_file(path)
                .with_context(|| format!("Failed to load {}", path.display()))?,
            None => builtin_task_file().context("Failed to load the built-in pipeline")?,
        };

        Ok(Self::with_task_file(file, config_path))
    }

    /// Create an app around an already parsed task file
    pub fn with_task_file(file: TaskFile, config_path: Option<PathBuf>) -> Self {
        App {
            command: build_command(&file),
            file,
            config_path,
        }
    }

    /// Run with process arguments and real commands
    pub fn run(self) -> anyhow::Result<i32> {
        self.run_from(env::args_os(), &ShellRunner)
    }

    /// Run with the given arguments and command runner. Returns the process
    /// exit code; configuration errors come back as `Err`.
    pub fn run_from<I, T>(mut self, args: I, runner: &dyn CommandRunner) -> anyhow::Result<i32>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = match self.command.try_get_matches_from_mut(args) {
            Ok(matches) => matches,
            Err(e) => {
                let code = e.exit_code();
                e.print()?;
                return Ok(code);
            }
        };

        if let Some(shell) = matches.get_one::<Shell>("completions") {
            let name = self.command.get_name().to_string();
            clap_complete::generate(*shell, &mut self.command, name, &mut io::stdout());
            return Ok(EXIT_SUCCESS);
        }

        let verbosity = get_verbosity(&matches);
        let specs = option_specs(&self.file.options)?;

        if matches.get_flag("list") {
            print_listing(&self.file, &specs, verbosity);
            return Ok(EXIT_SUCCESS);
        }

        let (mut targets, overrides) = split_targets(&matches)?;
        if targets.is_empty() {
            match &self.file.default {
                Some(default) => targets.push(default.clone()),
                None => bail!(ConfigError::Invalid(
                    "no target given and the task file has no default".to_string()
                )),
            }
        }

        let project_dir = self.project_dir()?;
        let environment = load_environment(Some(&project_dir))?;
        let cfg = resolve(&specs, &environment, &overrides)?;
        let graph = TaskGraph::from_config(&self.file)?;

        let mut ctx = Context::new()
            .with_working_dir(project_dir)
            .with_reporter(Reporter::stderr(verbosity))
            .with_dry_run(matches.get_flag("dry-run"));
        match &self.config_path {
            Some(path) => {
                ctx.reporter
                    .debug(&format!("task file: {}", path.display()));
                ctx = ctx.with_config_path(path.clone());
            }
            None => ctx.reporter.debug("no task file found, using the built-in pipeline"),
        }
        if let Some(interpreter) = &self.file.interpreter {
            ctx = ctx.with_interpreter(interpreter.clone());
        }
        for key in overrides.keys().filter(|key| cfg.get(key).is_none()) {
            ctx.reporter
                .debug(&format!("ignoring override for unknown option {}", key));
        }

        let report = graph.run(&targets, &cfg, &ctx, runner)?;
        summarize(&ctx.reporter, &report);

        Ok(report.exit_code())
    }

    /// Directory commands run in: the task file's, or the current one
    fn project_dir(&self) -> anyhow::Result<PathBuf> {
        let current = env::current_dir().context("Failed to get current directory")?;
        Ok(match self.config_path.as_deref().and_then(Path::parent) {
            Some(dir) if !dir.as_os_str().is_empty() => current.join(dir),
            _ => current,
        })
    }
}

/// Build the clap command from the task file
fn build_command(file: &TaskFile) -> Command {
    let mut about = file
        .usage
        .clone()
        .unwrap_or_else(|| "Declarative build, test and release orchestrator".to_string());

    let visible: Vec<&str> = file
        .tasks
        .iter()
        .filter(|(_, task)| !task.private)
        .map(|(name, _)| name.as_str())
        .collect();
    if !visible.is_empty() {
        about = format!("{}\n\nTasks: {}", about, visible.join(", "));
    }

    Command::new(clap::crate_name!())
        .version(env!("CARGO_PKG_VERSION"))
        .about(about)
        .arg(
            Arg::new("targets")
                .value_name("TARGET | KEY=VALUE")
                .help("Tasks to run and option overrides")
                .num_args(0..)
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("file")
                .short('f')
                .long("file")
                .value_name("FILE")
                .help("Path to kiln.yml task file")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("set")
                .short('D')
                .long("set")
                .value_name("KEY=VALUE")
                .help("Override an option")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("dry-run")
                .short('n')
                .long("dry-run")
                .help("Print commands without running them")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("list")
                .short('l')
                .long("list")
                .help("List tasks and options")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("completions")
                .long("completions")
                .value_name("SHELL")
                .help("Print a shell completion script")
                .value_parser(value_parser!(Shell)),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Only print warnings, errors and failed command output")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("silent")
                .short('s')
                .long("silent")
                .help("Print no status output")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Print verbose output")
                .action(ArgAction::SetTrue),
        )
}

/// Get verbosity level from matches
fn get_verbosity(matches: &ArgMatches) -> Verbosity {
    if matches.get_flag("silent") {
        Verbosity::Silent
    } else if matches.get_flag("quiet") {
        Verbosity::Quiet
    } else if matches.get_flag("verbose") {
        Verbosity::Verbose
    } else {
        Verbosity::Normal
    }
}

/// Separate task names from `KEY=VALUE` overrides. `--set` values are
/// applied after positional ones.
fn split_targets(
    matches: &ArgMatches,
) -> Result<(Vec<String>, HashMap<String, String>), ConfigError> {
    let mut targets = Vec::new();
    let mut overrides = HashMap::new();

    for token in matches.get_many::<String>("targets").into_iter().flatten() {
        match parse_override(token) {
            Some((key, value)) => {
                overrides.insert(key, value);
            }
            None => targets.push(token.clone()),
        }
    }

    for token in matches.get_many::<String>("set").into_iter().flatten() {
        let (key, value) = parse_override(token).ok_or_else(|| ConfigError::InvalidOption {
            name: token.clone(),
            error: "expected KEY=VALUE".to_string(),
        })?;
        overrides.insert(key, value);
    }

    Ok((targets, overrides))
}

/// `KEY=VALUE` with a non-empty key
fn parse_override(token: &str) -> Option<(String, String)> {
    let (key, value) = token.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key.to_string(), value.to_string()))
}

/// Print task names, prerequisites and usage, then options
fn print_listing(file: &TaskFile, specs: &[OptionSpec], verbosity: Verbosity) {
    let show_private = verbosity >= Verbosity::Verbose;
    let tasks: Vec<_> = file
        .tasks
        .iter()
        .filter(|(_, task)| show_private || !task.private)
        .collect();
    let width = tasks.iter().map(|(name, _)| name.len()).max().unwrap_or(0);

    println!("Tasks:");
    for (name, task) in tasks {
        let marker = if file.default.as_deref() == Some(name.as_str()) {
            " (default)"
        } else {
            ""
        };
        println!(
            "  {:width$}  {}{}",
            name,
            task.usage.as_deref().unwrap_or(""),
            marker,
            width = width
        );
        if !task.needs.is_empty() && verbosity >= Verbosity::Normal {
            println!("  {:width$}    needs: {}", "", task.needs.join(", "), width = width);
        }
    }

    if verbosity >= Verbosity::Verbose {
        println!();
        println!("Options:");
        for spec in specs {
            println!(
                "  {}={}  {}",
                spec.name,
                spec.default.as_deref().unwrap_or(""),
                spec.usage.as_deref().unwrap_or("")
            );
        }
    }
}

/// One line for the whole run
fn summarize(reporter: &Reporter, report: &RunReport) {
    let counts = format!(
        "{} succeeded, {} skipped, {} tolerated in {}",
        report.count(Outcome::Succeeded),
        report.count(Outcome::Skipped),
        report.count(Outcome::Tolerated),
        format_duration(report.duration())
    );

    match report.status() {
        RunStatus::Success => reporter.ok(&format!("done: {}", counts)),
        RunStatus::CompletedWithWarnings => {
            reporter.warn(&format!("completed with warnings: {}", counts))
        }
        RunStatus::Failed => reporter.error(&format!("run aborted: {}", counts)),
    }
}

/// Exit code for an error that ended the run before it produced a report
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    for cause in err.chain() {
        if cause.is::<ConfigError>() {
            return EXIT_CONFIG;
        }
        if let Some(e) = cause.downcast_ref::<KilnError>() {
            return if e.is_configuration() {
                EXIT_CONFIG
            } else {
                EXIT_FAILED
            };
        }
    }
    EXIT_FAILED
}

/// Run the CLI application with process arguments
pub fn run() -> anyhow::Result<i32> {
    let args: Vec<OsString> = env::args_os().collect();
    let app = App::load(extract_file_arg(&args))?;
    app.run_from(args, &ShellRunner)
}

/// Extract --file argument before clap parsing; tasks depend on the file
fn extract_file_arg(args: &[OsString]) -> Option<PathBuf> {
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let arg = arg.to_string_lossy();
        if arg == "--file" || arg == "-f" {
            return iter.next().map(PathBuf::from);
        }
        if let Some(path) = arg.strip_prefix("--file=") {
            return Some(PathBuf::from(path));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;

    fn matches(args: &[&str]) -> ArgMatches {
        build_command(&TaskFile::default()).get_matches_from(args)
    }

    fn os_args(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    #[test]
    fn test_get_verbosity() {
        assert_eq!(get_verbosity(&matches(&["kiln"])), Verbosity::Normal);
        assert_eq!(get_verbosity(&matches(&["kiln", "-q"])), Verbosity::Quiet);
        assert_eq!(get_verbosity(&matches(&["kiln", "-s", "-v"])), Verbosity::Silent);
        assert_eq!(get_verbosity(&matches(&["kiln", "--verbose"])), Verbosity::Verbose);
    }

    #[test]
    fn test_split_targets_and_overrides() {
        let m = matches(&["kiln", "test", "TESTS=0", "package", "-D", "BUILDROOT=out"]);
        let (targets, overrides) = split_targets(&m).unwrap();
        assert_eq!(targets, vec!["test", "package"]);
        assert_eq!(overrides.get("TESTS").map(String::as_str), Some("0"));
        assert_eq!(overrides.get("BUILDROOT").map(String::as_str), Some("out"));
    }

    #[test]
    fn test_set_wins_over_positional() {
        let m = matches(&["kiln", "DEPS=1", "--set", "DEPS=0"]);
        let (_, overrides) = split_targets(&m).unwrap();
        assert_eq!(overrides.get("DEPS").map(String::as_str), Some("0"));
    }

    #[test]
    fn test_set_requires_key_value() {
        let m = matches(&["kiln", "--set", "DEPS"]);
        assert!(matches!(
            split_targets(&m),
            Err(ConfigError::InvalidOption { .. })
        ));
    }

    #[test]
    fn test_parse_override() {
        assert_eq!(
            parse_override("TEST_FLAGS=-x --pdb"),
            Some(("TEST_FLAGS".to_string(), "-x --pdb".to_string()))
        );
        assert_eq!(parse_override("EMPTY="), Some(("EMPTY".to_string(), String::new())));
        assert_eq!(parse_override("=value"), None);
        assert_eq!(parse_override("build"), None);
    }

    #[test]
    fn test_extract_file_arg() {
        assert_eq!(
            extract_file_arg(&os_args(&["kiln", "--file", "ci.yml", "all"])),
            Some(PathBuf::from("ci.yml"))
        );
        assert_eq!(
            extract_file_arg(&os_args(&["kiln", "-f", "ci.yml"])),
            Some(PathBuf::from("ci.yml"))
        );
        assert_eq!(
            extract_file_arg(&os_args(&["kiln", "--file=ci.yml"])),
            Some(PathBuf::from("ci.yml"))
        );
        assert_eq!(extract_file_arg(&os_args(&["kiln", "all"])), None);
    }

    #[test]
    fn test_task_names_in_help() {
        let file = parse_config(
            r#"
tasks:
  build:
    run: make
  secret:
    private: true
"#,
        )
        .unwrap();
        let help = build_command(&file).render_help().to_string();
        assert!(help.contains("Tasks: build"));
        assert!(!help.contains("secret"));
    }

    #[test]
    fn test_exit_code_for_errors() {
        let missing: anyhow::Error = ConfigError::TaskNotFound("deploy".to_string()).into();
        assert_eq!(exit_code_for(&missing), EXIT_CONFIG);

        let yaml: anyhow::Error = parse_config("tasks: [").unwrap_err().into();
        assert_eq!(exit_code_for(&yaml.context("Failed to load kiln.yml")), EXIT_CONFIG);

        let io: anyhow::Error = std::io::Error::new(std::io::ErrorKind::Other, "closed").into();
        assert_eq!(exit_code_for(&io), EXIT_FAILED);
    }

    #[test]
    fn test_no_target_and_no_default_is_an_error() {
        let file = parse_config("tasks:\n  build:\n    run: make\n").unwrap();
        let app = App::with_task_file(file, None);
        assert!(app.run_from(["kiln"], &ShellRunner).is_err());
    }
}
