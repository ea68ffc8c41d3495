//! Integration tests for the task graph engine

mod common;

use common::{configuration, context_in, lines, pipeline_graph, FakeRunner};
use kiln::config::NoticeLevel;
use kiln::error::ConfigError;
use kiln::runner::{
    Condition, Outcome, RunStatus, SentinelStore, TaskGraph, TaskNode, EXIT_FAILED, EXIT_SUCCESS,
    EXIT_WARNINGS, SENTINEL_FILE,
};
use tempfile::TempDir;

#[test]
fn test_fresh_build_root_runs_whole_chain() {
    let temp_dir = TempDir::new().unwrap();
    let (ctx, _) = context_in(temp_dir.path());
    let runner = FakeRunner::new();

    let report = pipeline_graph()
        .run(&["package"], &configuration(&[]), &ctx, &runner)
        .unwrap();

    assert_eq!(
        report.names(),
        vec!["bootstrap", "dependencies", "build", "test", "package"]
    );
    assert_eq!(report.count(Outcome::Succeeded), 5);
    assert_eq!(report.exit_code(), EXIT_SUCCESS);
    assert!(temp_dir.path().join(SENTINEL_FILE).is_file());

    let calls = runner.calls();
    assert_eq!(calls.len(), 5);
    assert_eq!(calls[0], "virtualenv ./.env");
    assert_eq!(calls[1], "./.env/bin/pip install -r requirements.txt");
    assert_eq!(calls[4], "./.env/bin/python setup.py sdist");
}

#[test]
fn test_sentinel_present_skips_bootstrap() {
    let temp_dir = TempDir::new().unwrap();
    SentinelStore::new().mark(temp_dir.path()).unwrap();
    let (ctx, captured) = context_in(temp_dir.path());
    let runner = FakeRunner::new();

    let report = pipeline_graph()
        .run(&["package"], &configuration(&[]), &ctx, &runner)
        .unwrap();

    assert_eq!(report.get("bootstrap").unwrap().outcome, Outcome::Skipped);
    for name in ["dependencies", "build", "test", "package"] {
        assert_eq!(report.get(name).unwrap().outcome, Outcome::Succeeded);
    }
    assert!(!runner.calls().iter().any(|c| c.starts_with("virtualenv")));
    assert!(lines(&captured)
        .contains(&"[INFO] bootstrap skipped: environment already ready".to_string()));
}

#[test]
fn test_bootstrap_runs_once_across_runs() {
    let temp_dir = TempDir::new().unwrap();
    let graph = pipeline_graph();
    let cfg = configuration(&[]);
    let runner = FakeRunner::new();

    for _ in 0..2 {
        let (ctx, _) = context_in(temp_dir.path());
        graph.run(&["bootstrap"], &cfg, &ctx, &runner).unwrap();
    }

    let virtualenv_calls = runner
        .calls()
        .iter()
        .filter(|c| c.starts_with("virtualenv"))
        .count();
    assert_eq!(virtualenv_calls, 1);
}

#[test]
fn test_tests_disabled_skips_test_but_packages() {
    let temp_dir = TempDir::new().unwrap();
    let (ctx, captured) = context_in(temp_dir.path());
    let runner = FakeRunner::new();

    let report = pipeline_graph()
        .run(&["package"], &configuration(&[("TESTS", "0")]), &ctx, &runner)
        .unwrap();

    assert_eq!(
        report.names(),
        vec!["bootstrap", "dependencies", "build", "test", "package"]
    );
    assert_eq!(report.get("test").unwrap().outcome, Outcome::Skipped);
    assert_eq!(report.get("package").unwrap().outcome, Outcome::Succeeded);
    assert_eq!(report.status(), RunStatus::Success);
    assert!(!runner.calls().iter().any(|c| c.contains("nosetests")));
    assert!(lines(&captured).contains(&"[WARN] test skipped: Tests disabled".to_string()));
}

#[test]
fn test_virtualenv_disabled_uses_bare_tools() {
    let temp_dir = TempDir::new().unwrap();
    let (ctx, _) = context_in(temp_dir.path());
    let runner = FakeRunner::new();

    let report = pipeline_graph()
        .run(&["build"], &configuration(&[("VIRTUALENV", "no")]), &ctx, &runner)
        .unwrap();

    assert_eq!(report.get("bootstrap").unwrap().outcome, Outcome::Skipped);
    assert!(!temp_dir.path().join(SENTINEL_FILE).exists());
    assert_eq!(
        runner.calls(),
        vec!["pip install -r requirements.txt", "python setup.py build"]
    );
}

#[test]
fn test_strict_failure_stops_the_run() {
    let temp_dir = TempDir::new().unwrap();
    let (ctx, captured) = context_in(temp_dir.path());
    let runner = FakeRunner::new().failing("setup.py build", 2);

    let report = pipeline_graph()
        .run(&["package"], &configuration(&[]), &ctx, &runner)
        .unwrap();

    assert_eq!(report.names(), vec!["bootstrap", "dependencies", "build"]);
    let build = report.get("build").unwrap();
    assert_eq!(build.outcome, Outcome::Fatal);
    assert_eq!(build.exit_code, Some(2));
    assert_eq!(report.status(), RunStatus::Failed);
    assert_eq!(report.exit_code(), EXIT_FAILED);
    assert!(!runner.calls().iter().any(|c| c.contains("nosetests")));
    assert!(lines(&captured)
        .contains(&"[ERROR] build failed: command exited with code 2".to_string()));
}

#[test]
fn test_failed_bootstrap_is_not_marked() {
    let temp_dir = TempDir::new().unwrap();
    let (ctx, _) = context_in(temp_dir.path());
    let runner = FakeRunner::new().failing("virtualenv", 1);

    let report = pipeline_graph()
        .run(&["package"], &configuration(&[]), &ctx, &runner)
        .unwrap();

    assert_eq!(report.names(), vec!["bootstrap"]);
    assert!(!temp_dir.path().join(SENTINEL_FILE).exists());
}

#[test]
fn test_tolerant_failure_continues_with_warnings() {
    let temp_dir = TempDir::new().unwrap();
    let mut graph = TaskGraph::new();
    graph.register(TaskNode::new("build").run("make")).unwrap();
    graph
        .register(
            TaskNode::new("report")
                .needs("build")
                .tolerant()
                .run("upload-reports")
                .run("never-reached"),
        )
        .unwrap();
    graph
        .register(TaskNode::new("package").needs("report").run("make dist"))
        .unwrap();

    let (ctx, captured) = context_in(temp_dir.path());
    let runner = FakeRunner::new().failing("upload-reports", 1);
    let report = graph
        .run(&["package"], &configuration(&[]), &ctx, &runner)
        .unwrap();

    assert_eq!(report.get("report").unwrap().outcome, Outcome::Tolerated);
    assert_eq!(report.get("package").unwrap().outcome, Outcome::Succeeded);
    assert_eq!(report.status(), RunStatus::CompletedWithWarnings);
    assert_eq!(report.exit_code(), EXIT_WARNINGS);
    assert_eq!(runner.calls(), vec!["make", "upload-reports", "make dist"]);
    assert!(lines(&captured).iter().any(|l| l.starts_with("[WARN] report failed")));
}

#[test]
fn test_cycle_aborts_before_any_command() {
    let temp_dir = TempDir::new().unwrap();
    let mut graph = TaskGraph::new();
    graph.register(TaskNode::new("setup").run("true")).unwrap();
    graph
        .register(TaskNode::new("a").needs("setup").needs("b").run("echo a"))
        .unwrap();
    graph
        .register(TaskNode::new("b").needs("a").run("echo b"))
        .unwrap();

    let (ctx, _) = context_in(temp_dir.path());
    let runner = FakeRunner::new();
    let result = graph.run(&["a"], &configuration(&[]), &ctx, &runner);

    assert!(matches!(
        result,
        Err(ConfigError::CircularDependency(path)) if path == "a -> b -> a"
    ));
    assert!(runner.calls().is_empty());
}

#[test]
fn test_unknown_target() {
    let temp_dir = TempDir::new().unwrap();
    let (ctx, _) = context_in(temp_dir.path());
    let result = pipeline_graph().run(&["deploy"], &configuration(&[]), &ctx, &FakeRunner::new());
    assert!(matches!(result, Err(ConfigError::TaskNotFound(name)) if name == "deploy"));
}

#[test]
fn test_shared_prerequisites_run_once_for_multiple_targets() {
    let temp_dir = TempDir::new().unwrap();
    let (ctx, _) = context_in(temp_dir.path());
    let runner = FakeRunner::new();

    let report = pipeline_graph()
        .run(&["test", "package", "build"], &configuration(&[]), &ctx, &runner)
        .unwrap();

    assert_eq!(
        report.names(),
        vec!["bootstrap", "dependencies", "build", "test", "package"]
    );
    assert_eq!(runner.calls().len(), 5);
}

#[test]
fn test_one_status_line_per_task() {
    let temp_dir = TempDir::new().unwrap();
    let (ctx, captured) = context_in(temp_dir.path());

    let report = pipeline_graph()
        .run(&["package"], &configuration(&[("TESTS", "0")]), &ctx, &FakeRunner::new())
        .unwrap();

    let status_lines: Vec<String> = lines(&captured)
        .into_iter()
        .filter(|l| ["[OK]", "[INFO]", "[WARN]", "[ERROR]"].iter().any(|p| l.starts_with(p)))
        .collect();
    assert_eq!(status_lines.len(), report.results.len());
}

#[test]
fn test_dry_run_executes_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let (ctx, captured) = context_in(temp_dir.path());
    let ctx = ctx.with_dry_run(true);
    let runner = FakeRunner::new();

    let report = pipeline_graph()
        .run(&["package"], &configuration(&[]), &ctx, &runner)
        .unwrap();

    assert_eq!(report.count(Outcome::Succeeded), 5);
    assert!(runner.calls().is_empty());
    assert!(!temp_dir.path().join(SENTINEL_FILE).exists());
    assert!(lines(&captured).contains(&"$ virtualenv ./.env".to_string()));
}

#[test]
fn test_build_root_override_moves_sentinel() {
    let temp_dir = TempDir::new().unwrap();
    let (ctx, _) = context_in(temp_dir.path());

    pipeline_graph()
        .run(
            &["bootstrap"],
            &configuration(&[("BUILDROOT", "out")]),
            &ctx,
            &FakeRunner::new(),
        )
        .unwrap();

    assert!(temp_dir.path().join("out").join(SENTINEL_FILE).is_file());
    assert!(!temp_dir.path().join(SENTINEL_FILE).exists());
}

#[test]
fn test_guard_conditions_combine() {
    let temp_dir = TempDir::new().unwrap();
    let mut graph = TaskGraph::new();
    graph
        .register(
            TaskNode::new("release-package")
                .when(Condition::Enabled("BUILDBOT".to_string()))
                .when(Condition::NotEqual {
                    left: "${DISTRIBUTIONS}".to_string(),
                    right: "".to_string(),
                })
                .otherwise(NoticeLevel::Info, "not running under CI")
                .run("tar -czf release.tar.gz dist"),
        )
        .unwrap();

    let runner = FakeRunner::new();
    let (ctx, _) = context_in(temp_dir.path());
    let skipped = graph
        .run(&["release-package"], &configuration(&[]), &ctx, &runner)
        .unwrap();
    assert_eq!(skipped.results[0].outcome, Outcome::Skipped);
    assert!(runner.calls().is_empty());

    let ran = graph
        .run(
            &["release-package"],
            &configuration(&[("BUILDBOT", "1")]),
            &ctx,
            &runner,
        )
        .unwrap();
    assert_eq!(ran.results[0].outcome, Outcome::Succeeded);
    assert_eq!(runner.calls(), vec!["tar -czf release.tar.gz dist"]);
}
