//! Task results and run aggregation

use std::time::Duration;

/// Process exit code for a run where every task succeeded or was skipped
pub const EXIT_SUCCESS: i32 = 0;
/// Process exit code when a task failed fatally
pub const EXIT_FAILED: i32 = 1;
/// Process exit code for configuration or usage errors
pub const EXIT_CONFIG: i32 = 2;
/// Process exit code when tolerated failures occurred
pub const EXIT_WARNINGS: i32 = 3;

/// Outcome of one task in one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Succeeded,
    Skipped,
    /// Failed under a tolerant policy; the run went on
    Tolerated,
    /// Failed under a strict policy, or could not run at all
    Fatal,
}

/// Result of executing one task
#[derive(Debug, Clone)]
pub struct TaskResult {
    pub name: String,
    pub outcome: Outcome,
    /// Exit code of the last command run, if any ran
    pub exit_code: Option<i32>,
    pub duration: Duration,
    /// Why the task was skipped or failed
    pub reason: Option<String>,
}

impl TaskResult {
    pub fn new(name: impl Into<String>, outcome: Outcome) -> Self {
        TaskResult {
            name: name.into(),
            outcome,
            exit_code: None,
            duration: Duration::ZERO,
            reason: None,
        }
    }

    pub fn with_exit_code(mut self, exit_code: Option<i32>) -> Self {
        self.exit_code = exit_code;
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }
}

/// Aggregate status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Success,
    CompletedWithWarnings,
    Failed,
}

impl RunStatus {
    pub fn exit_code(self) -> i32 {
        match self {
            RunStatus::Success => EXIT_SUCCESS,
            RunStatus::CompletedWithWarnings => EXIT_WARNINGS,
            RunStatus::Failed => EXIT_FAILED,
        }
    }
}

/// Ordered results of one run
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub results: Vec<TaskResult>,
}

impl RunReport {
    pub fn push(&mut self, result: TaskResult) {
        self.results.push(result);
    }

    pub fn status(&self) -> RunStatus {
        if self.results.iter().any(|r| r.outcome == Outcome::Fatal) {
            RunStatus::Failed
        } else if self.results.iter().any(|r| r.outcome == Outcome::Tolerated) {
            RunStatus::CompletedWithWarnings
        } else {
            RunStatus::Success
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.status().exit_code()
    }

    /// Task names in execution order
    pub fn names(&self) -> Vec<&str> {
        self.results.iter().map(|r| r.name.as_str()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&TaskResult> {
        self.results.iter().find(|r| r.name == name)
    }

    /// Number of results with the given outcome
    pub fn count(&self, outcome: Outcome) -> usize {
        self.results.iter().filter(|r| r.outcome == outcome).count()
    }

    pub fn duration(&self) -> Duration {
        self.results.iter().map(|r| r.duration).sum()
    }
}

/// Short human form of a duration, e.g. `1.25s` or `340ms`
pub fn format_duration(duration: Duration) -> String {
    if duration.as_secs() >= 1 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        format!("{}ms", duration.as_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(outcomes: &[Outcome]) -> RunReport {
        let mut report = RunReport::default();
        for (i, outcome) in outcomes.iter().enumerate() {
            report.push(TaskResult::new(format!("t{}", i), *outcome));
        }
        report
    }

    #[test]
    fn test_status_success() {
        let report = report(&[Outcome::Succeeded, Outcome::Skipped]);
        assert_eq!(report.status(), RunStatus::Success);
        assert_eq!(report.exit_code(), EXIT_SUCCESS);
    }

    #[test]
    fn test_status_warnings_distinct_from_failure() {
        let warned = report(&[Outcome::Succeeded, Outcome::Tolerated, Outcome::Succeeded]);
        assert_eq!(warned.status(), RunStatus::CompletedWithWarnings);
        assert_eq!(warned.exit_code(), EXIT_WARNINGS);

        let failed = report(&[Outcome::Tolerated, Outcome::Fatal]);
        assert_eq!(failed.status(), RunStatus::Failed);
        assert_eq!(failed.exit_code(), EXIT_FAILED);
        assert_ne!(warned.exit_code(), failed.exit_code());
        assert_ne!(warned.exit_code(), EXIT_SUCCESS);
    }

    #[test]
    fn test_empty_report_is_success() {
        assert_eq!(RunReport::default().status(), RunStatus::Success);
    }

    #[test]
    fn test_counts_and_lookup() {
        let report = report(&[Outcome::Skipped, Outcome::Succeeded, Outcome::Skipped]);
        assert_eq!(report.count(Outcome::Skipped), 2);
        assert_eq!(report.names(), vec!["t0", "t1", "t2"]);
        assert_eq!(report.get("t1").unwrap().outcome, Outcome::Succeeded);
        assert!(report.get("t9").is_none());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(340)), "340ms");
        assert_eq!(format_duration(Duration::from_millis(1250)), "1.25s");
    }
}
