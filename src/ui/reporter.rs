//! Status reporter
//!
//! Emits leveled, styled status lines. The reporter is a pure sink: it never
//! fails and nothing it does feeds back into task outcomes.

use colored::Colorize;
use std::sync::{Arc, Mutex};

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Silent = 0,
    Quiet = 1,
    Normal = 2,
    Verbose = 3,
}

/// Status line level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Ok,
    Warn,
    Error,
}

impl Level {
    fn tag(self) -> &'static str {
        match self {
            Level::Info => "INFO",
            Level::Ok => "OK",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }

    /// Lowest verbosity at which lines of this level are shown
    fn threshold(self) -> Verbosity {
        match self {
            Level::Info | Level::Ok => Verbosity::Normal,
            Level::Warn | Level::Error => Verbosity::Quiet,
        }
    }
}

/// Lines captured by an in-memory reporter
pub type Captured = Arc<Mutex<Vec<String>>>;

#[derive(Debug, Clone)]
enum Sink {
    Stderr,
    Memory(Captured),
}

/// Console status sink
#[derive(Debug, Clone)]
pub struct Reporter {
    verbosity: Verbosity,
    sink: Sink,
}

impl Reporter {
    /// Reporter writing styled lines to stderr
    pub fn stderr(verbosity: Verbosity) -> Self {
        Reporter {
            verbosity,
            sink: Sink::Stderr,
        }
    }

    /// Reporter recording unstyled lines, at verbose level
    pub fn memory() -> (Self, Captured) {
        let lines: Captured = Arc::new(Mutex::new(Vec::new()));
        let reporter = Reporter {
            verbosity: Verbosity::Verbose,
            sink: Sink::Memory(Arc::clone(&lines)),
        };
        (reporter, lines)
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    /// Emit one status line
    pub fn emit(&self, level: Level, message: &str) {
        if self.verbosity < level.threshold() {
            return;
        }

        match &self.sink {
            Sink::Stderr => {
                let tag = format!("[{}]", level.tag());
                let tag = match level {
                    Level::Info => tag.cyan(),
                    Level::Ok => tag.green().bold(),
                    Level::Warn => tag.yellow().bold(),
                    Level::Error => tag.red().bold(),
                };
                eprintln!("{} {}", tag, message);
            }
            Sink::Memory(lines) => self.record(lines, format!("[{}] {}", level.tag(), message)),
        }
    }

    pub fn info(&self, message: &str) {
        self.emit(Level::Info, message);
    }

    pub fn ok(&self, message: &str) {
        self.emit(Level::Ok, message);
    }

    pub fn warn(&self, message: &str) {
        self.emit(Level::Warn, message);
    }

    pub fn error(&self, message: &str) {
        self.emit(Level::Error, message);
    }

    /// Echo a command line before it runs
    pub fn command(&self, line: &str) {
        if self.verbosity < Verbosity::Normal {
            return;
        }
        match &self.sink {
            Sink::Stderr => eprintln!("{} {}", "$".dimmed(), line.bold()),
            Sink::Memory(lines) => self.record(lines, format!("$ {}", line)),
        }
    }

    /// Relay captured command output, e.g. after a quiet command failed
    pub fn relay(&self, output: &str) {
        if self.verbosity < Verbosity::Quiet || output.trim().is_empty() {
            return;
        }
        match &self.sink {
            Sink::Stderr => {
                for line in output.lines() {
                    eprintln!("  {}", line.dimmed());
                }
            }
            Sink::Memory(lines) => {
                for line in output.lines() {
                    self.record(lines, format!("  {}", line));
                }
            }
        }
    }

    /// Print debug message (only in verbose mode)
    pub fn debug(&self, message: &str) {
        if self.verbosity < Verbosity::Verbose {
            return;
        }
        match &self.sink {
            Sink::Stderr => eprintln!("{} {}", "[DEBUG]".dimmed(), message.dimmed()),
            Sink::Memory(lines) => self.record(lines, format!("[DEBUG] {}", message)),
        }
    }

    fn record(&self, lines: &Captured, line: String) {
        // A poisoned buffer only means another test thread panicked mid-write
        if let Ok(mut guard) = lines.lock() {
            guard.push(line);
        }
    }
}

impl Default for Reporter {
    fn default() -> Self {
        Reporter::stderr(Verbosity::Normal)
    }
}
