//! Kiln - a declarative build, test and release orchestrator
//!
//! Named tasks declare prerequisites, guards over resolved options and a
//! failure policy. Kiln resolves the prerequisite closure of the requested
//! targets, runs each task once in dependency order, and reports one status
//! line per task.

// Public modules
pub mod cli;
pub mod config;
pub mod error;
pub mod runner;
pub mod ui;

// Re-export commonly used types
pub use error::{KilnError, Result};

/// Current version of Kiln
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
