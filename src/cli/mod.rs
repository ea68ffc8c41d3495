//! CLI interface and argument parsing
//!
//! This module maps command-line targets and overrides onto a task graph
//! run, and generates shell completions.

pub mod app;

// Re-export main types
pub use app::*;
