//! Task execution engine
//!
//! This module handles the execution of tasks: command running, guard
//! evaluation, artifact removal, the environment sentinel and dependency
//! resolution.

pub mod command;
pub mod context;
pub mod graph;
pub mod interpolate;
pub mod remove;
pub mod result;
pub mod sentinel;
pub mod task;
pub mod when;

// Re-export main types
pub use command::*;
pub use context::*;
pub use graph::*;
pub use interpolate::*;
pub use remove::*;
pub use result::*;
pub use sentinel::*;
pub use task::*;
pub use when::*;
