//! Task file parsing, validation and option resolution
//!
//! This module handles kiln.yml task files, the built-in pipeline and the
//! resolution of options into a [`Configuration`] snapshot.

pub mod options;
pub mod parse;
pub mod schema;
pub mod types;

// Re-export main types
pub use options::*;
pub use parse::*;
pub use schema::*;
pub use types::*;
