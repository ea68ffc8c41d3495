//! Console output
//!
//! Status lines for task transitions, command echo and relayed output.

pub mod reporter;

pub use reporter::*;
