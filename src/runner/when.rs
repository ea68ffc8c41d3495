//! Guard evaluation
//!
//! A guard is a list of conditions over the resolved options. It selects
//! between a task's enabled body and its disabled notice at run time.

use crate::config::Configuration;
use crate::runner::{interpolate, Condition, Context};

/// Evaluate a guard (all conditions must hold - AND logic)
pub fn evaluate_guard(guard: &[Condition], cfg: &Configuration, ctx: &Context) -> bool {
    guard.iter().all(|condition| evaluate_condition(condition, cfg, ctx))
}

/// Evaluate a single condition
pub fn evaluate_condition(condition: &Condition, cfg: &Configuration, ctx: &Context) -> bool {
    let expand = |s: &String| interpolate(s, cfg.vars()).unwrap_or_else(|_| s.clone());

    match condition {
        Condition::Enabled(name) => cfg.flag(name),
        Condition::Disabled(name) => !cfg.flag(name),
        Condition::Equal { left, right } => expand(left) == expand(right),
        Condition::NotEqual { left, right } => expand(left) != expand(right),
        Condition::Exists(path) => ctx.working_dir.join(expand(path)).exists(),
    }
}
