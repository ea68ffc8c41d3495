//! Variable interpolation for strings
//!
//! This module handles parsing and replacing variables in strings using the ${var} syntax.

use crate::error::{InterpolationError, InterpolationResult};
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Expansion depth after which nested references are treated as recursive
const MAX_DEPTH: usize = 16;

fn pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid regex"))
}

/// Interpolate variables in a string
///
/// Unknown `${NAME}` references are left untouched so the shell can still
/// expand them (e.g. `${HOME}`). Values may themselves contain references.
pub fn interpolate(s: &str, vars: &HashMap<String, String>) -> InterpolationResult<String> {
    let re = pattern();
    let mut result = s.to_string();

    for _ in 0..MAX_DEPTH {
        let mut changed = false;

        let next = re
            .replace_all(&result, |caps: &Captures| match vars.get(&caps[1]) {
                Some(value) => {
                    changed = true;
                    value.clone()
                }
                None => caps[0].to_string(),
            })
            .into_owned();

        if !changed {
            return Ok(next);
        }
        result = next;
    }

    Err(InterpolationError::RecursiveInterpolation(s.to_string()))
}

/// Interpolate with strict mode - errors on undefined variables
pub fn interpolate_strict(
    s: &str,
    vars: &HashMap<String, String>,
) -> InterpolationResult<String> {
    let result = interpolate(s, vars)?;

    if let Some(caps) = pattern().captures(&result) {
        return Err(InterpolationError::UndefinedVariable(caps[1].to_string()));
    }

    Ok(result)
}
